//! Reverse proxy in front of the application server.
//!
//! # Routing
//! - `STATIC_URL` prefix is served from `STATIC_ROOT` with a one year immutable cache
//! - Everything else is forwarded to `APP_BIND` over plain HTTP
//! - The app is never contacted for static files
//!
//! # Forwarding
//! - Hop-by-hop headers are dropped in both directions
//! - `Host` is kept, `X-Real-IP` and `X-Forwarded-For` are set from the peer
//! - Only a loopback peer (the tunnel client) may set `X-Forwarded-Proto` and `CF-Connecting-IP`
//! - Upstream responses are streamed back as is, redirects included
use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use axum::Router;
use reqwest::{redirect::Policy, Client};
use settings::{shutdown_signal, Settings};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod assets;
pub mod error;
pub mod proxy;

use error::EdgeError;

pub struct Edge {
    pub client: Client,
    /// `http://host:port`, no trailing slash.
    pub upstream: String,
    pub static_root: PathBuf,
    /// Static prefix without the trailing slash, e.g. `/static`.
    pub static_mount: String,
    pub max_body: usize,
    pub timeout: Duration,
}

impl Edge {
    pub fn new(settings: &Settings) -> Result<Self, EdgeError> {
        let static_mount = settings.static_url.trim_end_matches('/').to_string();
        if static_mount.is_empty() {
            return Err(EdgeError::RootStaticPrefix);
        }

        let timeout = Duration::from_secs(settings.edge_upstream_timeout_secs);

        let client = Client::builder()
            .redirect(Policy::none())
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            upstream: format!("http://{}", settings.app_bind),
            static_root: settings.static_root.clone(),
            static_mount,
            max_body: settings.edge_max_body_bytes,
            timeout,
        })
    }
}

pub fn router(edge: Arc<Edge>) -> Router {
    Router::new()
        .nest_service(&edge.static_mount, assets::router(&edge.static_root))
        .fallback(proxy::proxy_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(edge)
}

pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let edge = Arc::new(Edge::new(&settings)?);

    info!(
        "Serving {} from {} and proxying to {}",
        settings.static_url,
        edge.static_root.display(),
        edge.upstream
    );

    let address = settings.edge_bind;
    let listener = TcpListener::bind(address).await?;
    info!("Edge running on {address}");

    axum::serve(listener, router(edge).into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Edge shut down");
    Ok(())
}
