//! Application server of a personal devlog and project showcase.
//!
//! # General Infrastructure
//! - Visitor reaches the site through a Cloudflare tunnel pointed at the edge
//! - Edge serves `/static/` from disk and reverse proxies everything else here
//! - Only 1 layer of reverse proxy, the app never listens on a public address
//! - App and edge run as separate systemd units on the same host
//!
//!
//!
//! # Admin Sessions
//!
//! **Goal**: Keep the admin usable without a session table.
//!
//! - Login checks the PBKDF2 hash stored for the admin user
//! - On success the server sets a HMAC signed `sessionid` cookie holding the username and expiry
//! - Cookie lasts 14 days, is `HttpOnly` and `SameSite=Strict`
//! - Every admin request verifies the signature against `SECRET_KEY`
//! - If invalid, expired or missing, redirect to the login page
//! - Rotating `SECRET_KEY` logs every admin out
//!
//!
//!
//! # Notes
//!
//! ## Forwarded headers
//! The app trusts `X-Forwarded-Proto` because only the edge can reach it. The
//! header decides HTTPS redirects, HSTS and the scheme of absolute feed links.
//!
//! ## SQLite
//! Content is small and written by one admin, so SQLite is plenty. The server
//! does not run migrations on start, the deploy pipeline does.
//!
//!
//!
//! # Setup
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
//!
//!
//!
//! # Just
//!
//! Example workflow
//! ```sh
//! just setup
//! just serve
//! just edge
//! ```
use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod admin;
pub mod error;
pub mod feed;
pub mod pages;
pub mod routes;
pub mod security;
pub mod session;
pub mod state;
pub mod utils;

use routes::{devlog_handler, explore_handler, home_handler, not_found_handler, project_handler, rss_handler};
use settings::{shutdown_signal, Settings};
use state::State;

pub fn app(state: Arc<State>) -> Router {
    let mut router = Router::new()
        .route("/", get(home_handler))
        .route("/explore/", get(explore_handler))
        .route("/devlog/{slug}/", get(devlog_handler))
        .route("/project/{slug}/", get(project_handler))
        .route("/rss/", get(rss_handler))
        .merge(admin::router())
        .fallback(not_found_handler)
        .layer(middleware::from_fn_with_state(state.clone(), security::enforce));

    if state.settings.debug {
        router = router.layer(middleware::from_fn(error::expose_details));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

pub async fn start_server(settings: Settings) -> anyhow::Result<()> {
    info!("Initializing state...");
    let state = State::new(settings).await?;

    info!("Starting server...");
    let address = state.settings.app_bind;
    let app = app(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}
