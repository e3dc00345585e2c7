use tokio::signal::ctrl_c;
use tracing::info;

/// Resolves on Ctrl+C or SIGTERM, for `with_graceful_shutdown`.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::shutdown_signal;

    #[tokio::test]
    async fn test_waits_for_a_signal() {
        assert!(timeout(Duration::from_millis(50), shutdown_signal()).await.is_err());
    }
}
