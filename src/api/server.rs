use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use crate::api::{create_router, AppState};
use crate::config::ServerConfig;
use crate::error::Result;
use crate::predictor::Predictor;

/// Start the API server and block until Ctrl+C / SIGTERM
pub async fn start_api_server(config: &ServerConfig, predictor: Arc<Predictor>) -> Result<()> {
    let app_state = AppState::from_shared(predictor);
    let app = create_router(app_state.clone());

    let listener = TcpListener::bind(config.bind_addr()).await?;
    info!(
        "API server listening on http://{} (models ready: {})",
        listener.local_addr()?,
        app_state.predictor.ready()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped after {}s", app_state.uptime_seconds());
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
