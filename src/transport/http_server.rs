use crate::api::{self, AppState};
use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct HttpServerApp {
    bind_addr: SocketAddr,
    state: Arc<AppState>,
}

impl HttpServerApp {
    pub fn new(bind_addr: SocketAddr, state: AppState) -> Self {
        Self {
            bind_addr,
            state: Arc::new(state),
        }
    }

    pub async fn serve(self) -> Result<()> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        tracing::info!("Listening on http://{}", listener.local_addr()?);

        axum::serve(listener, api::router(self.state))
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

// Resolves on Ctrl+C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        // Without a signal handler the server runs until the process is killed
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
