//! HTTP server lifecycle.

use crate::routes::create_router;
use crate::shutdown::shutdown_signal;
use crate::state::AppState;
use gateway_config::ServerConfig;
use std::future::{Future, IntoFuture};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

/// The gateway HTTP server
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    state: AppState,
}

impl Server {
    /// Create a server
    #[must_use]
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Bind and serve until a shutdown signal arrives
    ///
    /// # Errors
    /// Returns error if the address cannot be bound or the server fails
    pub async fn run(self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.config.bind_address()).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on `listener` until `signal` resolves
    ///
    /// In-flight requests get `shutdown_timeout` to finish; connections still
    /// open after that are dropped.
    ///
    /// # Errors
    /// Returns error if the server fails
    pub async fn serve<F, T>(self, listener: TcpListener, signal: F) -> std::io::Result<()>
    where
        F: Future<Output = T> + Send + 'static,
    {
        let address = listener.local_addr()?;
        let grace = self.config.shutdown_timeout;
        let app = create_router(self.state, self.config.body_limit);

        let (stopping_tx, mut stopping_rx) = watch::channel(false);
        let server = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                signal.await;
                info!("Draining in-flight requests");
                let _ = stopping_tx.send(true);
            })
            .into_future();

        info!(address = %address, "Gateway listening");

        tokio::select! {
            result = server => result?,
            () = async {
                let _ = stopping_rx.wait_for(|stopping| *stopping).await;
                tokio::time::sleep(grace).await;
            } => {
                warn!(grace_ms = grace.as_millis() as u64, "Grace period elapsed, closing open connections");
            }
        }

        info!("Gateway stopped");
        Ok(())
    }
}
