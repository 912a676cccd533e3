//! Status HTTP server with axum router and graceful shutdown.

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{get_panel, get_status_json, get_status_text};
use super::DashboardError;
use crate::config::StatusConfig;
use crate::state::SharedState;

/// Read-only status endpoint over the shared supervision state.
#[derive(Debug, Clone)]
pub struct StatusServer {
    config: StatusConfig,
    state: SharedState,
}

impl StatusServer {
    #[must_use]
    pub fn new(config: StatusConfig, state: SharedState) -> Self {
        Self { config, state }
    }

    /// Get the configured address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.config.addr
    }

    /// Build the axum router with all routes and middleware.
    pub fn build_router(&self) -> Router {
        let router = Router::new()
            .route("/", get(get_panel))
            .route("/status", get(get_status_text))
            .route("/api/status", get(get_status_json))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http());

        if self.config.cors_permissive {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }

    /// Bind the configured address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn bind(&self) -> Result<TcpListener, DashboardError> {
        TcpListener::bind(&self.config.addr)
            .await
            .map_err(|source| DashboardError::BindError {
                address: self.config.addr.clone(),
                source,
            })
    }

    /// Serve on an already bound listener until `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns an error if serving fails.
    pub async fn serve(
        self,
        listener: TcpListener,
        cancel: CancellationToken,
    ) -> Result<(), DashboardError> {
        let app = self.build_router();
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(address = %addr, "Status endpoint listening");
        }

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
                tracing::debug!("Status endpoint shutting down");
            })
            .await?;
        Ok(())
    }

    /// Bind and serve. A bind failure is logged and returned; the caller
    /// keeps running without the endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind or serve.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), DashboardError> {
        let listener = match self.bind().await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(error = %e, "Status endpoint unavailable");
                return Err(e);
            }
        };
        self.serve(listener, cancel).await
    }
}
