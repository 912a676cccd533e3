//! Status endpoint error types.

/// Errors that can occur while serving the status endpoint.
#[derive(thiserror::Error, Debug)]
pub enum DashboardError {
    /// Failed to bind to address.
    #[error("Failed to bind to {address}: {source}")]
    BindError {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Server error.
    #[error("Server error: {0}")]
    ServerError(#[from] std::io::Error),
}
