//! Read-only HTTP status endpoint.

mod api;
mod error;
mod handlers;
mod render;
mod server;

pub use api::StatusResponse;
pub use error::DashboardError;
pub use handlers::{get_panel, get_status_json, get_status_text};
pub use render::{escape_html, render_panel, REFRESH_SECS};
pub use server::StatusServer;
