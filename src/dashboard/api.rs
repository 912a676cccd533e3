//! Response types for the status endpoints.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::state::StatusSnapshot;

/// Response for GET /api/status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// When the snapshot was taken.
    pub generated_at: DateTime<Local>,
    #[serde(flatten)]
    pub status: StatusSnapshot,
}

impl StatusResponse {
    #[must_use]
    pub fn new(status: StatusSnapshot) -> Self {
        Self {
            generated_at: Local::now(),
            status,
        }
    }
}
