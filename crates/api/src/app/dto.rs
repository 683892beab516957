//! Response DTOs for the admin surface.

use serde::Serialize;

/// Acknowledgement of an enqueued recompute for one product.
#[derive(Debug, Serialize)]
pub struct RecomputeResponse {
    pub stage: &'static str,
    #[serde(rename = "targetId")]
    pub target_id: String,
}

/// Acknowledgement of a full-cascade restart.
#[derive(Debug, Serialize)]
pub struct RestartResponse {
    /// Stage signals enqueued (the rest of the chain follows as successors).
    pub enqueued: usize,
}
