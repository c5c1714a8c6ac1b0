//! Receive job.

use serde::{Deserialize, Serialize};

/// Job re-dispatching a stored canonical object through the receive
/// pipeline. Carries only the opaque store reference; the payload and
/// source protocol are read back at processing time so redeliveries see
/// current state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveJob {
    /// Id of the stored canonical object to process.
    pub obj_id: String,
}

impl ReceiveJob {
    /// Create a new receive job.
    #[must_use]
    pub const fn new(obj_id: String) -> Self {
        Self { obj_id }
    }
}
