//! Enqueue helper for the receive queue.

use apalis::prelude::*;
use crossfed_common::{AppError, AppResult};
use tracing::debug;

use crate::jobs::ReceiveJob;

/// Redis-backed dispatcher queueing stored objects for asynchronous
/// processing.
#[derive(Clone)]
pub struct ReceiveDispatcher {
    storage: apalis_redis::RedisStorage<ReceiveJob>,
}

impl ReceiveDispatcher {
    /// Create a new dispatcher over the given storage.
    #[must_use]
    pub const fn new(storage: apalis_redis::RedisStorage<ReceiveJob>) -> Self {
        Self { storage }
    }

    /// Queue one stored object for processing. The queue guarantees
    /// at-least-once invocation; the pipeline absorbs duplicates.
    pub async fn enqueue(&self, obj_id: &str) -> AppResult<()> {
        let job = ReceiveJob::new(obj_id.to_string());

        self.storage
            .clone()
            .push(job)
            .await
            .map_err(|e| AppError::Queue(format!("failed to queue job: {e}")))?;

        debug!(obj_id = %obj_id, "queued receive job");
        Ok(())
    }
}
