//! Receive worker.

use std::sync::Arc;

use apalis::prelude::*;
use crossfed_common::{AppError, AppResult};
use crossfed_core::{ProtocolRegistry, ReceiveOutcome, ReceivePipeline};
use crossfed_db::store::ObjectStore;
use tracing::{error, info, warn};

use crate::jobs::ReceiveJob;

/// Context for the receive worker.
#[derive(Clone)]
pub struct ReceiveContext {
    /// The pipeline driving each re-dispatched activity.
    pub pipeline: Arc<ReceivePipeline>,
    /// Registry resolving the stored source protocol label.
    pub registry: Arc<ProtocolRegistry>,
    /// Store the job's object reference is read from.
    pub objects: Arc<dyn ObjectStore>,
}

impl ReceiveContext {
    /// Create a new receive context.
    #[must_use]
    pub const fn new(
        pipeline: Arc<ReceivePipeline>,
        registry: Arc<ProtocolRegistry>,
        objects: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            pipeline,
            registry,
            objects,
        }
    }
}

/// Worker function re-dispatching stored activities through the
/// pipeline.
///
/// # Errors
/// Returns an error only for faults worth retrying; client faults and
/// no-content outcomes complete the job.
pub async fn receive_worker(job: ReceiveJob, ctx: Data<ReceiveContext>) -> Result<(), Error> {
    info!(obj_id = %job.obj_id, "processing receive job");

    match process_receive(&job, &ctx).await {
        Ok(ReceiveOutcome::Complete) => {
            info!(obj_id = %job.obj_id, "receive job complete");
            Ok(())
        }
        Ok(ReceiveOutcome::NoContent) => {
            info!(obj_id = %job.obj_id, "receive job had nothing to deliver");
            Ok(())
        }
        Err(e) if e.is_client_error() => {
            // Retrying malformed input cannot help.
            warn!(obj_id = %job.obj_id, error = %e, "dropping unprocessable activity");
            Ok(())
        }
        Err(e) => {
            error!(obj_id = %job.obj_id, error = %e, "receive job failed");
            let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(e);
            Err(Error::Failed(boxed.into()))
        }
    }
}

/// Load the referenced object and drive it through the pipeline.
pub async fn process_receive(job: &ReceiveJob, ctx: &ReceiveContext) -> AppResult<ReceiveOutcome> {
    let obj = ctx
        .objects
        .get(&job.obj_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("object not stored: {}", job.obj_id)))?;

    let payload = obj
        .payload
        .ok_or_else(|| AppError::BadRequest(format!("object has no payload: {}", job.obj_id)))?;

    let source = obj
        .source_protocol
        .as_deref()
        .and_then(|label| ctx.registry.by_label(label));

    ctx.pipeline.receive(payload, source).await
}
