//! Background job queue for crossfed.
//!
//! The relay's only queue contract is idempotent re-entry: a stored
//! canonical object is referenced by id, and the worker re-invokes the
//! receive pipeline with at-least-once semantics. Duplicate invocations
//! are absorbed by the pipeline itself.
//!
//! - **Jobs**: opaque references to stored canonical objects
//! - **Workers**: apalis worker functions driving the pipeline
//! - **Dispatch**: enqueue helper over Redis-backed storage
//! - **Retry**: exponential backoff with a dead letter record

pub mod dispatch;
pub mod jobs;
pub mod retry;
pub mod workers;

pub use dispatch::ReceiveDispatcher;
pub use jobs::ReceiveJob;
pub use retry::{DeadLetterEntry, RetryConfig};
pub use workers::{ReceiveContext, receive_worker};
