//! Queue workers.

mod receive;

pub use receive::{ReceiveContext, process_receive, receive_worker};
