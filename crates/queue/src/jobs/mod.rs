//! Queue job types.

mod receive;

pub use receive::ReceiveJob;
