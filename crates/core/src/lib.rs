//! Protocol-dispatch and federation-relay engine for crossfed.
//!
//! This crate is the bridge's core: it decides which federated network
//! owns an identifier, normalizes inbound activities into the canonical
//! form, resolves delivery targets across networks, and drives each
//! activity through an idempotent, partial-failure-tolerant delivery
//! state machine.
//!
//! - **Canonical activities**: payload accessors and wrapper synthesis
//!   in [`activity`]
//! - **Protocol capability**: the [`Protocol`] trait each network
//!   implements
//! - **Registry & resolution**: [`ProtocolRegistry`] and
//!   [`ObjectLoader`] (`for_id`, `for_handle`, `load`)
//! - **Object cache**: [`ObjectCache`], process-wide and copy-on-read
//! - **Target resolution**: [`TargetResolver`] fan-out, cross-protocol
//!   copy substitution, blocklisting, self-loop exclusion
//! - **Receive pipeline**: [`ReceivePipeline`], the verb-dispatch state
//!   machine with at-least-once re-entry safety

pub mod activity;
pub mod cache;
pub mod loader;
pub mod protocol;
pub mod receive;
pub mod registry;
pub mod targets;

pub use cache::ObjectCache;
pub use loader::{LoadOpts, ObjectLoader};
pub use protocol::Protocol;
pub use receive::{ReceiveOutcome, ReceivePipeline};
pub use registry::ProtocolRegistry;
pub use targets::{Target, TargetMap, TargetResolver};
