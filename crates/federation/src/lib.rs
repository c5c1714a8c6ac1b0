//! Protocol implementations for crossfed.
//!
//! One [`crossfed_core::Protocol`] implementation per federated
//! network, each built at its interface boundary: identity ownership
//! tests, handle shapes, remote fetch via the network's content
//! negotiation, delivery addressing, and blocklist policy. Full wire
//! codecs (AS2 rendering, microformats parsing, XRPC record encoding)
//! live behind the HTTP boundary and are out of scope here; [`convert`]
//! carries only the verb/type tables normalization depends on.

pub mod activitypub;
pub mod atproto;
pub mod blocklist;
pub mod client;
pub mod convert;
pub mod web;

pub use activitypub::ActivityPubProtocol;
pub use atproto::AtprotoProtocol;
pub use client::{CONTENT_TYPE_AS, CONTENT_TYPE_AS2, FederationClient};
pub use web::WebProtocol;
