//! The capability interface each federated network implements.

use async_trait::async_trait;
use crossfed_common::AppResult;
use crossfed_db::entities::object;
use serde_json::Value;

/// One federated network, seen from the relay core.
///
/// The registry holds implementations in an explicit priority order and
/// the core invokes them polymorphically; no part of dispatch inspects
/// concrete types.
#[async_trait]
pub trait Protocol: Send + Sync {
    /// Short registry label, e.g. `activitypub`.
    fn label(&self) -> &'static str;

    /// Alternative labels this protocol also answers to.
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    /// Whether this protocol claims any id no other protocol recognizes.
    /// At most one greedy protocol may be registered.
    fn greedy(&self) -> bool {
        false
    }

    /// Static, no-I/O ownership test for an identifier.
    fn owns_id(&self, id: &str) -> bool;

    /// Static, no-I/O ownership test for a human handle.
    fn owns_handle(&self, handle: &str) -> bool {
        let _ = handle;
        false
    }

    /// The canonical id for an owned handle, when it is derivable
    /// without I/O.
    fn handle_as_id(&self, handle: &str) -> Option<String> {
        let _ = handle;
        None
    }

    /// Whether this protocol can translate handles remotely (e.g. via a
    /// DNS TXT lookup). The loader makes at most one such call.
    fn resolves_handles(&self) -> bool {
        false
    }

    /// One remote resolution call translating a handle to a
    /// protocol-native id. Failures yield `None`, never an error.
    async fn resolve_handle(&self, handle: &str) -> Option<String> {
        let _ = handle;
        None
    }

    /// Fetch the remote canonical form of an object. Network errors,
    /// rejections and unparsable responses all yield `None`; faults do
    /// not cross this boundary.
    async fn fetch(&self, id: &str) -> Option<Value>;

    /// The protocol-native delivery address for an object. `shared`
    /// requests the network's common broadcast inbox, used for follower
    /// fan-out.
    async fn target_for(&self, obj: &object::Model, shared: bool) -> Option<String>;

    /// Deliver one object to one address. Returns `true` on success and
    /// `false` when delivery was deliberately skipped (e.g. the remote
    /// actor is gone); raises a classified delivery error on failure.
    /// The caller isolates failures per target.
    async fn send(&self, obj: &object::Model, target: &str) -> AppResult<bool>;

    /// Protocol-specific policy excluding unsafe or irrelevant targets.
    fn is_blocklisted(&self, address: &str) -> bool {
        let _ = address;
        false
    }
}
