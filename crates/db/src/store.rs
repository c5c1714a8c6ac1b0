//! The entity store boundary consumed by the relay core.
//!
//! The core never talks to a database directly; it goes through these
//! traits. [`crate::repositories`] implements them over SeaORM and
//! [`crate::memory`] over process-local maps. Both share one merge rule,
//! [`merge_objects`], so concurrent writers union the bookkeeping lists
//! instead of overwriting each other.

use async_trait::async_trait;
use chrono::Utc;
use crossfed_common::AppResult;

use crate::entities::{follower, object, user};

/// Storage for canonical objects.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch one object by id. Implementations return an independent
    /// copy; mutating it never affects stored state.
    async fn get(&self, id: &str) -> AppResult<Option<object::Model>>;

    /// Create or update an object. List fields are merged with any
    /// stored row per [`merge_objects`]; scalar fields overwrite.
    /// Returns the merged, stored state.
    async fn put(&self, obj: &object::Model) -> AppResult<object::Model>;

    /// Find the object that lists `uri` among its cross-protocol copies.
    async fn find_by_copy(&self, uri: &str) -> AppResult<Option<object::Model>>;
}

/// Storage for per-protocol actor identities.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetch one user by native id.
    async fn get(&self, id: &str) -> AppResult<Option<user::Model>>;

    /// Fetch a user, creating the record on first reference.
    async fn get_or_create(&self, protocol: &str, id: &str) -> AppResult<user::Model>;

    /// Create or update a user record.
    async fn put(&self, user: &user::Model) -> AppResult<user::Model>;

    /// Find a user by handle.
    async fn find_by_handle(&self, handle: &str) -> AppResult<Option<user::Model>>;

    /// Find the user that lists `uri` among their cross-protocol copies.
    async fn find_by_copy(&self, uri: &str) -> AppResult<Option<user::Model>>;
}

/// Storage for follower edges.
#[async_trait]
pub trait FollowerStore: Send + Sync {
    /// Fetch the edge for an ordered (follower, followee) pair.
    async fn find_pair(
        &self,
        follower_id: &str,
        followee_id: &str,
    ) -> AppResult<Option<follower::Model>>;

    /// Create the edge for the pair, or reactivate it in place if it
    /// already exists. Never duplicates.
    async fn get_or_create(
        &self,
        follower_id: &str,
        followee_id: &str,
        follow_id: Option<&str>,
    ) -> AppResult<follower::Model>;

    /// Deactivate the edge for the pair. Returns whether an active edge
    /// was found; a missing or already-inactive edge is a no-op.
    async fn deactivate(&self, follower_id: &str, followee_id: &str) -> AppResult<bool>;

    /// All active edges whose followee is the given actor.
    async fn active_followers_of(&self, followee_id: &str) -> AppResult<Vec<follower::Model>>;

    /// Deactivate every edge touching the given actor, in both
    /// directions. Returns the number of edges deactivated.
    async fn deactivate_all_for(&self, user_id: &str) -> AppResult<u64>;
}

/// Merge an incoming object state into the stored one.
///
/// Scalar fields (payload, protocols, status, tombstone, type) take the
/// incoming value; `created_at` keeps the stored value; the bookkeeping
/// lists are unioned. A target that is now delivered is dropped from
/// `failed`, keeping the two sets disjoint.
#[must_use]
pub fn merge_objects(existing: &object::Model, incoming: &object::Model) -> object::Model {
    let mut merged = incoming.clone();
    merged.created_at = existing.created_at;
    merged.updated_at = Utc::now().into();

    for key in &existing.users {
        merged.users.insert(key.clone());
    }
    for key in &existing.notify {
        merged.notify.insert(key.clone());
    }
    for key in &existing.feed {
        merged.feed.insert(key.clone());
    }
    for key in &existing.delivered {
        merged.delivered.insert(key.clone());
    }
    for key in &existing.failed {
        merged.failed.insert(key.clone());
    }
    for copy in existing.copies.iter() {
        if !merged.copies.contains_uri(&copy.uri) {
            merged.copies.upsert(copy.clone());
        }
    }

    let delivered = merged.delivered.clone();
    for key in &delivered {
        merged.failed.remove(key);
    }

    merged.changed = false;
    merged.new = false;
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::KeyList;

    #[test]
    fn test_merge_unions_lists() {
        let mut existing = object::Model::with_id("x:post");
        existing.delivered = KeyList::from(vec!["a:target".to_string()]);
        existing.feed = KeyList::from(vec!["x:alice".to_string()]);

        let mut incoming = object::Model::with_id("x:post");
        incoming.delivered = KeyList::from(vec!["b:target".to_string()]);
        incoming.feed = KeyList::from(vec!["x:bob".to_string()]);

        let merged = merge_objects(&existing, &incoming);
        assert!(merged.delivered.contains("a:target"));
        assert!(merged.delivered.contains("b:target"));
        assert!(merged.feed.contains("x:alice"));
        assert!(merged.feed.contains("x:bob"));
    }

    #[test]
    fn test_merge_keeps_delivered_and_failed_disjoint() {
        let mut existing = object::Model::with_id("x:post");
        existing.failed = KeyList::from(vec!["a:target".to_string()]);

        let mut incoming = object::Model::with_id("x:post");
        incoming.delivered = KeyList::from(vec!["a:target".to_string()]);

        let merged = merge_objects(&existing, &incoming);
        assert!(merged.delivered.contains("a:target"));
        assert!(!merged.failed.contains("a:target"));
    }

    #[test]
    fn test_merge_scalars_take_incoming() {
        let mut existing = object::Model::with_id("x:post");
        existing.source_protocol = Some("fake".to_string());

        let mut incoming = object::Model::with_id("x:post");
        incoming.deleted = true;
        incoming.source_protocol = None;

        let merged = merge_objects(&existing, &incoming);
        assert!(merged.deleted);
        assert!(merged.source_protocol.is_none());
        assert_eq!(merged.created_at, existing.created_at);
    }
}
