//! In-process entity store.
//!
//! Backs the test suites and serves as the reference implementation of
//! the store contract: merge-on-put and independent copies on every
//! read. All three store traits are implemented on one value so a test
//! can share a single world between them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use crossfed_common::AppResult;

use crate::entities::{follower, follower::FollowStatus, object, user};
use crate::store::{FollowerStore, ObjectStore, UserStore, merge_objects};

/// Shared in-memory store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    objects: Arc<Mutex<HashMap<String, object::Model>>>,
    users: Arc<Mutex<HashMap<String, user::Model>>>,
    followers: Arc<Mutex<HashMap<String, follower::Model>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored follower edges, active or not.
    #[must_use]
    pub fn follower_count(&self) -> usize {
        lock(&self.followers).len()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, id: &str) -> AppResult<Option<object::Model>> {
        Ok(lock(&self.objects).get(id).cloned())
    }

    async fn put(&self, obj: &object::Model) -> AppResult<object::Model> {
        let mut objects = lock(&self.objects);
        let merged = match objects.get(&obj.id) {
            Some(existing) => merge_objects(existing, obj),
            None => {
                let mut fresh = obj.clone();
                fresh.changed = false;
                fresh.new = false;
                fresh
            }
        };
        objects.insert(merged.id.clone(), merged.clone());
        Ok(merged)
    }

    async fn find_by_copy(&self, uri: &str) -> AppResult<Option<object::Model>> {
        Ok(lock(&self.objects)
            .values()
            .find(|o| o.copies.contains_uri(uri))
            .cloned())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get(&self, id: &str) -> AppResult<Option<user::Model>> {
        Ok(lock(&self.users).get(id).cloned())
    }

    async fn get_or_create(&self, protocol: &str, id: &str) -> AppResult<user::Model> {
        let mut users = lock(&self.users);
        let user = users
            .entry(id.to_string())
            .or_insert_with(|| user::Model::with_id(protocol, id));
        Ok(user.clone())
    }

    async fn put(&self, user: &user::Model) -> AppResult<user::Model> {
        let mut stored = user.clone();
        stored.updated_at = Utc::now().into();
        lock(&self.users).insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn find_by_handle(&self, handle: &str) -> AppResult<Option<user::Model>> {
        Ok(lock(&self.users)
            .values()
            .find(|u| u.handle.as_deref() == Some(handle))
            .cloned())
    }

    async fn find_by_copy(&self, uri: &str) -> AppResult<Option<user::Model>> {
        Ok(lock(&self.users)
            .values()
            .find(|u| u.copies.contains_uri(uri))
            .cloned())
    }
}

#[async_trait]
impl FollowerStore for MemoryStore {
    async fn find_pair(
        &self,
        follower_id: &str,
        followee_id: &str,
    ) -> AppResult<Option<follower::Model>> {
        let id = follower::pair_id(follower_id, followee_id);
        Ok(lock(&self.followers).get(&id).cloned())
    }

    async fn get_or_create(
        &self,
        follower_id: &str,
        followee_id: &str,
        follow_id: Option<&str>,
    ) -> AppResult<follower::Model> {
        let id = follower::pair_id(follower_id, followee_id);
        let mut followers = lock(&self.followers);
        let edge = followers
            .entry(id)
            .or_insert_with(|| follower::Model::between(follower_id, followee_id));
        edge.status = FollowStatus::Active;
        if follow_id.is_some() {
            edge.follow_id = follow_id.map(str::to_string);
        }
        edge.updated_at = Utc::now().into();
        Ok(edge.clone())
    }

    async fn deactivate(&self, follower_id: &str, followee_id: &str) -> AppResult<bool> {
        let id = follower::pair_id(follower_id, followee_id);
        let mut followers = lock(&self.followers);
        match followers.get_mut(&id) {
            Some(edge) if edge.status == FollowStatus::Active => {
                edge.status = FollowStatus::Inactive;
                edge.updated_at = Utc::now().into();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn active_followers_of(&self, followee_id: &str) -> AppResult<Vec<follower::Model>> {
        let mut edges: Vec<_> = lock(&self.followers)
            .values()
            .filter(|e| e.followee_id == followee_id && e.status == FollowStatus::Active)
            .cloned()
            .collect();
        edges.sort_by(|a, b| a.follower_id.cmp(&b.follower_id));
        Ok(edges)
    }

    async fn deactivate_all_for(&self, user_id: &str) -> AppResult<u64> {
        let mut count = 0;
        let mut followers = lock(&self.followers);
        for edge in followers.values_mut() {
            if edge.status == FollowStatus::Active
                && (edge.follower_id == user_id || edge.followee_id == user_id)
            {
                edge.status = FollowStatus::Inactive;
                edge.updated_at = Utc::now().into();
                count += 1;
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::KeyList;

    #[tokio::test]
    async fn test_put_merges_with_stored_state() {
        let store = MemoryStore::new();

        let mut first = object::Model::with_id("x:post");
        first.delivered = KeyList::from(vec!["a:target".to_string()]);
        ObjectStore::put(&store, &first).await.unwrap();

        let mut second = object::Model::with_id("x:post");
        second.delivered = KeyList::from(vec!["b:target".to_string()]);
        let merged = ObjectStore::put(&store, &second).await.unwrap();

        assert!(merged.delivered.contains("a:target"));
        assert!(merged.delivered.contains("b:target"));
    }

    #[tokio::test]
    async fn test_get_returns_independent_copy() {
        let store = MemoryStore::new();
        ObjectStore::put(&store, &object::Model::with_id("x:post"))
            .await
            .unwrap();

        let mut copy = ObjectStore::get(&store, "x:post").await.unwrap().unwrap();
        copy.deleted = true;

        let fresh = ObjectStore::get(&store, "x:post").await.unwrap().unwrap();
        assert!(!fresh.deleted);
    }

    #[tokio::test]
    async fn test_follower_get_or_create_reactivates() {
        let store = MemoryStore::new();
        FollowerStore::get_or_create(&store, "x:alice", "x:user", Some("x:follow"))
            .await
            .unwrap();
        store.deactivate("x:alice", "x:user").await.unwrap();

        let edge = FollowerStore::get_or_create(&store, "x:alice", "x:user", None)
            .await
            .unwrap();
        assert_eq!(edge.status, FollowStatus::Active);
        assert_eq!(edge.follow_id.as_deref(), Some("x:follow"));
        assert_eq!(store.follower_count(), 1);
    }

    #[tokio::test]
    async fn test_deactivate_all_for_touches_both_directions() {
        let store = MemoryStore::new();
        FollowerStore::get_or_create(&store, "x:alice", "x:user", None)
            .await
            .unwrap();
        FollowerStore::get_or_create(&store, "x:bob", "x:alice", None)
            .await
            .unwrap();
        FollowerStore::get_or_create(&store, "x:bob", "x:user", None)
            .await
            .unwrap();

        let count = store.deactivate_all_for("x:alice").await.unwrap();
        assert_eq!(count, 2);

        let remaining = store.active_followers_of("x:user").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].follower_id, "x:bob");
    }
}
