//! Follower edge repository.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use crossfed_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::{Follower, follower, follower::FollowStatus};
use crate::store::FollowerStore;

/// Follower repository for database operations.
#[derive(Clone)]
pub struct FollowerRepository {
    db: Arc<DatabaseConnection>,
}

impl FollowerRepository {
    /// Create a new follower repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<follower::Model>> {
        Follower::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn set_status(&self, id: &str, status: FollowStatus) -> AppResult<()> {
        let active = follower::ActiveModel {
            id: Set(id.to_string()),
            status: Set(status),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl FollowerStore for FollowerRepository {
    async fn find_pair(
        &self,
        follower_id: &str,
        followee_id: &str,
    ) -> AppResult<Option<follower::Model>> {
        self.find_by_id(&follower::pair_id(follower_id, followee_id))
            .await
    }

    async fn get_or_create(
        &self,
        follower_id: &str,
        followee_id: &str,
        follow_id: Option<&str>,
    ) -> AppResult<follower::Model> {
        let id = follower::pair_id(follower_id, followee_id);
        if let Some(existing) = self.find_by_id(&id).await? {
            let needs_status = existing.status != FollowStatus::Active;
            let needs_follow = follow_id.is_some() && follow_id != existing.follow_id.as_deref();
            if !needs_status && !needs_follow {
                return Ok(existing);
            }
            let mut active = follower::ActiveModel {
                id: Set(id.clone()),
                status: Set(FollowStatus::Active),
                updated_at: Set(Utc::now().into()),
                ..Default::default()
            };
            if needs_follow {
                active.follow_id = Set(follow_id.map(str::to_string));
            }
            return active
                .update(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()));
        }

        let mut fresh = follower::Model::between(follower_id, followee_id);
        fresh.follow_id = follow_id.map(str::to_string);
        let active = follower::ActiveModel {
            id: Set(fresh.id.clone()),
            follower_id: Set(fresh.follower_id.clone()),
            followee_id: Set(fresh.followee_id.clone()),
            status: Set(fresh.status),
            follow_id: Set(fresh.follow_id.clone()),
            created_at: Set(fresh.created_at),
            updated_at: Set(fresh.updated_at),
        };
        active
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn deactivate(&self, follower_id: &str, followee_id: &str) -> AppResult<bool> {
        let id = follower::pair_id(follower_id, followee_id);
        match self.find_by_id(&id).await? {
            Some(edge) if edge.status == FollowStatus::Active => {
                self.set_status(&id, FollowStatus::Inactive).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn active_followers_of(&self, followee_id: &str) -> AppResult<Vec<follower::Model>> {
        Follower::find()
            .filter(follower::Column::FolloweeId.eq(followee_id))
            .filter(follower::Column::Status.eq(FollowStatus::Active))
            .order_by_asc(follower::Column::FollowerId)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn deactivate_all_for(&self, user_id: &str) -> AppResult<u64> {
        let edges = Follower::find()
            .filter(
                Condition::any()
                    .add(follower::Column::FollowerId.eq(user_id))
                    .add(follower::Column::FolloweeId.eq(user_id)),
            )
            .filter(follower::Column::Status.eq(FollowStatus::Active))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let count = edges.len() as u64;
        for edge in edges {
            self.set_status(&edge.id, FollowStatus::Inactive).await?;
        }
        Ok(count)
    }
}
