//! Bridge user repository.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use crossfed_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    sea_query::Expr,
};

use crate::entities::{User, user};
use crate::store::UserStore;

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

fn to_active(model: &user::Model) -> user::ActiveModel {
    user::ActiveModel {
        id: Set(model.id.clone()),
        protocol: Set(model.protocol.clone()),
        obj_id: Set(model.obj_id.clone()),
        handle: Set(model.handle.clone()),
        copies: Set(model.copies.clone()),
        created_at: Set(model.created_at),
        updated_at: Set(model.updated_at),
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn get(&self, id: &str) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn get_or_create(&self, protocol: &str, id: &str) -> AppResult<user::Model> {
        if let Some(user) = self.get(id).await? {
            return Ok(user);
        }
        let fresh = user::Model::with_id(protocol, id);
        to_active(&fresh)
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn put(&self, user: &user::Model) -> AppResult<user::Model> {
        let mut stored = user.clone();
        stored.updated_at = Utc::now().into();
        let active = to_active(&stored);
        if self.get(&stored.id).await?.is_some() {
            active
                .update(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))
        } else {
            active
                .insert(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))
        }
    }

    async fn find_by_handle(&self, handle: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Handle.eq(handle))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_by_copy(&self, uri: &str) -> AppResult<Option<user::Model>> {
        let needle = serde_json::json!([{ "uri": uri }]).to_string();
        User::find()
            .filter(Expr::cust_with_values("copies @> ?::jsonb", [needle]))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
