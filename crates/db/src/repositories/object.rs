//! Canonical object repository.

use std::sync::Arc;

use async_trait::async_trait;
use crossfed_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, sea_query::Expr,
};

use crate::entities::{Object, object};
use crate::store::{ObjectStore, merge_objects};

/// Object repository for database operations.
#[derive(Clone)]
pub struct ObjectRepository {
    db: Arc<DatabaseConnection>,
}

impl ObjectRepository {
    /// Create a new object repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

fn to_active(model: &object::Model) -> object::ActiveModel {
    object::ActiveModel {
        id: Set(model.id.clone()),
        payload: Set(model.payload.clone()),
        source_protocol: Set(model.source_protocol.clone()),
        delivered_protocol: Set(model.delivered_protocol.clone()),
        status: Set(model.status.clone()),
        users: Set(model.users.clone()),
        notify: Set(model.notify.clone()),
        feed: Set(model.feed.clone()),
        delivered: Set(model.delivered.clone()),
        failed: Set(model.failed.clone()),
        copies: Set(model.copies.clone()),
        deleted: Set(model.deleted),
        object_type: Set(model.object_type.clone()),
        created_at: Set(model.created_at),
        updated_at: Set(model.updated_at),
    }
}

#[async_trait]
impl ObjectStore for ObjectRepository {
    async fn get(&self, id: &str) -> AppResult<Option<object::Model>> {
        Object::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn put(&self, obj: &object::Model) -> AppResult<object::Model> {
        let existing = self.get(&obj.id).await?;
        match existing {
            Some(stored) => {
                let merged = merge_objects(&stored, obj);
                to_active(&merged)
                    .update(self.db.as_ref())
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))
            }
            None => {
                let mut fresh = obj.clone();
                fresh.changed = false;
                fresh.new = false;
                to_active(&fresh)
                    .insert(self.db.as_ref())
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))
            }
        }
    }

    async fn find_by_copy(&self, uri: &str) -> AppResult<Option<object::Model>> {
        let needle = serde_json::json!([{ "uri": uri }]).to_string();
        Object::find()
            .filter(Expr::cust_with_values("copies @> ?::jsonb", [needle]))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
