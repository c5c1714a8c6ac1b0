//! Follower edge entity (directed follow relationships between actors).

use chrono::Utc;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Status of a follower edge. Edges are deactivated, never removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum FollowStatus {
    #[default]
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "follower")]
pub struct Model {
    /// Deterministic pair key, see [`pair_id`]. Guarantees at most one
    /// edge per ordered (follower, followee) pair.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The actor who is following.
    #[sea_orm(indexed)]
    pub follower_id: String,

    /// The actor being followed.
    #[sea_orm(indexed)]
    pub followee_id: String,

    pub status: FollowStatus,

    /// Canonical object id of the follow activity that created this edge.
    #[sea_orm(nullable)]
    pub follow_id: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

/// The deterministic key for an ordered (follower, followee) pair.
#[must_use]
pub fn pair_id(follower_id: &str, followee_id: &str) -> String {
    format!("{follower_id} {followee_id}")
}

impl Model {
    /// A fresh active edge between the given actors.
    #[must_use]
    pub fn between(follower_id: impl Into<String>, followee_id: impl Into<String>) -> Self {
        let follower_id = follower_id.into();
        let followee_id = followee_id.into();
        let now = Utc::now().into();
        Self {
            id: pair_id(&follower_id, &followee_id),
            follower_id,
            followee_id,
            status: FollowStatus::Active,
            follow_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
