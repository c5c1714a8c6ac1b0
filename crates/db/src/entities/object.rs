//! Canonical object entity (activities and objects in the shared form).

use chrono::Utc;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::types::{CopyList, KeyList};

/// Processing status of a canonical object.
#[derive(Debug, Clone, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum Status {
    /// Stored but not yet processed to a terminal state.
    #[default]
    #[sea_orm(string_value = "new")]
    New,
    /// Delivery was attempted; partial failures are still complete.
    #[sea_orm(string_value = "complete")]
    Complete,
    /// The inbound payload itself was unprocessable.
    #[sea_orm(string_value = "error")]
    Error,
    /// Processed, but nothing warranted delivery.
    #[sea_orm(string_value = "ignored")]
    Ignored,
    /// Every attempted delivery failed.
    #[sea_orm(string_value = "failed")]
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "object")]
pub struct Model {
    /// Protocol-native URI or tag. Never changes after creation.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Canonical activity/object structure.
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub payload: Option<Json>,

    /// Protocol that produced this object. NULL once tombstoned, and for
    /// internally generated activities.
    #[sea_orm(nullable)]
    pub source_protocol: Option<String>,

    /// Protocol this object was last delivered to.
    #[sea_orm(nullable)]
    pub delivered_protocol: Option<String>,

    pub status: Status,

    /// Owning actor keys attributed to this activity.
    #[sea_orm(column_type = "JsonBinary")]
    pub users: KeyList,

    /// Actor keys to be alerted without full delivery.
    #[sea_orm(column_type = "JsonBinary")]
    pub notify: KeyList,

    /// Follower keys this object should appear in.
    #[sea_orm(column_type = "JsonBinary")]
    pub feed: KeyList,

    /// Target addresses successfully delivered to. Disjoint from `failed`.
    #[sea_orm(column_type = "JsonBinary")]
    pub delivered: KeyList,

    /// Target addresses whose delivery failed.
    #[sea_orm(column_type = "JsonBinary")]
    pub failed: KeyList,

    /// Cross-protocol mirrors of this same logical object.
    #[sea_orm(column_type = "JsonBinary")]
    pub copies: CopyList,

    /// Tombstone flag. Deletion never removes the row.
    pub deleted: bool,

    /// Derived activity verb or object type.
    #[sea_orm(nullable)]
    pub object_type: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,

    /// Whether the last remote load changed the stored payload.
    /// Set by the loader, never persisted.
    #[sea_orm(ignore)]
    pub changed: bool,

    /// Whether the last load created this record. Set by the loader,
    /// never persisted.
    #[sea_orm(ignore)]
    pub new: bool,
}

impl Model {
    /// A fresh, unprocessed record for the given id.
    #[must_use]
    pub fn with_id(id: impl Into<String>) -> Self {
        let now = Utc::now().into();
        Self {
            id: id.into(),
            payload: None,
            source_protocol: None,
            delivered_protocol: None,
            status: Status::New,
            users: KeyList::default(),
            notify: KeyList::default(),
            feed: KeyList::default(),
            delivered: KeyList::default(),
            failed: KeyList::default(),
            copies: CopyList::default(),
            deleted: false,
            object_type: None,
            created_at: now,
            updated_at: now,
            changed: false,
            new: false,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
