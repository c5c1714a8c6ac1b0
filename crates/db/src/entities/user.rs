//! Bridge user entity (one record per (protocol, native id) actor).

use chrono::Utc;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::types::CopyList;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bridge_user")]
pub struct Model {
    /// Protocol-native actor identifier.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Label of the protocol this actor is native to.
    pub protocol: String,

    /// Canonical object id of this actor's profile, once loaded.
    #[sea_orm(nullable)]
    pub obj_id: Option<String>,

    /// Human-readable handle, when the protocol has one.
    #[sea_orm(nullable)]
    pub handle: Option<String>,

    /// Cross-protocol mirrors of this actor.
    #[sea_orm(column_type = "JsonBinary")]
    pub copies: CopyList,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// A fresh record for the given protocol and native id.
    #[must_use]
    pub fn with_id(protocol: impl Into<String>, id: impl Into<String>) -> Self {
        let now = Utc::now().into();
        Self {
            id: id.into(),
            protocol: protocol.into(),
            obj_id: None,
            handle: None,
            copies: CopyList::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
