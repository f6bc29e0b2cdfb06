//! GAP item entity - Item lots certified under Good Agricultural Practices.
//!
//! Export buyers ask for GAP-certified produce, so each certificate is tracked
//! against the item it covers together with its expiry.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// GAP item database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "gap_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Item this certificate applies to
    pub item_id: i64,
    /// Display name of the certified lot
    pub name: String,
    /// Certificate number issued by the certifying body
    pub certification_number: Option<String>,
    /// Last day the certificate is valid
    pub valid_until: Option<Date>,
    pub is_active: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::item_master::Entity",
        from = "Column::ItemId",
        to = "super::item_master::Column::Id"
    )]
    Item,
}

impl Related<super::item_master::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
