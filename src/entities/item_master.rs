//! Item master entity - The onion varieties and grades that can be purchased.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Item master database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "item_master")]
pub struct Model {
    /// Unique identifier for the item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Item name (e.g., "Red Onion 55mm+")
    #[sea_orm(unique)]
    pub name: String,
    /// HSN classification code
    pub hsn_code: Option<String>,
    /// Unit pre-selected on new purchase orders
    pub default_unit_id: Option<i64>,
    /// Free-form description
    pub description: Option<String>,
    /// Inactive items are hidden from lists
    pub is_active: bool,
    /// When the item was created
    pub created_at: DateTimeUtc,
    /// When the item was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `ItemMaster` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each item may have a default unit
    #[sea_orm(
        belongs_to = "super::unit::Entity",
        from = "Column::DefaultUnitId",
        to = "super::unit::Column::Id"
    )]
    DefaultUnit,
    /// One item has many GAP-certified lots
    #[sea_orm(has_many = "super::gap_item::Entity")]
    GapItems,
    /// One item appears on many purchase orders
    #[sea_orm(has_many = "super::purchase_order::Entity")]
    PurchaseOrders,
}

impl Related<super::unit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DefaultUnit.def()
    }
}

impl Related<super::gap_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GapItems.def()
    }
}

impl Related<super::purchase_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseOrders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
