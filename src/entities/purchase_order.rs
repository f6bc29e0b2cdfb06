//! Purchase order entity - A commitment to buy a quantity of one item from one supplier.
//!
//! Each purchase order references its supplier, item, unit of measure and optionally a
//! sieve size band. Pre-GR entries are recorded against open purchase orders as trucks
//! arrive.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Purchase order database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_orders")]
pub struct Model {
    /// Unique identifier for the purchase order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Document number, e.g. `PO/2024-25/0001`
    #[sea_orm(unique)]
    pub po_number: String,
    /// Date printed on the order
    pub po_date: Date,
    /// Supplier the goods are bought from
    pub supplier_id: i64,
    /// Item being bought
    pub item_id: i64,
    /// Optional sieve size band the supplier must deliver
    pub sieve_size_id: Option<i64>,
    /// Unit `quantity` and `rate` are expressed in
    pub unit_id: i64,
    /// Ordered quantity in `unit_id`
    pub quantity: f64,
    /// Agreed price per `unit_id`
    pub rate: f64,
    /// Where the supplier delivers
    pub delivery_location: Option<String>,
    /// Free-form remarks
    pub remarks: Option<String>,
    /// `"open"`, `"closed"` or `"cancelled"`
    pub status: String,
    /// E-mail of the user who raised the order
    pub created_by: String,
    /// When the order was created
    pub created_at: DateTimeUtc,
    /// When the order was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `PurchaseOrder` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each order belongs to one supplier
    #[sea_orm(
        belongs_to = "super::supplier::Entity",
        from = "Column::SupplierId",
        to = "super::supplier::Column::Id"
    )]
    Supplier,
    /// Each order is for one item
    #[sea_orm(
        belongs_to = "super::item_master::Entity",
        from = "Column::ItemId",
        to = "super::item_master::Column::Id"
    )]
    Item,
    /// Each order is quoted in one unit
    #[sea_orm(
        belongs_to = "super::unit::Entity",
        from = "Column::UnitId",
        to = "super::unit::Column::Id"
    )]
    Unit,
    /// Optional sieve size band
    #[sea_orm(
        belongs_to = "super::sieve_size::Entity",
        from = "Column::SieveSizeId",
        to = "super::sieve_size::Column::Id"
    )]
    SieveSize,
    /// One order receives many Pre-GR entries
    #[sea_orm(has_many = "super::pre_gr_entry::Entity")]
    PreGrEntries,
}

impl Related<super::supplier::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Supplier.def()
    }
}

impl Related<super::item_master::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl Related<super::unit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Unit.def()
    }
}

impl Related<super::sieve_size::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SieveSize.def()
    }
}

impl Related<super::pre_gr_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PreGrEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
