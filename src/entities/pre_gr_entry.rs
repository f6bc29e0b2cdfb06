//! Pre-GR entity - The weighbridge record made when a supplier's truck arrives.
//!
//! A Pre-GR captures gross and tare weight before the quality team grades the lot.
//! The GQR that follows reconciles the graded weights against this net weight.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Pre-GR database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pre_gr_entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Document number, e.g. `PGR/2024-25/0001`
    #[sea_orm(unique)]
    pub pre_gr_number: String,
    /// Purchase order the delivery is made against
    pub po_id: i64,
    pub vehicle_number: Option<String>,
    pub arrival_date: Date,
    pub bag_count: i32,
    /// Loaded truck weight in kilograms
    pub gross_weight_kg: f64,
    /// Empty truck weight in kilograms
    pub tare_weight_kg: f64,
    pub remarks: Option<String>,
    pub created_by: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::purchase_order::Entity",
        from = "Column::PoId",
        to = "super::purchase_order::Column::Id"
    )]
    PurchaseOrder,
    #[sea_orm(has_many = "super::gqr_entry::Entity")]
    GqrEntries,
}

impl Related<super::purchase_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseOrder.def()
    }
}

impl Related<super::gqr_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GqrEntries.def()
    }
}

impl Model {
    /// Net delivered weight (gross minus tare) in kilograms.
    #[must_use]
    pub fn net_weight_kg(&self) -> f64 {
        self.gross_weight_kg - self.tare_weight_kg
    }
}

impl ActiveModelBehavior for ActiveModel {}
