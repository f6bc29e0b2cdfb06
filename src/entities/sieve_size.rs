//! Sieve size entity - Bulb diameter bands used to grade onions (e.g., "45-55mm").

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sieve size database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sieve_sizes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Label shown on purchase orders
    #[sea_orm(unique)]
    pub label: String,
    /// Smallest accepted bulb diameter in millimetres
    pub min_mm: f64,
    /// Largest accepted bulb diameter in millimetres, `None` for open-ended bands
    pub max_mm: Option<f64>,
    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::purchase_order::Entity")]
    PurchaseOrders,
}

impl Related<super::purchase_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseOrders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
