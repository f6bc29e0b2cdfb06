//! Supplier entity - Farmers, traders and aggregators onions are bought from.
//!
//! Suppliers are never hard-deleted once created; deactivating a supplier hides it
//! from pick lists while keeping purchase order history intact.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Supplier database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "suppliers")]
pub struct Model {
    /// Unique identifier for the supplier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Trading name, unique across suppliers
    #[sea_orm(unique)]
    pub name: String,
    /// Person to call about deliveries
    pub contact_person: Option<String>,
    /// Contact phone number
    pub phone: Option<String>,
    /// Contact e-mail
    pub email: Option<String>,
    /// Postal address
    pub address: Option<String>,
    /// GSTIN
    pub gst_number: Option<String>,
    /// PAN
    pub pan_number: Option<String>,
    /// Bank account number for payments
    pub bank_account: Option<String>,
    /// IFSC code of the bank branch
    pub ifsc_code: Option<String>,
    /// Ledger name in Tally if it differs from `name`
    pub tally_ledger_name: Option<String>,
    /// Inactive suppliers are hidden from lists
    pub is_active: bool,
    /// When the supplier was created
    pub created_at: DateTimeUtc,
    /// When the supplier was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Supplier and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One supplier has many purchase orders
    #[sea_orm(has_many = "super::purchase_order::Entity")]
    PurchaseOrders,
}

impl Related<super::purchase_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseOrders.def()
    }
}

impl Model {
    /// Ledger to use when posting vouchers to Tally.
    #[must_use]
    pub fn ledger_name(&self) -> &str {
        self.tally_ledger_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.name)
    }
}

impl ActiveModelBehavior for ActiveModel {}
