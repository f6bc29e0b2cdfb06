//! Purchase order business logic.
//!
//! Orders are numbered per financial year, reference active master data, and move
//! through `open` → `closed` / `cancelled`. Only open orders can be edited or receive
//! Pre-GR entries.

use crate::{
    core::{
        item,
        numbering::{self, DocumentKind},
        sieve_size, supplier, unit, validate,
    },
    entities::{PreGrEntry, PurchaseOrder, pre_gr_entry, purchase_order, unit as unit_entity},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Lifecycle state of a purchase order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoStatus {
    /// Accepting deliveries
    Open,
    /// Fully received or manually closed
    Closed,
    /// Called off before completion
    Cancelled,
}

impl PoStatus {
    /// Value stored in the `status` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether an order may move from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Open, Self::Closed) | (Self::Open, Self::Cancelled) | (Self::Closed, Self::Open)
        )
    }
}

impl fmt::Display for PoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(Error::validation(format!("Unknown purchase order status '{other}'"))),
        }
    }
}

/// Editable purchase order fields.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseOrderInput {
    /// Defaults to today when omitted
    #[serde(default)]
    pub po_date: Option<NaiveDate>,
    pub supplier_id: i64,
    pub item_id: i64,
    #[serde(default)]
    pub sieve_size_id: Option<i64>,
    pub unit_id: i64,
    pub quantity: f64,
    pub rate: f64,
    #[serde(default)]
    pub delivery_location: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
}

/// Filters for listing purchase orders.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PurchaseOrderFilter {
    #[serde(default)]
    pub status: Option<PoStatus>,
    #[serde(default)]
    pub supplier_id: Option<i64>,
}

/// Ordered versus received weight for one purchase order.
#[derive(Debug, Clone, Serialize)]
pub struct PoProgress {
    pub purchase_order: purchase_order::Model,
    pub unit: unit_entity::Model,
    pub ordered_kg: f64,
    pub received_kg: f64,
    pub pending_kg: f64,
    pub order_value: f64,
    pub rate_per_kg: f64,
    pub delivery_count: usize,
}

async fn check_references<C: ConnectionTrait>(db: &C, input: &PurchaseOrderInput) -> Result<()> {
    supplier::get_supplier_by_id(db, input.supplier_id)
        .await?
        .filter(|s| s.is_active)
        .ok_or_else(|| Error::not_found("Supplier", input.supplier_id))?;
    item::get_item_by_id(db, input.item_id)
        .await?
        .filter(|i| i.is_active)
        .ok_or_else(|| Error::not_found("Item", input.item_id))?;
    unit::get_unit_by_id(db, input.unit_id)
        .await?
        .ok_or_else(|| Error::not_found("Unit", input.unit_id))?;
    if let Some(sieve_id) = input.sieve_size_id {
        sieve_size::get_sieve_size_by_id(db, sieve_id)
            .await?
            .filter(|s| s.is_active)
            .ok_or_else(|| Error::not_found("Sieve size", sieve_id))?;
    }
    Ok(())
}

/// Retrieves purchase orders matching `filter`, newest first.
pub async fn list_purchase_orders(
    db: &DatabaseConnection,
    filter: &PurchaseOrderFilter,
) -> Result<Vec<purchase_order::Model>> {
    let mut query = PurchaseOrder::find();
    if let Some(status) = filter.status {
        query = query.filter(purchase_order::Column::Status.eq(status.as_str()));
    }
    if let Some(supplier_id) = filter.supplier_id {
        query = query.filter(purchase_order::Column::SupplierId.eq(supplier_id));
    }
    query
        .order_by_desc(purchase_order::Column::PoDate)
        .order_by_desc(purchase_order::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a purchase order by its unique ID.
pub async fn get_purchase_order_by_id<C: ConnectionTrait>(
    db: &C,
    po_id: i64,
) -> Result<Option<purchase_order::Model>> {
    PurchaseOrder::find_by_id(po_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a new open purchase order with a generated number.
///
/// # Errors
/// Returns `Validation` for non-positive quantity or rate and `NotFound` when the
/// supplier, item, unit or sieve size is missing or inactive.
pub async fn create_purchase_order(
    db: &DatabaseConnection,
    input: PurchaseOrderInput,
    created_by: &str,
) -> Result<purchase_order::Model> {
    validate::positive("Quantity", input.quantity)?;
    validate::positive("Rate", input.rate)?;
    let po_date = input
        .po_date
        .unwrap_or_else(|| chrono::Utc::now().date_naive());

    let txn = db.begin().await?;
    check_references(&txn, &input).await?;
    let po_number = numbering::next_number(&txn, DocumentKind::PurchaseOrder, po_date).await?;

    let now = chrono::Utc::now();
    let order = purchase_order::ActiveModel {
        po_number: Set(po_number),
        po_date: Set(po_date),
        supplier_id: Set(input.supplier_id),
        item_id: Set(input.item_id),
        sieve_size_id: Set(input.sieve_size_id),
        unit_id: Set(input.unit_id),
        quantity: Set(input.quantity),
        rate: Set(input.rate),
        delivery_location: Set(validate::optional_text(input.delivery_location)),
        remarks: Set(validate::optional_text(input.remarks)),
        status: Set(PoStatus::Open.as_str().to_string()),
        created_by: Set(created_by.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = order.insert(&txn).await?;
    txn.commit().await?;

    tracing::info!(po_id = created.id, "Created purchase order {}", created.po_number);
    Ok(created)
}

/// Replaces the editable fields of an open purchase order. The number never changes.
pub async fn update_purchase_order(
    db: &DatabaseConnection,
    po_id: i64,
    input: PurchaseOrderInput,
) -> Result<purchase_order::Model> {
    validate::positive("Quantity", input.quantity)?;
    validate::positive("Rate", input.rate)?;

    let existing = get_purchase_order_by_id(db, po_id)
        .await?
        .ok_or_else(|| Error::not_found("Purchase order", po_id))?;
    if existing.status != PoStatus::Open.as_str() {
        return Err(Error::Conflict {
            message: format!(
                "Purchase order {} is {} and cannot be edited",
                existing.po_number, existing.status
            ),
        });
    }
    check_references(db, &input).await?;

    let po_date = input.po_date.unwrap_or(existing.po_date);
    let mut order: purchase_order::ActiveModel = existing.into();
    order.po_date = Set(po_date);
    order.supplier_id = Set(input.supplier_id);
    order.item_id = Set(input.item_id);
    order.sieve_size_id = Set(input.sieve_size_id);
    order.unit_id = Set(input.unit_id);
    order.quantity = Set(input.quantity);
    order.rate = Set(input.rate);
    order.delivery_location = Set(validate::optional_text(input.delivery_location));
    order.remarks = Set(validate::optional_text(input.remarks));
    order.updated_at = Set(chrono::Utc::now());
    order.update(db).await.map_err(Into::into)
}

/// Moves a purchase order to `status` if the transition is allowed.
///
/// # Errors
/// Returns `Conflict` for transitions out of `cancelled` or other disallowed moves.
pub async fn set_purchase_order_status(
    db: &DatabaseConnection,
    po_id: i64,
    status: PoStatus,
) -> Result<purchase_order::Model> {
    let existing = get_purchase_order_by_id(db, po_id)
        .await?
        .ok_or_else(|| Error::not_found("Purchase order", po_id))?;
    let current: PoStatus = existing.status.parse()?;

    if !current.can_transition_to(status) {
        return Err(Error::Conflict {
            message: format!(
                "Purchase order {} cannot move from {current} to {status}",
                existing.po_number
            ),
        });
    }

    let mut order: purchase_order::ActiveModel = existing.into();
    order.status = Set(status.as_str().to_string());
    order.updated_at = Set(chrono::Utc::now());
    order.update(db).await.map_err(Into::into)
}

/// Computes ordered, received and pending weight for a purchase order.
pub async fn get_purchase_order_progress(
    db: &DatabaseConnection,
    po_id: i64,
) -> Result<PoProgress> {
    let order = get_purchase_order_by_id(db, po_id)
        .await?
        .ok_or_else(|| Error::not_found("Purchase order", po_id))?;
    let order_unit = unit::get_unit_by_id(db, order.unit_id)
        .await?
        .ok_or_else(|| Error::not_found("Unit", order.unit_id))?;
    let deliveries = PreGrEntry::find()
        .filter(pre_gr_entry::Column::PoId.eq(po_id))
        .all(db)
        .await?;

    let ordered_kg = unit::to_kg(order.quantity, &order_unit);
    let received_kg: f64 = deliveries.iter().map(pre_gr_entry::Model::net_weight_kg).sum();

    Ok(PoProgress {
        ordered_kg,
        received_kg,
        pending_kg: (ordered_kg - received_kg).max(0.0),
        order_value: order.quantity * order.rate,
        rate_per_kg: unit::rate_per_kg(order.rate, order_unit.kg_factor),
        delivery_count: deliveries.len(),
        purchase_order: order,
        unit: order_unit,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_status_transitions() {
        assert!(PoStatus::Open.can_transition_to(PoStatus::Closed));
        assert!(PoStatus::Closed.can_transition_to(PoStatus::Open));
        assert!(!PoStatus::Cancelled.can_transition_to(PoStatus::Open));
        assert!(!PoStatus::Open.can_transition_to(PoStatus::Open));
        assert_eq!("cancelled".parse::<PoStatus>().unwrap(), PoStatus::Cancelled);
        assert!("done".parse::<PoStatus>().is_err());
    }

    #[tokio::test]
    async fn test_create_purchase_order_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let input = PurchaseOrderInput {
            po_date: None,
            supplier_id: 1,
            item_id: 1,
            sieve_size_id: None,
            unit_id: 1,
            quantity: 0.0,
            rate: 1800.0,
            delivery_location: None,
            remarks: None,
        };

        let result = create_purchase_order(&db, input, "buyer@example.com").await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_purchase_order_numbers_sequentially() -> Result<()> {
        let fixture = setup_with_purchase_order().await?;
        assert_eq!(fixture.purchase_order.po_number, "PO/2024-25/0001");
        assert_eq!(fixture.purchase_order.status, "open");

        let second = create_purchase_order(
            &fixture.db,
            po_input(&fixture, 50.0, 2000.0),
            "buyer@example.com",
        )
        .await?;
        assert_eq!(second.po_number, "PO/2024-25/0002");
        Ok(())
    }

    #[tokio::test]
    async fn test_create_purchase_order_rejects_inactive_supplier() -> Result<()> {
        let fixture = setup_with_purchase_order().await?;
        supplier::deactivate_supplier(&fixture.db, fixture.supplier.id).await?;

        let result = create_purchase_order(
            &fixture.db,
            po_input(&fixture, 10.0, 1500.0),
            "buyer@example.com",
        )
        .await;
        assert!(matches!(result, Err(Error::NotFound { entity: "Supplier", .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_only_open_orders() -> Result<()> {
        let fixture = setup_with_purchase_order().await?;
        let po_id = fixture.purchase_order.id;

        let updated =
            update_purchase_order(&fixture.db, po_id, po_input(&fixture, 80.0, 1700.0)).await?;
        assert_eq!(updated.quantity, 80.0);
        assert_eq!(updated.po_number, fixture.purchase_order.po_number);

        set_purchase_order_status(&fixture.db, po_id, PoStatus::Cancelled).await?;
        let result =
            update_purchase_order(&fixture.db, po_id, po_input(&fixture, 90.0, 1700.0)).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));

        let result = set_purchase_order_status(&fixture.db, po_id, PoStatus::Open).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_progress_tracks_deliveries() -> Result<()> {
        let fixture = setup_with_pre_gr().await?;

        let progress =
            get_purchase_order_progress(&fixture.db, fixture.purchase_order.id).await?;
        // 100 quintals ordered, one truck of 12_000 - 2_000 kg received
        assert_eq!(progress.ordered_kg, 10_000.0);
        assert_eq!(progress.received_kg, 10_000.0);
        assert_eq!(progress.pending_kg, 0.0);
        assert_eq!(progress.rate_per_kg, 18.0);
        assert_eq!(progress.order_value, 180_000.0);
        assert_eq!(progress.delivery_count, 1);
        Ok(())
    }
}
