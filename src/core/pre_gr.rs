//! Pre-GR business logic - weighbridge entries recorded against open purchase orders.

use crate::{
    core::{
        numbering::{self, DocumentKind},
        purchase_order::{self, PoStatus},
        validate,
    },
    entities::{PreGrEntry, pre_gr_entry},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Deserialize;

/// Fields captured at the weighbridge.
#[derive(Debug, Clone, Deserialize)]
pub struct PreGrInput {
    pub po_id: i64,
    #[serde(default)]
    pub vehicle_number: Option<String>,
    /// Defaults to today when omitted
    #[serde(default)]
    pub arrival_date: Option<NaiveDate>,
    pub bag_count: i32,
    pub gross_weight_kg: f64,
    pub tare_weight_kg: f64,
    #[serde(default)]
    pub remarks: Option<String>,
}

/// Retrieves Pre-GR entries, newest first, optionally for one purchase order.
pub async fn list_pre_gr_entries(
    db: &DatabaseConnection,
    po_id: Option<i64>,
) -> Result<Vec<pre_gr_entry::Model>> {
    let mut query = PreGrEntry::find();
    if let Some(po_id) = po_id {
        query = query.filter(pre_gr_entry::Column::PoId.eq(po_id));
    }
    query
        .order_by_desc(pre_gr_entry::Column::ArrivalDate)
        .order_by_desc(pre_gr_entry::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a Pre-GR entry by its unique ID.
pub async fn get_pre_gr_by_id<C: ConnectionTrait>(
    db: &C,
    pre_gr_id: i64,
) -> Result<Option<pre_gr_entry::Model>> {
    PreGrEntry::find_by_id(pre_gr_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Records a truck arrival against an open purchase order.
///
/// # Errors
/// Returns `Validation` when weights are negative, tare exceeds gross, or the bag count is
/// negative; `NotFound` for an unknown order; `Conflict` when the order is not open.
pub async fn create_pre_gr(
    db: &DatabaseConnection,
    input: PreGrInput,
    created_by: &str,
) -> Result<pre_gr_entry::Model> {
    let gross = validate::positive("Gross weight", input.gross_weight_kg)?;
    let tare = validate::non_negative("Tare weight", input.tare_weight_kg)?;
    if tare > gross {
        return Err(Error::validation(format!(
            "Tare weight {tare} kg exceeds gross weight {gross} kg"
        )));
    }
    if input.bag_count < 0 {
        return Err(Error::validation("Bag count cannot be negative"));
    }
    let arrival_date = input
        .arrival_date
        .unwrap_or_else(|| chrono::Utc::now().date_naive());

    let txn = db.begin().await?;
    let order = purchase_order::get_purchase_order_by_id(&txn, input.po_id)
        .await?
        .ok_or_else(|| Error::not_found("Purchase order", input.po_id))?;
    if order.status != PoStatus::Open.as_str() {
        return Err(Error::Conflict {
            message: format!(
                "Purchase order {} is {} and cannot receive deliveries",
                order.po_number, order.status
            ),
        });
    }

    let pre_gr_number = numbering::next_number(&txn, DocumentKind::PreGr, arrival_date).await?;
    let now = chrono::Utc::now();
    let entry = pre_gr_entry::ActiveModel {
        pre_gr_number: Set(pre_gr_number),
        po_id: Set(input.po_id),
        vehicle_number: Set(validate::optional_text(input.vehicle_number).map(|v| v.to_uppercase())),
        arrival_date: Set(arrival_date),
        bag_count: Set(input.bag_count),
        gross_weight_kg: Set(gross),
        tare_weight_kg: Set(tare),
        remarks: Set(validate::optional_text(input.remarks)),
        created_by: Set(created_by.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = entry.insert(&txn).await?;
    txn.commit().await?;

    tracing::info!(
        pre_gr_id = created.id,
        po_id = created.po_id,
        "Recorded Pre-GR {} ({:.0} kg net)",
        created.pre_gr_number,
        created.net_weight_kg()
    );
    Ok(created)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    fn input(po_id: i64, gross: f64, tare: f64) -> PreGrInput {
        PreGrInput {
            po_id,
            vehicle_number: Some("mh15 ab 1234".to_string()),
            arrival_date: NaiveDate::from_ymd_opt(2024, 11, 6),
            bag_count: 200,
            gross_weight_kg: gross,
            tare_weight_kg: tare,
            remarks: None,
        }
    }

    #[tokio::test]
    async fn test_create_pre_gr() -> Result<()> {
        let fixture = setup_with_purchase_order().await?;

        let entry =
            create_pre_gr(&fixture.db, input(fixture.purchase_order.id, 9000.0, 2500.0), "gate")
                .await?;
        assert_eq!(entry.pre_gr_number, "PGR/2024-25/0001");
        assert_eq!(entry.net_weight_kg(), 6500.0);
        assert_eq!(entry.vehicle_number.as_deref(), Some("MH15 AB 1234"));

        let listed = list_pre_gr_entries(&fixture.db, Some(fixture.purchase_order.id)).await?;
        assert_eq!(listed, vec![entry]);
        Ok(())
    }

    #[tokio::test]
    async fn test_tare_above_gross_rejected() -> Result<()> {
        let fixture = setup_with_purchase_order().await?;

        let result =
            create_pre_gr(&fixture.db, input(fixture.purchase_order.id, 2000.0, 2500.0), "gate")
                .await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_closed_order_rejects_delivery() -> Result<()> {
        let fixture = setup_with_purchase_order().await?;
        purchase_order::set_purchase_order_status(
            &fixture.db,
            fixture.purchase_order.id,
            PoStatus::Closed,
        )
        .await?;

        let result =
            create_pre_gr(&fixture.db, input(fixture.purchase_order.id, 9000.0, 2500.0), "gate")
                .await;
        assert!(matches!(result, Err(Error::Conflict { .. })));

        let missing = create_pre_gr(&fixture.db, input(999, 9000.0, 2500.0), "gate").await;
        assert!(matches!(missing, Err(Error::NotFound { .. })));
        Ok(())
    }
}
