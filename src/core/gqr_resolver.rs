//! GQR relationship resolver.
//!
//! Resolves a GQR together with its Pre-GR, purchase order, supplier, item and unit in
//! a single LEFT JOIN query. Any link that is missing is replaced with a fixed
//! placeholder, so callers always receive every field. Only a failure of the query
//! itself (or a missing GQR when one id is requested) is reported as an error.

use crate::{
    core::unit,
    entities::{
        GqrEntry, gqr_entry, item_master, pre_gr_entry, purchase_order, supplier,
        unit as unit_entity,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{
    FromQueryResult, JoinType, QueryOrder, QueryResult, QuerySelect, RelationTrait, Select,
    prelude::*,
};
use serde::{Deserialize, Serialize};

/// Name shown when the supplier cannot be resolved.
pub const PLACEHOLDER_SUPPLIER: &str = "Unknown Supplier";
/// Name shown when the item cannot be resolved.
pub const PLACEHOLDER_ITEM: &str = "Unknown Item";
/// Document number shown when a Pre-GR or purchase order cannot be resolved.
pub const PLACEHOLDER_NUMBER: &str = "N/A";

/// Pre-GR fields carried on a resolved GQR.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreGrSummary {
    pub id: Option<i64>,
    pub pre_gr_number: String,
    pub arrival_date: Option<NaiveDate>,
    pub vehicle_number: String,
    pub bag_count: i32,
    pub gross_weight_kg: f64,
    pub tare_weight_kg: f64,
    pub net_weight_kg: f64,
}

impl PreGrSummary {
    fn placeholder() -> Self {
        Self {
            id: None,
            pre_gr_number: PLACEHOLDER_NUMBER.to_string(),
            arrival_date: None,
            vehicle_number: String::new(),
            bag_count: 0,
            gross_weight_kg: 0.0,
            tare_weight_kg: 0.0,
            net_weight_kg: 0.0,
        }
    }
}

/// Purchase order fields carried on a resolved GQR.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseOrderSummary {
    pub id: Option<i64>,
    pub po_number: String,
    pub po_date: Option<NaiveDate>,
    pub quantity: f64,
    pub rate: f64,
    pub status: String,
    pub unit_abbreviation: String,
    pub rate_per_kg: f64,
}

impl PurchaseOrderSummary {
    fn placeholder() -> Self {
        Self {
            id: None,
            po_number: PLACEHOLDER_NUMBER.to_string(),
            po_date: None,
            quantity: 0.0,
            rate: 0.0,
            status: String::new(),
            unit_abbreviation: String::new(),
            rate_per_kg: 0.0,
        }
    }
}

/// Supplier fields carried on a resolved GQR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupplierSummary {
    pub id: Option<i64>,
    pub name: String,
    /// Ledger to post against in Tally
    pub ledger_name: String,
}

impl SupplierSummary {
    fn placeholder() -> Self {
        Self {
            id: None,
            name: PLACEHOLDER_SUPPLIER.to_string(),
            ledger_name: PLACEHOLDER_SUPPLIER.to_string(),
        }
    }
}

/// Item fields carried on a resolved GQR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemSummary {
    pub id: Option<i64>,
    pub name: String,
    pub hsn_code: String,
}

impl ItemSummary {
    fn placeholder() -> Self {
        Self {
            id: None,
            name: PLACEHOLDER_ITEM.to_string(),
            hsn_code: String::new(),
        }
    }
}

/// Figures derived from the graded weights.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GqrMetrics {
    pub net_weight_kg: f64,
    pub graded_total_kg: f64,
    /// Rotten + sprouted + doubles
    pub rejected_kg: f64,
    /// Net weight not accounted for by any grade, never negative
    pub shortage_kg: f64,
    pub export_quality_pct: f64,
    /// Export quality at the order rate plus small size at the small size rate
    pub computed_value: f64,
    /// Rejected weight at the order rate
    pub rejected_value: f64,
}

/// A GQR with every related record resolved or replaced by a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedGqr {
    pub gqr: gqr_entry::Model,
    pub pre_gr: PreGrSummary,
    pub purchase_order: PurchaseOrderSummary,
    pub supplier: SupplierSummary,
    pub item: ItemSummary,
    pub metrics: GqrMetrics,
}

impl ResolvedGqr {
    /// Whether every link from the GQR to supplier and item was found.
    #[must_use]
    pub const fn is_fully_linked(&self) -> bool {
        self.pre_gr.id.is_some()
            && self.purchase_order.id.is_some()
            && self.supplier.id.is_some()
            && self.item.id.is_some()
    }
}

/// Filters for listing resolved GQRs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GqrFilter {
    /// `"draft"` or `"finalized"`
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub tally_posted: Option<bool>,
    #[serde(default)]
    pub supplier_id: Option<i64>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Derives totals, percentages and values from a GQR's graded weights.
#[must_use]
pub fn compute_metrics(gqr: &gqr_entry::Model, net_weight_kg: f64, rate_per_kg: f64) -> GqrMetrics {
    let rejected_kg = gqr.rotten_kg + gqr.sprouted_kg + gqr.doubles_kg;
    let graded_total_kg = gqr.export_quality_kg + gqr.small_size_kg + rejected_kg;
    let export_quality_pct = if net_weight_kg > 0.0 {
        round2(gqr.export_quality_kg / net_weight_kg * 100.0)
    } else {
        0.0
    };
    let computed_value = gqr.export_quality_kg * rate_per_kg
        + gqr.small_size_kg * gqr.small_size_rate.unwrap_or(0.0);

    GqrMetrics {
        net_weight_kg,
        graded_total_kg,
        rejected_kg,
        shortage_kg: (net_weight_kg - graded_total_kg).max(0.0),
        export_quality_pct,
        computed_value: round2(computed_value),
        rejected_value: round2(rejected_kg * rate_per_kg),
    }
}

struct JoinedRow(ResolvedGqr);

impl FromQueryResult for JoinedRow {
    fn from_query_result(res: &QueryResult, pre: &str) -> std::result::Result<Self, DbErr> {
        let gqr = gqr_entry::Model::from_query_result(res, pre)?;

        let pre_gr = match res.try_get::<Option<i64>>(pre, "pgr_id")? {
            Some(id) => {
                let gross: f64 = res.try_get(pre, "pgr_gross_weight_kg")?;
                let tare: f64 = res.try_get(pre, "pgr_tare_weight_kg")?;
                PreGrSummary {
                    id: Some(id),
                    pre_gr_number: res.try_get(pre, "pgr_number")?,
                    arrival_date: res.try_get(pre, "pgr_arrival_date")?,
                    vehicle_number: res
                        .try_get::<Option<String>>(pre, "pgr_vehicle_number")?
                        .unwrap_or_default(),
                    bag_count: res.try_get(pre, "pgr_bag_count")?,
                    gross_weight_kg: gross,
                    tare_weight_kg: tare,
                    net_weight_kg: gross - tare,
                }
            }
            None => PreGrSummary::placeholder(),
        };

        let purchase_order = match res.try_get::<Option<i64>>(pre, "po_id")? {
            Some(id) => {
                let rate: f64 = res.try_get(pre, "po_rate")?;
                let kg_factor = res
                    .try_get::<Option<f64>>(pre, "unit_kg_factor")?
                    .unwrap_or(0.0);
                PurchaseOrderSummary {
                    id: Some(id),
                    po_number: res.try_get(pre, "po_number")?,
                    po_date: res.try_get(pre, "po_date")?,
                    quantity: res.try_get(pre, "po_quantity")?,
                    rate,
                    status: res.try_get(pre, "po_status")?,
                    unit_abbreviation: res
                        .try_get::<Option<String>>(pre, "unit_abbreviation")?
                        .unwrap_or_default(),
                    rate_per_kg: unit::rate_per_kg(rate, kg_factor),
                }
            }
            None => PurchaseOrderSummary::placeholder(),
        };

        let supplier = match res.try_get::<Option<i64>>(pre, "supplier_id")? {
            Some(id) => {
                let name: String = res.try_get(pre, "supplier_name")?;
                let ledger_name = res
                    .try_get::<Option<String>>(pre, "supplier_ledger")?
                    .filter(|l| !l.trim().is_empty())
                    .unwrap_or_else(|| name.clone());
                SupplierSummary {
                    id: Some(id),
                    name,
                    ledger_name,
                }
            }
            None => SupplierSummary::placeholder(),
        };

        let item = match res.try_get::<Option<i64>>(pre, "item_id")? {
            Some(id) => ItemSummary {
                id: Some(id),
                name: res.try_get(pre, "item_name")?,
                hsn_code: res
                    .try_get::<Option<String>>(pre, "item_hsn_code")?
                    .unwrap_or_default(),
            },
            None => ItemSummary::placeholder(),
        };

        let metrics = compute_metrics(&gqr, pre_gr.net_weight_kg, purchase_order.rate_per_kg);
        Ok(Self(ResolvedGqr {
            gqr,
            pre_gr,
            purchase_order,
            supplier,
            item,
            metrics,
        }))
    }
}

fn joined_select() -> Select<GqrEntry> {
    GqrEntry::find()
        .join(JoinType::LeftJoin, gqr_entry::Relation::PreGrEntry.def())
        .join(JoinType::LeftJoin, pre_gr_entry::Relation::PurchaseOrder.def())
        .join(JoinType::LeftJoin, purchase_order::Relation::Supplier.def())
        .join(JoinType::LeftJoin, purchase_order::Relation::Item.def())
        .join(JoinType::LeftJoin, purchase_order::Relation::Unit.def())
        .column_as(pre_gr_entry::Column::Id, "pgr_id")
        .column_as(pre_gr_entry::Column::PreGrNumber, "pgr_number")
        .column_as(pre_gr_entry::Column::ArrivalDate, "pgr_arrival_date")
        .column_as(pre_gr_entry::Column::VehicleNumber, "pgr_vehicle_number")
        .column_as(pre_gr_entry::Column::BagCount, "pgr_bag_count")
        .column_as(pre_gr_entry::Column::GrossWeightKg, "pgr_gross_weight_kg")
        .column_as(pre_gr_entry::Column::TareWeightKg, "pgr_tare_weight_kg")
        .column_as(purchase_order::Column::Id, "po_id")
        .column_as(purchase_order::Column::PoNumber, "po_number")
        .column_as(purchase_order::Column::PoDate, "po_date")
        .column_as(purchase_order::Column::Quantity, "po_quantity")
        .column_as(purchase_order::Column::Rate, "po_rate")
        .column_as(purchase_order::Column::Status, "po_status")
        .column_as(unit_entity::Column::Abbreviation, "unit_abbreviation")
        .column_as(unit_entity::Column::KgFactor, "unit_kg_factor")
        .column_as(supplier::Column::Id, "supplier_id")
        .column_as(supplier::Column::Name, "supplier_name")
        .column_as(supplier::Column::TallyLedgerName, "supplier_ledger")
        .column_as(item_master::Column::Id, "item_id")
        .column_as(item_master::Column::Name, "item_name")
        .column_as(item_master::Column::HsnCode, "item_hsn_code")
}

/// Resolves one GQR and everything it links to.
///
/// # Errors
/// Returns `NotFound` if the GQR does not exist, or `Database` if the query fails.
pub async fn resolve_gqr<C: ConnectionTrait>(db: &C, gqr_id: i64) -> Result<ResolvedGqr> {
    joined_select()
        .filter(gqr_entry::Column::Id.eq(gqr_id))
        .into_model::<JoinedRow>()
        .one(db)
        .await?
        .map(|row| row.0)
        .ok_or_else(|| Error::not_found("GQR", gqr_id))
}

/// Resolves every GQR matching `filter`, newest inspection first.
pub async fn resolve_gqrs(db: &DatabaseConnection, filter: &GqrFilter) -> Result<Vec<ResolvedGqr>> {
    let mut query = joined_select();
    if let Some(status) = filter.status.as_deref() {
        query = query.filter(gqr_entry::Column::Status.eq(status));
    }
    if let Some(posted) = filter.tally_posted {
        query = query.filter(gqr_entry::Column::TallyPosted.eq(posted));
    }
    if let Some(supplier_id) = filter.supplier_id {
        query = query.filter(purchase_order::Column::SupplierId.eq(supplier_id));
    }

    let rows = query
        .order_by_desc(gqr_entry::Column::InspectionDate)
        .order_by_desc(gqr_entry::Column::Id)
        .into_model::<JoinedRow>()
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|row| row.0).collect())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::gqr::{self, GqrInput};
    use crate::test_utils::*;

    #[test]
    fn test_compute_metrics() {
        let fixture_gqr = sample_gqr_model(7000.0, 1500.0, 800.0, 300.0, 200.0, Some(8.0));
        let metrics = compute_metrics(&fixture_gqr, 10_000.0, 18.0);

        assert_eq!(metrics.rejected_kg, 1300.0);
        assert_eq!(metrics.graded_total_kg, 9800.0);
        assert_eq!(metrics.shortage_kg, 200.0);
        assert_eq!(metrics.export_quality_pct, 70.0);
        assert_eq!(metrics.computed_value, 7000.0 * 18.0 + 1500.0 * 8.0);
        assert_eq!(metrics.rejected_value, 1300.0 * 18.0);
    }

    #[test]
    fn test_compute_metrics_without_net_weight() {
        let fixture_gqr = sample_gqr_model(100.0, 0.0, 0.0, 0.0, 0.0, None);
        let metrics = compute_metrics(&fixture_gqr, 0.0, 0.0);
        assert_eq!(metrics.export_quality_pct, 0.0);
        assert_eq!(metrics.shortage_kg, 0.0);
        assert_eq!(metrics.computed_value, 0.0);
    }

    #[tokio::test]
    async fn test_resolve_fully_linked_gqr() -> Result<()> {
        let fixture = setup_with_gqr().await?;

        let resolved = resolve_gqr(&fixture.db, fixture.gqr.id).await?;
        assert!(resolved.is_fully_linked());
        assert_eq!(resolved.gqr, fixture.gqr);
        assert_eq!(resolved.pre_gr.pre_gr_number, fixture.pre_gr.pre_gr_number);
        assert_eq!(resolved.pre_gr.net_weight_kg, 10_000.0);
        assert_eq!(resolved.purchase_order.po_number, fixture.purchase_order.po_number);
        assert_eq!(resolved.purchase_order.unit_abbreviation, "qtl");
        assert_eq!(resolved.purchase_order.rate_per_kg, 18.0);
        assert_eq!(resolved.supplier.name, fixture.supplier.name);
        assert_eq!(resolved.item.name, fixture.item.name);
        assert_eq!(resolved.metrics.computed_value, 7000.0 * 18.0 + 1500.0 * 8.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_unlinked_gqr_gets_placeholders() -> Result<()> {
        let db = setup_test_db().await?;
        let orphan = gqr::create_gqr(
            &db,
            GqrInput {
                pre_gr_id: None,
                ..sample_gqr_input()
            },
        )
        .await?;

        let resolved = resolve_gqr(&db, orphan.id).await?;
        assert!(!resolved.is_fully_linked());
        assert_eq!(resolved.supplier.name, PLACEHOLDER_SUPPLIER);
        assert_eq!(resolved.item.name, PLACEHOLDER_ITEM);
        assert_eq!(resolved.purchase_order.po_number, PLACEHOLDER_NUMBER);
        assert_eq!(resolved.pre_gr.pre_gr_number, PLACEHOLDER_NUMBER);
        assert_eq!(resolved.metrics.net_weight_kg, 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_gqr_is_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        let result = resolve_gqr(&db, 404).await;
        assert!(matches!(result, Err(Error::NotFound { entity: "GQR", .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_gqrs_filters() -> Result<()> {
        let fixture = setup_with_gqr().await?;
        gqr::create_gqr(
            &fixture.db,
            GqrInput {
                pre_gr_id: None,
                ..sample_gqr_input()
            },
        )
        .await?;

        let all = resolve_gqrs(&fixture.db, &GqrFilter::default()).await?;
        assert_eq!(all.len(), 2);

        let for_supplier = resolve_gqrs(
            &fixture.db,
            &GqrFilter {
                supplier_id: Some(fixture.supplier.id),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(for_supplier.len(), 1);
        assert_eq!(for_supplier[0].gqr.id, fixture.gqr.id);

        let posted = resolve_gqrs(
            &fixture.db,
            &GqrFilter {
                tally_posted: Some(true),
                ..Default::default()
            },
        )
        .await?;
        assert!(posted.is_empty());
        Ok(())
    }
}
