//! GQR business logic - grading a delivered lot, finalizing it and settling in Tally.
//!
//! A GQR starts as a draft that can be edited freely. Finalizing fixes the settled
//! value from the graded weights and the order rate. Only finalized reports can be
//! posted to Tally, and each report is posted at most once. A Pre-GR is graded by at
//! most one GQR. Finalizing and settling are reserved for managers and admins.

use crate::{
    core::{
        auth::{self, Role},
        gqr_resolver::{self, ResolvedGqr},
        numbering::{self, DocumentKind},
        pre_gr, validate,
    },
    entities::{GqrEntry, gqr_entry},
    errors::{Error, Result},
    tally::{PostingLedgers, TallyGateway, Voucher, VoucherKind, envelope},
};
use chrono::NaiveDate;
use sea_orm::{Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Lifecycle state of a GQR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GqrStatus {
    /// Editable
    Draft,
    /// Value settled, ready for Tally
    Finalized,
}

impl GqrStatus {
    /// Value stored in the `status` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Finalized => "finalized",
        }
    }
}

impl fmt::Display for GqrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GqrStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "draft" => Ok(Self::Draft),
            "finalized" => Ok(Self::Finalized),
            other => Err(Error::validation(format!("Unknown GQR status '{other}'"))),
        }
    }
}

/// Graded weights entered by the quality inspector.
#[derive(Debug, Clone, Deserialize)]
pub struct GqrInput {
    #[serde(default)]
    pub pre_gr_id: Option<i64>,
    /// Defaults to today when omitted
    #[serde(default)]
    pub inspection_date: Option<NaiveDate>,
    pub export_quality_kg: f64,
    #[serde(default)]
    pub small_size_kg: f64,
    #[serde(default)]
    pub rotten_kg: f64,
    #[serde(default)]
    pub sprouted_kg: f64,
    #[serde(default)]
    pub doubles_kg: f64,
    #[serde(default)]
    pub small_size_rate: Option<f64>,
    #[serde(default)]
    pub remarks: Option<String>,
}

impl GqrInput {
    fn graded_total_kg(&self) -> f64 {
        self.export_quality_kg + self.small_size_kg + self.rotten_kg + self.sprouted_kg + self.doubles_kg
    }
}

/// Roles allowed to finalize GQRs and settle them in Tally.
pub const SETTLEMENT_ROLES: &[Role] = &[Role::Admin, Role::Manager];

/// Checks weights, and that the Pre-GR exists, is not graded by another GQR than
/// `current` and covers the graded total.
async fn validate_input<C: ConnectionTrait>(
    db: &C,
    input: &GqrInput,
    current: Option<i64>,
) -> Result<()> {
    validate::non_negative("Export quality weight", input.export_quality_kg)?;
    validate::non_negative("Small size weight", input.small_size_kg)?;
    validate::non_negative("Rotten weight", input.rotten_kg)?;
    validate::non_negative("Sprouted weight", input.sprouted_kg)?;
    validate::non_negative("Doubles weight", input.doubles_kg)?;
    if let Some(rate) = input.small_size_rate {
        validate::non_negative("Small size rate", rate)?;
    }

    if let Some(pre_gr_id) = input.pre_gr_id {
        let entry = pre_gr::get_pre_gr_by_id(db, pre_gr_id)
            .await?
            .ok_or_else(|| Error::not_found("Pre-GR", pre_gr_id))?;

        let mut graded_by = GqrEntry::find().filter(gqr_entry::Column::PreGrId.eq(pre_gr_id));
        if let Some(current) = current {
            graded_by = graded_by.filter(gqr_entry::Column::Id.ne(current));
        }
        if let Some(other) = graded_by.one(db).await? {
            return Err(duplicate_grading(&entry.pre_gr_number, &other.gqr_number));
        }

        let net = entry.net_weight_kg();
        let graded = input.graded_total_kg();
        if graded > net + f64::EPSILON {
            return Err(Error::validation(format!(
                "Graded weight {graded} kg exceeds net weight {net} kg of {}",
                entry.pre_gr_number
            )));
        }
    }
    Ok(())
}

fn duplicate_grading(pre_gr_number: &str, gqr_number: &str) -> Error {
    Error::Conflict {
        message: format!("{pre_gr_number} is already graded by {gqr_number}"),
    }
}

/// Finds a GQR by its unique ID.
pub async fn get_gqr_by_id<C: ConnectionTrait>(
    db: &C,
    gqr_id: i64,
) -> Result<Option<gqr_entry::Model>> {
    GqrEntry::find_by_id(gqr_id).one(db).await.map_err(Into::into)
}

/// Records a new draft GQR with a generated number.
///
/// # Errors
/// Returns `Validation` for negative weights or when the graded total exceeds the
/// Pre-GR net weight, `NotFound` for an unknown Pre-GR and `Conflict` when the Pre-GR
/// is already graded.
pub async fn create_gqr(db: &DatabaseConnection, input: GqrInput) -> Result<gqr_entry::Model> {
    let inspection_date = input
        .inspection_date
        .unwrap_or_else(|| chrono::Utc::now().date_naive());

    let txn = db.begin().await?;
    validate_input(&txn, &input, None).await?;
    let gqr_number = numbering::next_number(&txn, DocumentKind::Gqr, inspection_date).await?;

    let now = chrono::Utc::now();
    let entry = gqr_entry::ActiveModel {
        gqr_number: Set(gqr_number),
        pre_gr_id: Set(input.pre_gr_id),
        inspection_date: Set(inspection_date),
        export_quality_kg: Set(input.export_quality_kg),
        small_size_kg: Set(input.small_size_kg),
        rotten_kg: Set(input.rotten_kg),
        sprouted_kg: Set(input.sprouted_kg),
        doubles_kg: Set(input.doubles_kg),
        small_size_rate: Set(input.small_size_rate),
        status: Set(GqrStatus::Draft.as_str().to_string()),
        value_after_gqr: Set(None),
        finalized_at: Set(None),
        finalized_by: Set(None),
        tally_posted: Set(false),
        tally_posted_at: Set(None),
        tally_voucher_number: Set(None),
        remarks: Set(validate::optional_text(input.remarks)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = entry
        .insert(&txn)
        .await
        .map_err(|e| Error::from(e).on_duplicate("The Pre-GR is already graded by another GQR"))?;
    txn.commit().await?;

    tracing::info!(gqr_id = created.id, pre_gr_id = ?created.pre_gr_id, "Created GQR {}", created.gqr_number);
    Ok(created)
}

/// Replaces the graded weights of a draft GQR.
///
/// # Errors
/// Returns `Conflict` once the report is finalized, or when the new Pre-GR is already
/// graded by another GQR.
pub async fn update_gqr(
    db: &DatabaseConnection,
    gqr_id: i64,
    input: GqrInput,
) -> Result<gqr_entry::Model> {
    let txn = db.begin().await?;
    let existing = get_gqr_by_id(&txn, gqr_id)
        .await?
        .ok_or_else(|| Error::not_found("GQR", gqr_id))?;
    if existing.status == GqrStatus::Finalized.as_str() {
        return Err(Error::Conflict {
            message: format!("{} is finalized and cannot be edited", existing.gqr_number),
        });
    }
    validate_input(&txn, &input, Some(gqr_id)).await?;

    let inspection_date = input.inspection_date.unwrap_or(existing.inspection_date);
    let mut entry: gqr_entry::ActiveModel = existing.into();
    entry.pre_gr_id = Set(input.pre_gr_id);
    entry.inspection_date = Set(inspection_date);
    entry.export_quality_kg = Set(input.export_quality_kg);
    entry.small_size_kg = Set(input.small_size_kg);
    entry.rotten_kg = Set(input.rotten_kg);
    entry.sprouted_kg = Set(input.sprouted_kg);
    entry.doubles_kg = Set(input.doubles_kg);
    entry.small_size_rate = Set(input.small_size_rate);
    entry.remarks = Set(validate::optional_text(input.remarks));
    entry.updated_at = Set(chrono::Utc::now());
    let updated = entry
        .update(&txn)
        .await
        .map_err(|e| Error::from(e).on_duplicate("The Pre-GR is already graded by another GQR"))?;
    txn.commit().await?;
    Ok(updated)
}

/// Settles a draft GQR on behalf of `caller_id`: stores the computed value and who
/// finalized it.
///
/// # Errors
/// Returns `Forbidden` unless the caller is a manager or admin, `Conflict` if the
/// report is already finalized and `Validation` when it is not linked to a Pre-GR and
/// purchase order, since no value can be computed.
pub async fn finalize_gqr(
    db: &DatabaseConnection,
    caller_id: i64,
    gqr_id: i64,
) -> Result<gqr_entry::Model> {
    let caller = auth::require_role(db, caller_id, SETTLEMENT_ROLES).await?;
    let resolved = gqr_resolver::resolve_gqr(db, gqr_id).await?;
    if resolved.gqr.status == GqrStatus::Finalized.as_str() {
        return Err(Error::Conflict {
            message: format!("{} is already finalized", resolved.gqr.gqr_number),
        });
    }
    if resolved.pre_gr.id.is_none() || resolved.purchase_order.id.is_none() {
        return Err(Error::validation(format!(
            "{} must be linked to a Pre-GR and purchase order before finalizing",
            resolved.gqr.gqr_number
        )));
    }

    let value = resolved.metrics.computed_value;
    let mut entry: gqr_entry::ActiveModel = resolved.gqr.into();
    let now = chrono::Utc::now();
    entry.status = Set(GqrStatus::Finalized.as_str().to_string());
    entry.value_after_gqr = Set(Some(value));
    entry.finalized_at = Set(Some(now));
    entry.finalized_by = Set(Some(caller.email));
    entry.updated_at = Set(now);
    let updated = entry.update(db).await?;

    tracing::info!(gqr_id, value, "Finalized GQR {}", updated.gqr_number);
    Ok(updated)
}

/// Marks a GQR as posted (or not) to Tally on behalf of `caller_id`. Clearing the flag
/// clears the timestamp too.
///
/// # Errors
/// Returns `Forbidden` unless the caller is a manager or admin.
pub async fn set_tally_posted(
    db: &DatabaseConnection,
    caller_id: i64,
    gqr_id: i64,
    posted: bool,
    voucher_number: Option<String>,
) -> Result<gqr_entry::Model> {
    auth::require_role(db, caller_id, SETTLEMENT_ROLES).await?;
    write_tally_flag(db, gqr_id, posted, voucher_number).await
}

async fn write_tally_flag(
    db: &DatabaseConnection,
    gqr_id: i64,
    posted: bool,
    voucher_number: Option<String>,
) -> Result<gqr_entry::Model> {
    let existing = get_gqr_by_id(db, gqr_id)
        .await?
        .ok_or_else(|| Error::not_found("GQR", gqr_id))?;

    let mut entry: gqr_entry::ActiveModel = existing.into();
    let now = chrono::Utc::now();
    entry.tally_posted = Set(posted);
    if posted {
        entry.tally_posted_at = Set(Some(now));
        if let Some(number) = validate::optional_text(voucher_number) {
            entry.tally_voucher_number = Set(Some(number));
        }
    } else {
        entry.tally_posted_at = Set(None);
        entry.tally_voucher_number = Set(None);
    }
    entry.updated_at = Set(now);
    entry.update(db).await.map_err(Into::into)
}

/// Builds the settlement voucher for a resolved, finalized GQR.
///
/// Payments carry the settled value; debit notes carry the rejected weight at the
/// order rate.
pub fn settlement_voucher(
    resolved: &ResolvedGqr,
    kind: VoucherKind,
    ledgers: &PostingLedgers,
) -> Result<Voucher> {
    let (amount, counter_ledger) = match kind {
        VoucherKind::Payment => (
            resolved
                .gqr
                .value_after_gqr
                .unwrap_or(resolved.metrics.computed_value),
            ledgers.payment_ledger.clone(),
        ),
        VoucherKind::DebitNote => (
            resolved.metrics.rejected_value,
            ledgers.purchase_ledger.clone(),
        ),
    };
    if amount <= 0.0 {
        return Err(Error::validation(format!(
            "{} has nothing to post as {}",
            resolved.gqr.gqr_number,
            kind.tally_name()
        )));
    }

    Ok(Voucher {
        kind,
        date: resolved.gqr.inspection_date,
        number: resolved.gqr.gqr_number.clone(),
        party_ledger: resolved.supplier.ledger_name.clone(),
        counter_ledger,
        amount,
        narration: format!(
            "{} against {} / {}: {:.0} kg export quality, {:.0} kg rejected",
            resolved.gqr.gqr_number,
            resolved.purchase_order.po_number,
            resolved.pre_gr.pre_gr_number,
            resolved.gqr.export_quality_kg,
            resolved.metrics.rejected_kg
        ),
    })
}

/// Sets `tally_posted` only if it is still clear. Returns whether this call won.
async fn claim_for_posting(db: &DatabaseConnection, gqr_id: i64) -> Result<bool> {
    let result = GqrEntry::update_many()
        .col_expr(gqr_entry::Column::TallyPosted, Expr::value(true))
        .filter(gqr_entry::Column::Id.eq(gqr_id))
        .filter(gqr_entry::Column::Status.eq(GqrStatus::Finalized.as_str()))
        .filter(gqr_entry::Column::TallyPosted.eq(false))
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

async fn release_claim(db: &DatabaseConnection, gqr_id: i64) -> Result<()> {
    GqrEntry::update_many()
        .col_expr(gqr_entry::Column::TallyPosted, Expr::value(false))
        .filter(gqr_entry::Column::Id.eq(gqr_id))
        .filter(gqr_entry::Column::TallyPostedAt.is_null())
        .exec(db)
        .await?;
    Ok(())
}

/// Posts a finalized GQR to Tally on behalf of `caller_id` and marks it posted on
/// success.
///
/// The report is claimed before Tally is contacted, so concurrent requests import the
/// voucher once. A failed import releases the claim.
///
/// # Errors
/// Returns `Forbidden` unless the caller is a manager or admin, `Conflict` when the
/// report is still a draft or was already posted, and passes through Tally failures
/// leaving the report unposted.
pub async fn post_gqr_to_tally<T: TallyGateway + ?Sized>(
    db: &DatabaseConnection,
    tally: &T,
    ledgers: &PostingLedgers,
    caller_id: i64,
    gqr_id: i64,
    kind: VoucherKind,
) -> Result<gqr_entry::Model> {
    auth::require_role(db, caller_id, SETTLEMENT_ROLES).await?;
    let resolved = gqr_resolver::resolve_gqr(db, gqr_id).await?;
    if resolved.gqr.status != GqrStatus::Finalized.as_str() {
        return Err(Error::Conflict {
            message: format!("{} must be finalized before posting", resolved.gqr.gqr_number),
        });
    }
    if resolved.gqr.tally_posted {
        return Err(Error::Conflict {
            message: format!("{} is already posted to Tally", resolved.gqr.gqr_number),
        });
    }
    if resolved.supplier.id.is_none() {
        return Err(Error::validation(format!(
            "{} has no supplier to post against",
            resolved.gqr.gqr_number
        )));
    }

    let voucher = settlement_voucher(&resolved, kind, ledgers)?;
    if !claim_for_posting(db, gqr_id).await? {
        return Err(Error::Conflict {
            message: format!("{} is already being posted to Tally", resolved.gqr.gqr_number),
        });
    }

    let request = envelope::voucher_import_request(ledgers.company.as_deref(), &[voucher.clone()]);
    let result = match tally.import_vouchers(request).await {
        Ok(result) => result,
        Err(err) => {
            release_claim(db, gqr_id).await?;
            return Err(err);
        }
    };
    tracing::info!(
        gqr_id,
        created = result.created,
        altered = result.altered,
        "Posted {} voucher {} to Tally",
        kind.tally_name(),
        voucher.number
    );

    write_tally_flag(db, gqr_id, true, Some(voucher.number)).await
}
