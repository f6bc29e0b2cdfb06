//! GQR entity - Goods Quality Report reconciling graded weights against a Pre-GR.
//!
//! Each GQR records how a delivered lot split into export quality, small size and
//! rejected fractions. Once finalized it carries the settled value and can be posted
//! to Tally; `tally_posted` tracks whether that posting has happened.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// GQR database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "gqr_entries")]
pub struct Model {
    /// Unique identifier for the GQR
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Document number, e.g. `GQR/2024-25/0001`
    #[sea_orm(unique)]
    pub gqr_number: String,
    /// Pre-GR the report grades; `None` for reports keyed in before the Pre-GR.
    /// A Pre-GR is graded by at most one GQR.
    #[sea_orm(unique)]
    pub pre_gr_id: Option<i64>,
    /// Day the lot was graded
    pub inspection_date: Date,
    /// Weight accepted as export quality, in kilograms
    pub export_quality_kg: f64,
    /// Weight graded below export size, in kilograms
    pub small_size_kg: f64,
    /// Rotten weight, in kilograms
    pub rotten_kg: f64,
    /// Sprouted weight, in kilograms
    pub sprouted_kg: f64,
    /// Doubles (split bulbs), in kilograms
    pub doubles_kg: f64,
    /// Price per kilogram paid for small size, if any is paid at all
    pub small_size_rate: Option<f64>,
    /// `"draft"` or `"finalized"`
    pub status: String,
    /// Settled value, set when the report is finalized
    pub value_after_gqr: Option<f64>,
    /// When the report was finalized
    pub finalized_at: Option<DateTimeUtc>,
    /// E-mail of the user who finalized the report
    pub finalized_by: Option<String>,
    /// Whether the settlement has been posted to Tally
    pub tally_posted: bool,
    /// When the settlement was posted to Tally
    pub tally_posted_at: Option<DateTimeUtc>,
    /// Voucher number used in Tally
    pub tally_voucher_number: Option<String>,
    /// Free-form remarks
    pub remarks: Option<String>,
    /// When the report was created
    pub created_at: DateTimeUtc,
    /// When the report was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `GqrEntry` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each GQR grades one Pre-GR
    #[sea_orm(
        belongs_to = "super::pre_gr_entry::Entity",
        from = "Column::PreGrId",
        to = "super::pre_gr_entry::Column::Id"
    )]
    PreGrEntry,
}

impl Related<super::pre_gr_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PreGrEntry.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
