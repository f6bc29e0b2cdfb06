//! Periodic housekeeping triggered by the cron endpoint.

use crate::{
    core::{auth, gqr::GqrStatus, numbering},
    entities::{GqrEntry, gqr_entry},
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::{PaginatorTrait, prelude::*};
use serde::Serialize;

/// `system_state` key holding the time of the last run.
pub const LAST_RUN_KEY: &str = "maintenance:last_run";

/// Outcome of one maintenance run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaintenanceReport {
    pub ran_at: DateTime<Utc>,
    pub purged_sessions: u64,
    /// Finalized GQRs still waiting to be posted to Tally
    pub pending_tally_postings: u64,
}

/// Purges expired sessions, counts unposted finalized GQRs and records the run.
pub async fn run_maintenance(db: &DatabaseConnection) -> Result<MaintenanceReport> {
    let purged_sessions = auth::purge_expired_sessions(db).await?;
    let pending_tally_postings = GqrEntry::find()
        .filter(gqr_entry::Column::Status.eq(GqrStatus::Finalized.as_str()))
        .filter(gqr_entry::Column::TallyPosted.eq(false))
        .count(db)
        .await?;

    let ran_at = Utc::now();
    numbering::set_state_value(db, LAST_RUN_KEY, ran_at.to_rfc3339()).await?;

    tracing::info!(
        purged_sessions,
        pending_tally_postings,
        "Maintenance run completed"
    );
    Ok(MaintenanceReport {
        ran_at,
        purged_sessions,
        pending_tally_postings,
    })
}
