//! Scheduled maintenance trigger.

use super::{AppState, middleware::bearer_token};
use crate::{
    core::{
        auth,
        maintenance::{self, MaintenanceReport},
    },
    errors::{Error, Result},
};
use axum::{Json, extract::State, http::HeaderMap};

/// `POST /api/cron/maintenance` - requires `Authorization: Bearer <CRON_SECRET>`.
///
/// Every request is rejected while `CRON_SECRET` is unset.
pub async fn maintenance(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MaintenanceReport>> {
    let authorized = matches!(
        (state.config.cron_secret.as_deref(), bearer_token(&headers)),
        (Some(expected), Some(given)) if auth::secrets_match(given, expected)
    );
    if !authorized {
        tracing::warn!("Rejected cron request without a valid secret");
        return Err(Error::Unauthorized);
    }
    Ok(Json(maintenance::run_maintenance(&state.db).await?))
}
