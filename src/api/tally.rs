//! Tally passthrough endpoints.

use super::AppState;
use crate::{
    errors::Result,
    tally::{TallyCompany, TallyStatus},
};
use axum::{Json, extract::State};

/// `GET /api/tally/status`
pub async fn status(State(state): State<AppState>) -> Json<TallyStatus> {
    Json(state.tally.status().await)
}

/// `GET /api/tally/companies`
pub async fn companies(State(state): State<AppState>) -> Result<Json<Vec<TallyCompany>>> {
    Ok(Json(state.tally.companies().await?))
}
