//! GQR endpoints, including the cross-origin export used by external dashboards.

use super::{
    AppState, json_body,
    middleware::{bearer_token, session_token},
};
use crate::{
    core::{
        auth::{self, AuthUser},
        gqr::{self, GqrInput},
        gqr_resolver::{self, GqrFilter, ResolvedGqr},
    },
    entities::gqr_entry,
    errors::{Error, Result},
    tally::VoucherKind,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
};
use serde::Deserialize;
use serde_json::{Value, json};

type Body<T> = std::result::Result<Json<T>, JsonRejection>;

/// Body of `PATCH /api/gqr/:id/tally-posted`.
#[derive(Debug, Deserialize)]
pub struct TallyPostedRequest {
    pub posted: bool,
    #[serde(default)]
    pub voucher_number: Option<String>,
}

/// Body of `POST /api/gqr/:id/post-to-tally`.
#[derive(Debug, Deserialize)]
pub struct PostToTallyRequest {
    pub kind: VoucherKind,
}

/// Query string of the export.
#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
}

/// `GET /api/gqr[?status=&tally_posted=&supplier_id=]`
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<GqrFilter>,
) -> Result<Json<Vec<ResolvedGqr>>> {
    Ok(Json(gqr_resolver::resolve_gqrs(&state.db, &filter).await?))
}

/// `GET /api/gqr/:id`
pub async fn get(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<ResolvedGqr>> {
    Ok(Json(gqr_resolver::resolve_gqr(&state.db, id).await?))
}

/// `POST /api/gqr`
pub async fn create(
    State(state): State<AppState>,
    payload: Body<GqrInput>,
) -> Result<(StatusCode, Json<gqr_entry::Model>)> {
    let created = gqr::create_gqr(&state.db, json_body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /api/gqr/:id`
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Body<GqrInput>,
) -> Result<Json<gqr_entry::Model>> {
    Ok(Json(gqr::update_gqr(&state.db, id, json_body(payload)?).await?))
}

/// `POST /api/gqr/:id/finalize`
pub async fn finalize(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<gqr_entry::Model>> {
    Ok(Json(gqr::finalize_gqr(&state.db, user.id, id).await?))
}

/// `PATCH /api/gqr/:id/tally-posted`
pub async fn set_tally_posted(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    payload: Body<TallyPostedRequest>,
) -> Result<Json<gqr_entry::Model>> {
    let form = json_body(payload)?;
    Ok(Json(
        gqr::set_tally_posted(&state.db, user.id, id, form.posted, form.voucher_number).await?,
    ))
}

/// `POST /api/gqr/:id/post-to-tally`
pub async fn post_to_tally(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    payload: Body<PostToTallyRequest>,
) -> Result<Json<gqr_entry::Model>> {
    let form = json_body(payload)?;
    let ledgers = state.config.posting_ledgers();
    let posted = gqr::post_gqr_to_tally(
        &state.db,
        state.tally.as_ref(),
        &ledgers,
        user.id,
        id,
        form.kind,
    )
    .await?;
    Ok(Json(posted))
}

async fn authorize_export(state: &AppState, headers: &HeaderMap) -> Result<()> {
    let service_key_ok = matches!(
        (state.config.service_key.as_deref(), bearer_token(headers)),
        (Some(expected), Some(given)) if auth::secrets_match(given, expected)
    );
    if service_key_ok {
        return Ok(());
    }
    match session_token(headers) {
        Some(token) => auth::authenticate(&state.db, &token).await.map(|_| ()),
        None => Err(Error::Unauthorized),
    }
}

/// `GET /api/gqr-data[?id=&status=]` - resolved GQRs for external consumers.
///
/// Accepts a session cookie or the service key as a bearer token. `status` also
/// applies to a single `id`, which then yields an empty list when it does not match.
pub async fn export(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ExportQuery>,
) -> Result<Json<Value>> {
    authorize_export(&state, &headers).await?;

    let data = match query.id {
        Some(id) => {
            let resolved = gqr_resolver::resolve_gqr(&state.db, id).await?;
            let wanted = query.status.as_deref().is_none_or(|s| s == resolved.gqr.status);
            if wanted { vec![resolved] } else { Vec::new() }
        }
        None => {
            let filter = GqrFilter {
                status: query.status,
                ..Default::default()
            };
            gqr_resolver::resolve_gqrs(&state.db, &filter).await?
        }
    };
    tracing::debug!(count = data.len(), "Exported resolved GQRs");
    Ok(Json(json!({ "data": data, "count": data.len() })))
}
