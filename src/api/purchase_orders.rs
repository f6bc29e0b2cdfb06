//! Purchase order and Pre-GR endpoints.

use super::{AppState, json_body};
use crate::{
    core::{
        auth::AuthUser,
        pre_gr::{self, PreGrInput},
        purchase_order::{self, PoProgress, PoStatus, PurchaseOrderFilter, PurchaseOrderInput},
    },
    entities::{pre_gr_entry, purchase_order as po_entity},
    errors::{Error, Result},
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;

type Body<T> = std::result::Result<Json<T>, JsonRejection>;

/// Body of a status change.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: PoStatus,
}

/// Query string for the Pre-GR list.
#[derive(Debug, Default, Deserialize)]
pub struct PreGrQuery {
    #[serde(default)]
    pub po_id: Option<i64>,
}

/// `GET /api/purchase-orders[?status=&supplier_id=]`
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<PurchaseOrderFilter>,
) -> Result<Json<Vec<po_entity::Model>>> {
    Ok(Json(purchase_order::list_purchase_orders(&state.db, &filter).await?))
}

/// `GET /api/purchase-orders/:id` - the order with its delivery progress.
pub async fn get(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<PoProgress>> {
    Ok(Json(purchase_order::get_purchase_order_progress(&state.db, id).await?))
}

/// `POST /api/purchase-orders`
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Body<PurchaseOrderInput>,
) -> Result<(StatusCode, Json<po_entity::Model>)> {
    let input = json_body(payload)?;
    let created = purchase_order::create_purchase_order(&state.db, input, &user.email).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /api/purchase-orders/:id`
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Body<PurchaseOrderInput>,
) -> Result<Json<po_entity::Model>> {
    let input = json_body(payload)?;
    Ok(Json(purchase_order::update_purchase_order(&state.db, id, input).await?))
}

/// `POST /api/purchase-orders/:id/status`
pub async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Body<StatusRequest>,
) -> Result<Json<po_entity::Model>> {
    let form = json_body(payload)?;
    Ok(Json(
        purchase_order::set_purchase_order_status(&state.db, id, form.status).await?,
    ))
}

/// `GET /api/pre-gr[?po_id=]`
pub async fn list_pre_gr(
    State(state): State<AppState>,
    Query(query): Query<PreGrQuery>,
) -> Result<Json<Vec<pre_gr_entry::Model>>> {
    Ok(Json(pre_gr::list_pre_gr_entries(&state.db, query.po_id).await?))
}

/// `GET /api/pre-gr/:id`
pub async fn get_pre_gr(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<pre_gr_entry::Model>> {
    pre_gr::get_pre_gr_by_id(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("Pre-GR", id))
}

/// `POST /api/pre-gr`
pub async fn create_pre_gr(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Body<PreGrInput>,
) -> Result<(StatusCode, Json<pre_gr_entry::Model>)> {
    let input = json_body(payload)?;
    let created = pre_gr::create_pre_gr(&state.db, input, &user.email).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
