//! Master data endpoints: suppliers, items, GAP items, sieve sizes and units.
//!
//! Deleting a supplier, item, GAP item or sieve size deactivates it; units are removed
//! outright once nothing references them.

use super::{AppState, json_body};
use crate::{
    core::{
        gap_item::{self, GapItemInput},
        item::{self, ItemInput},
        sieve_size,
        supplier::{self, SupplierInput},
        unit,
    },
    entities::{
        gap_item as gap_item_entity, item_master, sieve_size as sieve_entity,
        supplier as supplier_entity, unit as unit_entity,
    },
    errors::{Error, Result},
};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;

type Body<T> = std::result::Result<Json<T>, JsonRejection>;

// Suppliers

pub async fn list_suppliers(
    State(state): State<AppState>,
) -> Result<Json<Vec<supplier_entity::Model>>> {
    Ok(Json(supplier::get_active_suppliers(&state.db).await?))
}

pub async fn get_supplier(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<supplier_entity::Model>> {
    supplier::get_supplier_by_id(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("Supplier", id))
}

pub async fn create_supplier(
    State(state): State<AppState>,
    payload: Body<SupplierInput>,
) -> Result<(StatusCode, Json<supplier_entity::Model>)> {
    let created = supplier::create_supplier(&state.db, json_body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_supplier(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Body<SupplierInput>,
) -> Result<Json<supplier_entity::Model>> {
    Ok(Json(supplier::update_supplier(&state.db, id, json_body(payload)?).await?))
}

pub async fn delete_supplier(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<supplier_entity::Model>> {
    Ok(Json(supplier::deactivate_supplier(&state.db, id).await?))
}

// Items

pub async fn list_items(State(state): State<AppState>) -> Result<Json<Vec<item_master::Model>>> {
    Ok(Json(item::get_active_items(&state.db).await?))
}

pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<item_master::Model>> {
    item::get_item_by_id(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("Item", id))
}

pub async fn create_item(
    State(state): State<AppState>,
    payload: Body<ItemInput>,
) -> Result<(StatusCode, Json<item_master::Model>)> {
    let created = item::create_item(&state.db, json_body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Body<ItemInput>,
) -> Result<Json<item_master::Model>> {
    Ok(Json(item::update_item(&state.db, id, json_body(payload)?).await?))
}

pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<item_master::Model>> {
    Ok(Json(item::deactivate_item(&state.db, id).await?))
}

// GAP items

/// Query string for the GAP item list.
#[derive(Debug, Default, Deserialize)]
pub struct GapItemQuery {
    #[serde(default)]
    pub item_id: Option<i64>,
}

pub async fn list_gap_items(
    State(state): State<AppState>,
    Query(query): Query<GapItemQuery>,
) -> Result<Json<Vec<gap_item_entity::Model>>> {
    Ok(Json(gap_item::get_active_gap_items(&state.db, query.item_id).await?))
}

pub async fn get_gap_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<gap_item_entity::Model>> {
    gap_item::get_gap_item_by_id(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("GAP item", id))
}

pub async fn create_gap_item(
    State(state): State<AppState>,
    payload: Body<GapItemInput>,
) -> Result<(StatusCode, Json<gap_item_entity::Model>)> {
    let created = gap_item::create_gap_item(&state.db, json_body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_gap_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Body<GapItemInput>,
) -> Result<Json<gap_item_entity::Model>> {
    Ok(Json(gap_item::update_gap_item(&state.db, id, json_body(payload)?).await?))
}

pub async fn delete_gap_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<gap_item_entity::Model>> {
    Ok(Json(gap_item::deactivate_gap_item(&state.db, id).await?))
}

// Sieve sizes

/// Sieve size fields.
#[derive(Debug, Deserialize)]
pub struct SieveSizeRequest {
    pub label: String,
    pub min_mm: f64,
    #[serde(default)]
    pub max_mm: Option<f64>,
}

pub async fn list_sieve_sizes(
    State(state): State<AppState>,
) -> Result<Json<Vec<sieve_entity::Model>>> {
    Ok(Json(sieve_size::get_active_sieve_sizes(&state.db).await?))
}

pub async fn get_sieve_size(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<sieve_entity::Model>> {
    sieve_size::get_sieve_size_by_id(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("Sieve size", id))
}

pub async fn create_sieve_size(
    State(state): State<AppState>,
    payload: Body<SieveSizeRequest>,
) -> Result<(StatusCode, Json<sieve_entity::Model>)> {
    let form = json_body(payload)?;
    let created =
        sieve_size::create_sieve_size(&state.db, form.label, form.min_mm, form.max_mm).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_sieve_size(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Body<SieveSizeRequest>,
) -> Result<Json<sieve_entity::Model>> {
    let form = json_body(payload)?;
    Ok(Json(
        sieve_size::update_sieve_size(&state.db, id, form.label, form.min_mm, form.max_mm).await?,
    ))
}

pub async fn delete_sieve_size(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<sieve_entity::Model>> {
    Ok(Json(sieve_size::deactivate_sieve_size(&state.db, id).await?))
}

// Units

/// Unit fields.
#[derive(Debug, Deserialize)]
pub struct UnitRequest {
    pub name: String,
    pub abbreviation: String,
    pub kg_factor: f64,
}

pub async fn list_units(State(state): State<AppState>) -> Result<Json<Vec<unit_entity::Model>>> {
    Ok(Json(unit::get_all_units(&state.db).await?))
}

pub async fn get_unit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<unit_entity::Model>> {
    unit::get_unit_by_id(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("Unit", id))
}

pub async fn create_unit(
    State(state): State<AppState>,
    payload: Body<UnitRequest>,
) -> Result<(StatusCode, Json<unit_entity::Model>)> {
    let form = json_body(payload)?;
    let created = unit::create_unit(&state.db, form.name, form.abbreviation, form.kg_factor).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_unit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Body<UnitRequest>,
) -> Result<Json<unit_entity::Model>> {
    let form = json_body(payload)?;
    Ok(Json(
        unit::update_unit(&state.db, id, form.name, form.abbreviation, form.kg_factor).await?,
    ))
}

pub async fn delete_unit(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    unit::delete_unit(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
