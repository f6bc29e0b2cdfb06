//! GAP item operations - certificates attached to item master rows.

use crate::{
    core::{item, validate},
    entities::{GapItem, gap_item},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Deserialize;

/// Editable GAP item fields.
#[derive(Debug, Clone, Deserialize)]
pub struct GapItemInput {
    pub item_id: i64,
    pub name: String,
    #[serde(default)]
    pub certification_number: Option<String>,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
}

/// Retrieves active GAP items, optionally restricted to one item.
pub async fn get_active_gap_items(
    db: &DatabaseConnection,
    item_id: Option<i64>,
) -> Result<Vec<gap_item::Model>> {
    let mut query = GapItem::find().filter(gap_item::Column::IsActive.eq(true));
    if let Some(item_id) = item_id {
        query = query.filter(gap_item::Column::ItemId.eq(item_id));
    }
    query
        .order_by_asc(gap_item::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a GAP item by its unique ID.
pub async fn get_gap_item_by_id(
    db: &DatabaseConnection,
    gap_item_id: i64,
) -> Result<Option<gap_item::Model>> {
    GapItem::find_by_id(gap_item_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Whether the certificate is still valid on `on`. Certificates without an expiry never lapse.
#[must_use]
pub fn is_certificate_valid(gap_item: &gap_item::Model, on: NaiveDate) -> bool {
    gap_item.valid_until.is_none_or(|until| on <= until)
}

async fn apply_input(
    db: &DatabaseConnection,
    model: &mut gap_item::ActiveModel,
    input: GapItemInput,
) -> Result<()> {
    let name = validate::required_text("GAP item name", &input.name)?;
    item::get_item_by_id(db, input.item_id)
        .await?
        .filter(|i| i.is_active)
        .ok_or_else(|| Error::not_found("Item", input.item_id))?;

    model.item_id = Set(input.item_id);
    model.name = Set(name);
    model.certification_number = Set(validate::optional_text(input.certification_number));
    model.valid_until = Set(input.valid_until);
    Ok(())
}

/// Creates a GAP item for an active item.
pub async fn create_gap_item(
    db: &DatabaseConnection,
    input: GapItemInput,
) -> Result<gap_item::Model> {
    let now = chrono::Utc::now();
    let mut gap = gap_item::ActiveModel {
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    apply_input(db, &mut gap, input).await?;
    gap.insert(db).await.map_err(Into::into)
}

/// Replaces a GAP item's editable fields.
pub async fn update_gap_item(
    db: &DatabaseConnection,
    gap_item_id: i64,
    input: GapItemInput,
) -> Result<gap_item::Model> {
    let mut gap: gap_item::ActiveModel = GapItem::find_by_id(gap_item_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("GAP item", gap_item_id))?
        .into();

    apply_input(db, &mut gap, input).await?;
    gap.updated_at = Set(chrono::Utc::now());
    gap.update(db).await.map_err(Into::into)
}

/// Soft deletes a GAP item.
pub async fn deactivate_gap_item(
    db: &DatabaseConnection,
    gap_item_id: i64,
) -> Result<gap_item::Model> {
    let mut gap: gap_item::ActiveModel = GapItem::find_by_id(gap_item_id)
        .one(db)
        .await?
        .filter(|g| g.is_active)
        .ok_or_else(|| Error::not_found("GAP item", gap_item_id))?
        .into();

    gap.is_active = Set(false);
    gap.updated_at = Set(chrono::Utc::now());
    gap.update(db).await.map_err(Into::into)
}
