//! Item master operations.

use crate::{
    core::{unit, validate},
    entities::{ItemMaster, item_master},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Deserialize;

/// Editable item fields, used for both create and update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemInput {
    pub name: String,
    #[serde(default)]
    pub hsn_code: Option<String>,
    #[serde(default)]
    pub default_unit_id: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Retrieves all active items ordered alphabetically by name.
pub async fn get_active_items(db: &DatabaseConnection) -> Result<Vec<item_master::Model>> {
    ItemMaster::find()
        .filter(item_master::Column::IsActive.eq(true))
        .order_by_asc(item_master::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds an item by its unique ID, including inactive ones.
pub async fn get_item_by_id<C: ConnectionTrait>(
    db: &C,
    item_id: i64,
) -> Result<Option<item_master::Model>> {
    ItemMaster::find_by_id(item_id)
        .one(db)
        .await
        .map_err(Into::into)
}

async fn apply_input(
    db: &DatabaseConnection,
    model: &mut item_master::ActiveModel,
    input: ItemInput,
) -> Result<String> {
    let name = validate::required_text("Item name", &input.name)?;
    let hsn_code = validate::optional_text(input.hsn_code);
    if let Some(hsn) = &hsn_code {
        if !hsn.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::validation(format!("HSN code must be numeric, got '{hsn}'")));
        }
    }
    if let Some(unit_id) = input.default_unit_id {
        if unit::get_unit_by_id(db, unit_id).await?.is_none() {
            return Err(Error::not_found("Unit", unit_id));
        }
    }

    model.name = Set(name.clone());
    model.hsn_code = Set(hsn_code);
    model.default_unit_id = Set(input.default_unit_id);
    model.description = Set(validate::optional_text(input.description));
    Ok(name)
}

/// Creates a new item.
///
/// # Errors
/// Returns `Validation` for a blank name or non-numeric HSN code, `NotFound` for an
/// unknown default unit and `Conflict` for a duplicate name.
pub async fn create_item(db: &DatabaseConnection, input: ItemInput) -> Result<item_master::Model> {
    let now = chrono::Utc::now();
    let mut item = item_master::ActiveModel {
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let name = apply_input(db, &mut item, input).await?;

    item.insert(db)
        .await
        .map_err(|e| Error::from(e).on_duplicate(format!("Item '{name}' already exists")))
}

/// Replaces an item's editable fields.
pub async fn update_item(
    db: &DatabaseConnection,
    item_id: i64,
    input: ItemInput,
) -> Result<item_master::Model> {
    let mut item: item_master::ActiveModel = ItemMaster::find_by_id(item_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Item", item_id))?
        .into();

    let name = apply_input(db, &mut item, input).await?;
    item.updated_at = Set(chrono::Utc::now());

    item.update(db)
        .await
        .map_err(|e| Error::from(e).on_duplicate(format!("Item '{name}' already exists")))
}

/// Soft deletes an item.
pub async fn deactivate_item(db: &DatabaseConnection, item_id: i64) -> Result<item_master::Model> {
    let mut item: item_master::ActiveModel = ItemMaster::find_by_id(item_id)
        .one(db)
        .await?
        .filter(|i| i.is_active)
        .ok_or_else(|| Error::not_found("Item", item_id))?
        .into();

    item.is_active = Set(false);
    item.updated_at = Set(chrono::Utc::now());
    item.update(db).await.map_err(Into::into)
}
