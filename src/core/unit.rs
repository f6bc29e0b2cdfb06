//! Unit of measure operations and weight conversions.
//!
//! Purchase orders are quoted in any unit (quintal is the usual one at the mandi),
//! while weighbridge and grading figures are always kilograms. The conversion helpers
//! here are the only place `kg_factor` is interpreted.

use crate::{
    core::validate,
    entities::{ItemMaster, PurchaseOrder, Unit, item_master, purchase_order, unit},
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, Set, prelude::*};

/// Converts a quantity expressed in `unit` to kilograms.
#[must_use]
pub fn to_kg(quantity: f64, unit: &unit::Model) -> f64 {
    quantity * unit.kg_factor
}

/// Converts kilograms to a quantity expressed in `unit`.
#[must_use]
pub fn from_kg(kilograms: f64, unit: &unit::Model) -> f64 {
    if unit.kg_factor == 0.0 {
        return 0.0;
    }
    kilograms / unit.kg_factor
}

/// Converts a quantity between two units.
#[must_use]
pub fn convert(quantity: f64, from: &unit::Model, to: &unit::Model) -> f64 {
    from_kg(to_kg(quantity, from), to)
}

/// Turns a price per `unit` into a price per kilogram.
#[must_use]
pub fn rate_per_kg(rate: f64, kg_factor: f64) -> f64 {
    if kg_factor == 0.0 {
        return 0.0;
    }
    rate / kg_factor
}

/// Formats a quantity with the unit abbreviation, e.g. `"12.50 qtl"`.
#[must_use]
pub fn format_quantity(quantity: f64, unit: &unit::Model) -> String {
    format!("{quantity:.2} {}", unit.abbreviation)
}

/// Retrieves all units ordered by name.
pub async fn get_all_units(db: &DatabaseConnection) -> Result<Vec<unit::Model>> {
    Unit::find()
        .order_by_asc(unit::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a unit by its unique ID.
pub async fn get_unit_by_id<C: ConnectionTrait>(db: &C, unit_id: i64) -> Result<Option<unit::Model>> {
    Unit::find_by_id(unit_id).one(db).await.map_err(Into::into)
}

/// Finds a unit by name.
pub async fn get_unit_by_name(db: &DatabaseConnection, name: &str) -> Result<Option<unit::Model>> {
    Unit::find()
        .filter(unit::Column::Name.eq(name.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

fn validate_unit(name: &str, abbreviation: &str, kg_factor: f64) -> Result<(String, String, f64)> {
    let name = validate::required_text("Unit name", name)?;
    let abbreviation = validate::required_text("Unit abbreviation", abbreviation)?;
    let kg_factor = validate::positive("Kilograms per unit", kg_factor)?;
    Ok((name, abbreviation, kg_factor))
}

/// Creates a new unit of measure.
///
/// # Errors
/// Returns `Validation` for a blank name or abbreviation or a non-positive factor, and
/// `Conflict` if a unit with the same name exists.
pub async fn create_unit(
    db: &DatabaseConnection,
    name: String,
    abbreviation: String,
    kg_factor: f64,
) -> Result<unit::Model> {
    let (name, abbreviation, kg_factor) = validate_unit(&name, &abbreviation, kg_factor)?;

    let unit = unit::ActiveModel {
        name: Set(name.clone()),
        abbreviation: Set(abbreviation),
        kg_factor: Set(kg_factor),
        ..Default::default()
    };
    unit.insert(db)
        .await
        .map_err(|e| Error::from(e).on_duplicate(format!("Unit '{name}' already exists")))
}

/// Updates a unit's name, abbreviation and factor.
pub async fn update_unit(
    db: &DatabaseConnection,
    unit_id: i64,
    name: String,
    abbreviation: String,
    kg_factor: f64,
) -> Result<unit::Model> {
    let (name, abbreviation, kg_factor) = validate_unit(&name, &abbreviation, kg_factor)?;

    let mut unit: unit::ActiveModel = Unit::find_by_id(unit_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Unit", unit_id))?
        .into();

    unit.name = Set(name.clone());
    unit.abbreviation = Set(abbreviation);
    unit.kg_factor = Set(kg_factor);
    unit.update(db)
        .await
        .map_err(|e| Error::from(e).on_duplicate(format!("Unit '{name}' already exists")))
}

/// Deletes a unit that no purchase order or item refers to.
///
/// # Errors
/// Returns `Conflict` while the unit is still in use.
pub async fn delete_unit(db: &DatabaseConnection, unit_id: i64) -> Result<()> {
    let unit = Unit::find_by_id(unit_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Unit", unit_id))?;

    let po_refs = PurchaseOrder::find()
        .filter(purchase_order::Column::UnitId.eq(unit_id))
        .count(db)
        .await?;
    let item_refs = ItemMaster::find()
        .filter(item_master::Column::DefaultUnitId.eq(unit_id))
        .count(db)
        .await?;
    if po_refs + item_refs > 0 {
        return Err(Error::Conflict {
            message: format!(
                "Unit '{}' is used by {po_refs} purchase orders and {item_refs} items",
                unit.name
            ),
        });
    }

    Unit::delete_by_id(unit_id).exec(db).await?;
    Ok(())
}
