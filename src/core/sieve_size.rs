//! Sieve size operations - grading bands referenced by purchase orders.

use crate::{
    core::validate,
    entities::{SieveSize, sieve_size},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};

/// Retrieves all active sieve sizes ordered by their lower bound.
pub async fn get_active_sieve_sizes(db: &DatabaseConnection) -> Result<Vec<sieve_size::Model>> {
    SieveSize::find()
        .filter(sieve_size::Column::IsActive.eq(true))
        .order_by_asc(sieve_size::Column::MinMm)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a sieve size by its unique ID.
pub async fn get_sieve_size_by_id<C: ConnectionTrait>(
    db: &C,
    sieve_size_id: i64,
) -> Result<Option<sieve_size::Model>> {
    SieveSize::find_by_id(sieve_size_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a sieve size by label.
pub async fn get_sieve_size_by_label(
    db: &DatabaseConnection,
    label: &str,
) -> Result<Option<sieve_size::Model>> {
    SieveSize::find()
        .filter(sieve_size::Column::Label.eq(label.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

fn validate_band(label: &str, min_mm: f64, max_mm: Option<f64>) -> Result<String> {
    let label = validate::required_text("Sieve size label", label)?;
    validate::non_negative("Minimum diameter", min_mm)?;
    if let Some(max) = max_mm {
        validate::positive("Maximum diameter", max)?;
        if max <= min_mm {
            return Err(Error::validation(format!(
                "Maximum diameter {max} must be larger than minimum diameter {min_mm}"
            )));
        }
    }
    Ok(label)
}

/// Creates a sieve size band. `max_mm = None` means "and above".
pub async fn create_sieve_size(
    db: &DatabaseConnection,
    label: String,
    min_mm: f64,
    max_mm: Option<f64>,
) -> Result<sieve_size::Model> {
    let label = validate_band(&label, min_mm, max_mm)?;

    let sieve = sieve_size::ActiveModel {
        label: Set(label.clone()),
        min_mm: Set(min_mm),
        max_mm: Set(max_mm),
        is_active: Set(true),
        ..Default::default()
    };
    sieve
        .insert(db)
        .await
        .map_err(|e| Error::from(e).on_duplicate(format!("Sieve size '{label}' already exists")))
}

/// Updates a sieve size band.
pub async fn update_sieve_size(
    db: &DatabaseConnection,
    sieve_size_id: i64,
    label: String,
    min_mm: f64,
    max_mm: Option<f64>,
) -> Result<sieve_size::Model> {
    let label = validate_band(&label, min_mm, max_mm)?;

    let mut sieve: sieve_size::ActiveModel = SieveSize::find_by_id(sieve_size_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Sieve size", sieve_size_id))?
        .into();

    sieve.label = Set(label.clone());
    sieve.min_mm = Set(min_mm);
    sieve.max_mm = Set(max_mm);
    sieve
        .update(db)
        .await
        .map_err(|e| Error::from(e).on_duplicate(format!("Sieve size '{label}' already exists")))
}

/// Hides a sieve size from pick lists.
pub async fn deactivate_sieve_size(
    db: &DatabaseConnection,
    sieve_size_id: i64,
) -> Result<sieve_size::Model> {
    let mut sieve: sieve_size::ActiveModel = SieveSize::find_by_id(sieve_size_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Sieve size", sieve_size_id))?
        .into();

    sieve.is_active = Set(false);
    sieve.update(db).await.map_err(Into::into)
}
