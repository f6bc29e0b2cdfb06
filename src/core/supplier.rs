//! Supplier business logic - Handles all supplier master data operations.
//!
//! Suppliers are referenced by purchase orders, so removal is a soft deactivation.
//! Names are unique and trimmed; optional contact and bank fields are stored only when
//! they carry text.

use crate::{
    core::validate,
    entities::{Supplier, supplier},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Deserialize;

/// Editable supplier fields, used for both create and update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SupplierInput {
    /// Trading name
    pub name: String,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub gst_number: Option<String>,
    #[serde(default)]
    pub pan_number: Option<String>,
    #[serde(default)]
    pub bank_account: Option<String>,
    #[serde(default)]
    pub ifsc_code: Option<String>,
    #[serde(default)]
    pub tally_ledger_name: Option<String>,
}

/// Retrieves all active suppliers ordered alphabetically by name.
pub async fn get_active_suppliers(db: &DatabaseConnection) -> Result<Vec<supplier::Model>> {
    Supplier::find()
        .filter(supplier::Column::IsActive.eq(true))
        .order_by_asc(supplier::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a supplier by its unique ID, including inactive ones.
pub async fn get_supplier_by_id<C: ConnectionTrait>(
    db: &C,
    supplier_id: i64,
) -> Result<Option<supplier::Model>> {
    Supplier::find_by_id(supplier_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Looks up an active supplier by name, case-sensitively.
pub async fn get_supplier_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<supplier::Model>> {
    Supplier::find()
        .filter(supplier::Column::Name.eq(name.trim()))
        .filter(supplier::Column::IsActive.eq(true))
        .one(db)
        .await
        .map_err(Into::into)
}

fn apply_input(model: &mut supplier::ActiveModel, input: SupplierInput) -> Result<String> {
    let name = validate::required_text("Supplier name", &input.name)?;
    let gst_number = validate::optional_text(input.gst_number).map(|g| g.to_uppercase());
    if let Some(gst) = &gst_number {
        if gst.len() != 15 {
            return Err(Error::validation(format!(
                "GST number must be 15 characters, got {}",
                gst.len()
            )));
        }
    }

    model.name = Set(name.clone());
    model.contact_person = Set(validate::optional_text(input.contact_person));
    model.phone = Set(validate::optional_text(input.phone));
    model.email = Set(validate::optional_text(input.email));
    model.address = Set(validate::optional_text(input.address));
    model.gst_number = Set(gst_number);
    model.pan_number = Set(validate::optional_text(input.pan_number).map(|p| p.to_uppercase()));
    model.bank_account = Set(validate::optional_text(input.bank_account));
    model.ifsc_code = Set(validate::optional_text(input.ifsc_code).map(|i| i.to_uppercase()));
    model.tally_ledger_name = Set(validate::optional_text(input.tally_ledger_name));
    Ok(name)
}

/// Creates a new supplier.
///
/// # Errors
/// Returns `Validation` for a blank name or malformed GST number and `Conflict` when a
/// supplier with the same name already exists.
pub async fn create_supplier(
    db: &DatabaseConnection,
    input: SupplierInput,
) -> Result<supplier::Model> {
    let now = chrono::Utc::now();
    let mut supplier = supplier::ActiveModel {
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let name = apply_input(&mut supplier, input)?;

    let created = supplier
        .insert(db)
        .await
        .map_err(|e| Error::from(e).on_duplicate(format!("Supplier '{name}' already exists")))?;
    tracing::info!(supplier_id = created.id, "Created supplier {}", created.name);
    Ok(created)
}

/// Replaces a supplier's editable fields.
pub async fn update_supplier(
    db: &DatabaseConnection,
    supplier_id: i64,
    input: SupplierInput,
) -> Result<supplier::Model> {
    let mut supplier: supplier::ActiveModel = Supplier::find_by_id(supplier_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Supplier", supplier_id))?
        .into();

    let name = apply_input(&mut supplier, input)?;
    supplier.updated_at = Set(chrono::Utc::now());

    supplier
        .update(db)
        .await
        .map_err(|e| Error::from(e).on_duplicate(format!("Supplier '{name}' already exists")))
}

/// Soft deletes a supplier, keeping its purchase order history.
///
/// # Errors
/// Returns `NotFound` if the supplier does not exist or is already inactive.
pub async fn deactivate_supplier(
    db: &DatabaseConnection,
    supplier_id: i64,
) -> Result<supplier::Model> {
    let mut supplier: supplier::ActiveModel = Supplier::find_by_id(supplier_id)
        .one(db)
        .await?
        .filter(|s| s.is_active)
        .ok_or_else(|| Error::not_found("Supplier", supplier_id))?
        .into();

    supplier.is_active = Set(false);
    supplier.updated_at = Set(chrono::Utc::now());
    supplier.update(db).await.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_supplier_validation() -> Result<()> {
        let db = setup_test_db().await?;

        let result = create_supplier(&db, SupplierInput::default()).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = create_supplier(
            &db,
            SupplierInput {
                name: "Lasalgaon Traders".to_string(),
                gst_number: Some("27ABC".to_string()),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_supplier_normalises_fields() -> Result<()> {
        let db = setup_test_db().await?;

        let supplier = create_supplier(
            &db,
            SupplierInput {
                name: "  Lasalgaon Traders ".to_string(),
                gst_number: Some("27abcde1234f1z5".to_string()),
                phone: Some("   ".to_string()),
                ..Default::default()
            },
        )
        .await?;

        assert_eq!(supplier.name, "Lasalgaon Traders");
        assert_eq!(supplier.gst_number.as_deref(), Some("27ABCDE1234F1Z5"));
        assert!(supplier.phone.is_none());
        assert!(supplier.is_active);
        assert_eq!(supplier.ledger_name(), "Lasalgaon Traders");
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_supplier_conflicts() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_supplier(&db, "Pimpalgaon FPO").await?;

        let result = create_test_supplier(&db, "Pimpalgaon FPO").await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_supplier() -> Result<()> {
        let db = setup_test_db().await?;
        let supplier = create_test_supplier(&db, "Old Name").await?;

        let updated = update_supplier(
            &db,
            supplier.id,
            SupplierInput {
                name: "New Name".to_string(),
                tally_ledger_name: Some("New Name (Creditor)".to_string()),
                ..Default::default()
            },
        )
        .await?;

        assert_eq!(updated.name, "New Name");
        assert_eq!(updated.ledger_name(), "New Name (Creditor)");
        Ok(())
    }

    #[tokio::test]
    async fn test_deactivate_supplier_hides_it() -> Result<()> {
        let db = setup_test_db().await?;
        let kept = create_test_supplier(&db, "Kept").await?;
        let gone = create_test_supplier(&db, "Gone").await?;

        let deactivated = deactivate_supplier(&db, gone.id).await?;
        assert!(!deactivated.is_active);

        let active = get_active_suppliers(&db).await?;
        assert_eq!(active, vec![kept]);
        assert!(get_supplier_by_name(&db, "Gone").await?.is_none());

        let again = deactivate_supplier(&db, gone.id).await;
        assert!(matches!(again, Err(Error::NotFound { .. })));
        Ok(())
    }
}
