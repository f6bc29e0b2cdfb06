//! Document numbering - `PO/2024-25/0001` style numbers per Indian financial year.
//!
//! Sequences are kept in the `system_state` table under one key per prefix and
//! financial year, so numbering restarts at 1 every April. Callers pass an open
//! database transaction so the bump and the insert that uses it commit together.

use crate::{
    entities::{SystemState, system_state},
    errors::{Error, Result},
};
use chrono::{Datelike, NaiveDate};
use sea_orm::{Set, prelude::*};

/// Document kinds that get a generated number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Purchase order
    PurchaseOrder,
    /// Pre-GR weighbridge entry
    PreGr,
    /// Goods quality report
    Gqr,
}

impl DocumentKind {
    /// Prefix printed before the financial year.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::PurchaseOrder => "PO",
            Self::PreGr => "PGR",
            Self::Gqr => "GQR",
        }
    }
}

/// Indian financial year (April to March) containing `date`, e.g. `"2024-25"`.
#[must_use]
pub fn financial_year(date: NaiveDate) -> String {
    let start = if date.month() >= 4 {
        date.year()
    } else {
        date.year() - 1
    };
    format!("{start}-{:02}", (start + 1) % 100)
}

/// Formats a document number from its parts.
#[must_use]
pub fn format_number(kind: DocumentKind, date: NaiveDate, sequence: u32) -> String {
    format!("{}/{}/{sequence:04}", kind.prefix(), financial_year(date))
}

fn sequence_key(kind: DocumentKind, date: NaiveDate) -> String {
    format!("seq:{}:{}", kind.prefix(), financial_year(date))
}

/// Reserves the next number for `kind` in the financial year of `date`.
///
/// Run this inside the same database transaction as the insert that uses the number.
pub async fn next_number<C>(db: &C, kind: DocumentKind, date: NaiveDate) -> Result<String>
where
    C: ConnectionTrait,
{
    let key = sequence_key(kind, date);
    let existing = SystemState::find()
        .filter(system_state::Column::Key.eq(key.as_str()))
        .one(db)
        .await?;

    let now = chrono::Utc::now();
    let next = match existing {
        Some(state) => {
            let current: u32 = state.value.parse().map_err(|e| Error::Config {
                message: format!("Corrupt sequence value '{}' for {key}: {e}", state.value),
            })?;
            let next = current + 1;
            let mut active: system_state::ActiveModel = state.into();
            active.value = Set(next.to_string());
            active.updated_at = Set(now);
            active.update(db).await?;
            next
        }
        None => {
            system_state::ActiveModel {
                key: Set(key),
                value: Set("1".to_string()),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await?;
            1
        }
    };

    Ok(format_number(kind, date, next))
}

/// Reads a free-form value from the `system_state` table.
pub async fn get_state_value(db: &DatabaseConnection, key: &str) -> Result<Option<String>> {
    Ok(SystemState::find()
        .filter(system_state::Column::Key.eq(key))
        .one(db)
        .await?
        .map(|s| s.value))
}

/// Inserts or replaces a free-form value in the `system_state` table.
pub async fn set_state_value<C>(db: &C, key: &str, value: String) -> Result<()>
where
    C: ConnectionTrait,
{
    let now = chrono::Utc::now();
    let existing = SystemState::find()
        .filter(system_state::Column::Key.eq(key))
        .one(db)
        .await?;

    match existing {
        Some(state) => {
            let mut active: system_state::ActiveModel = state.into();
            active.value = Set(value);
            active.updated_at = Set(now);
            active.update(db).await?;
        }
        None => {
            system_state::ActiveModel {
                key: Set(key.to_string()),
                value: Set(value),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::setup_test_db;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_financial_year_boundaries() {
        assert_eq!(financial_year(date(2024, 4, 1)), "2024-25");
        assert_eq!(financial_year(date(2025, 3, 31)), "2024-25");
        assert_eq!(financial_year(date(2025, 4, 1)), "2025-26");
        assert_eq!(financial_year(date(2099, 12, 1)), "2099-00");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(
            format_number(DocumentKind::Gqr, date(2024, 11, 5), 7),
            "GQR/2024-25/0007"
        );
    }

    #[tokio::test]
    async fn test_sequences_are_per_kind_and_year() -> Result<()> {
        let db = setup_test_db().await?;
        let nov = date(2024, 11, 5);

        assert_eq!(next_number(&db, DocumentKind::PurchaseOrder, nov).await?, "PO/2024-25/0001");
        assert_eq!(next_number(&db, DocumentKind::PurchaseOrder, nov).await?, "PO/2024-25/0002");
        assert_eq!(next_number(&db, DocumentKind::PreGr, nov).await?, "PGR/2024-25/0001");
        assert_eq!(
            next_number(&db, DocumentKind::PurchaseOrder, date(2025, 4, 2)).await?,
            "PO/2025-26/0001"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_state_values_round_trip() -> Result<()> {
        let db = setup_test_db().await?;
        assert!(get_state_value(&db, "last_maintenance").await?.is_none());

        set_state_value(&db, "last_maintenance", "a".to_string()).await?;
        set_state_value(&db, "last_maintenance", "b".to_string()).await?;
        assert_eq!(get_state_value(&db, "last_maintenance").await?.as_deref(), Some("b"));
        Ok(())
    }
}
