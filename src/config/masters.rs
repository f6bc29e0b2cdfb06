//! Master data seeding from config.toml
//!
//! Units of measure and sieve size bands rarely change, so they are declared in
//! `config.toml` and inserted on startup when missing. Rows that already exist are
//! left alone, which keeps edits made through the API.

use crate::{
    core::{sieve_size, unit},
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Default)]
pub struct MastersConfig {
    /// Units of measure to seed
    #[serde(default)]
    pub units: Vec<UnitConfig>,
    /// Sieve size bands to seed
    #[serde(default)]
    pub sieve_sizes: Vec<SieveSizeConfig>,
}

/// Configuration for a single unit of measure
#[derive(Debug, Deserialize, Clone)]
pub struct UnitConfig {
    /// Display name
    pub name: String,
    /// Short form
    pub abbreviation: String,
    /// Kilograms per unit
    pub kg_factor: f64,
}

/// Configuration for a single sieve size band
#[derive(Debug, Deserialize, Clone)]
pub struct SieveSizeConfig {
    /// Label shown on purchase orders
    pub label: String,
    /// Smallest diameter in millimetres
    pub min_mm: f64,
    /// Largest diameter in millimetres
    #[serde(default)]
    pub max_mm: Option<f64>,
}

impl MastersConfig {
    /// Units every installation needs, used when no config file is present.
    #[must_use]
    pub fn builtin() -> Self {
        let unit = |name: &str, abbreviation: &str, kg_factor: f64| UnitConfig {
            name: name.to_string(),
            abbreviation: abbreviation.to_string(),
            kg_factor,
        };
        Self {
            units: vec![
                unit("Kilogram", "kg", 1.0),
                unit("Quintal", "qtl", 100.0),
                unit("Tonne", "t", 1000.0),
            ],
            sieve_sizes: Vec::new(),
        }
    }
}

/// Loads master data configuration from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<MastersConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads the seed file, falling back to the built-in units when it does not exist.
pub fn load_or_builtin<P: AsRef<Path>>(path: P) -> Result<MastersConfig> {
    if path.as_ref().exists() {
        load_config(path)
    } else {
        warn!(
            "Seed file {:?} not found, using built-in units",
            path.as_ref()
        );
        Ok(MastersConfig::builtin())
    }
}

/// Inserts every configured unit and sieve size that is not in the database yet.
///
/// Returns the number of rows inserted.
pub async fn seed_masters(db: &DatabaseConnection, config: &MastersConfig) -> Result<usize> {
    let mut inserted = 0;

    for entry in &config.units {
        if unit::get_unit_by_name(db, &entry.name).await?.is_none() {
            unit::create_unit(
                db,
                entry.name.clone(),
                entry.abbreviation.clone(),
                entry.kg_factor,
            )
            .await?;
            inserted += 1;
        }
    }

    for entry in &config.sieve_sizes {
        if sieve_size::get_sieve_size_by_label(db, &entry.label)
            .await?
            .is_none()
        {
            sieve_size::create_sieve_size(db, entry.label.clone(), entry.min_mm, entry.max_mm)
                .await?;
            inserted += 1;
        }
    }

    info!("Seeded {} master data rows", inserted);
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::setup_test_db;

    #[test]
    fn test_parse_masters_config() {
        let toml_str = r#"
            [[units]]
            name = "Bag"
            abbreviation = "bag"
            kg_factor = 50.0

            [[sieve_sizes]]
            label = "45-55mm"
            min_mm = 45.0
            max_mm = 55.0

            [[sieve_sizes]]
            label = "55mm+"
            min_mm = 55.0
        "#;

        let config: MastersConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.units.len(), 1);
        assert_eq!(config.units[0].kg_factor, 50.0);
        assert_eq!(config.sieve_sizes.len(), 2);
        assert_eq!(config.sieve_sizes[0].max_mm, Some(55.0));
        assert!(config.sieve_sizes[1].max_mm.is_none());
    }

    #[tokio::test]
    async fn test_seed_masters_skips_existing_rows() -> Result<()> {
        let db = setup_test_db().await?;
        let config = MastersConfig::builtin();

        assert_eq!(seed_masters(&db, &config).await?, 3);
        assert_eq!(seed_masters(&db, &config).await?, 0);
        assert_eq!(unit::get_all_units(&db).await?.len(), 3);
        Ok(())
    }

    #[test]
    fn test_load_or_builtin_without_file() -> Result<()> {
        let config = load_or_builtin("definitely/not/here.toml")?;
        assert_eq!(config.units.len(), 3);
        Ok(())
    }
}
