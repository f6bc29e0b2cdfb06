//! Service settings loaded from environment variables.
//!
//! Secrets (`SERVICE_KEY`, `CRON_SECRET`) are optional: the routes guarded by them
//! reject every request while the corresponding variable is unset.

use crate::{
    errors::{Error, Result},
    tally::PostingLedgers,
};
use std::net::SocketAddr;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_TALLY_URL: &str = "http://localhost:9000";
const DEFAULT_SESSION_TTL_HOURS: i64 = 12;
/// Longest session lifetime accepted from `SESSION_TTL_HOURS`: one year.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;
const DEFAULT_CONFIG_PATH: &str = "config.toml";
const DEFAULT_PAYMENT_LEDGER: &str = "Cash";
const DEFAULT_PURCHASE_LEDGER: &str = "Purchase Accounts";

/// Runtime configuration shared by the HTTP layer.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP server listens on
    pub bind_addr: SocketAddr,
    /// Base URL of the local Tally XML server
    pub tally_url: String,
    /// Bearer token accepted by the GQR export in place of a session
    pub service_key: Option<String>,
    /// Bearer token required by the cron endpoint
    pub cron_secret: Option<String>,
    /// How long a login session stays valid
    pub session_ttl_hours: i64,
    /// Whether the session cookie carries `Secure`; off only for plain-HTTP setups
    pub cookie_secure: bool,
    /// Path to the master data seed file
    pub config_path: String,
    /// Tally company vouchers are posted into; the loaded company when unset
    pub tally_company: Option<String>,
    /// Ledger credited by payment vouchers
    pub tally_payment_ledger: String,
    /// Ledger credited by debit notes
    pub tally_purchase_ledger: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            tally_url: DEFAULT_TALLY_URL.to_string(),
            service_key: None,
            cron_secret: None,
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            cookie_secure: true,
            config_path: DEFAULT_CONFIG_PATH.to_string(),
            tally_company: None,
            tally_payment_ledger: DEFAULT_PAYMENT_LEDGER.to_string(),
            tally_purchase_ledger: DEFAULT_PURCHASE_LEDGER.to_string(),
        }
    }
}

impl AppConfig {
    /// Builds the configuration from the process environment.
    ///
    /// # Errors
    /// Returns `Error::Config` if `BIND_ADDR`, `SESSION_TTL_HOURS` or
    /// `SESSION_COOKIE_SECURE` cannot be parsed, or the session lifetime exceeds
    /// [`MAX_SESSION_TTL_HOURS`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Used by `from_env` and tests.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_raw = non_empty("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse::<SocketAddr>().map_err(|e| Error::Config {
            message: format!("Invalid BIND_ADDR '{bind_raw}': {e}"),
        })?;

        let session_ttl_hours = match non_empty("SESSION_TTL_HOURS") {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(hours) if (1..=MAX_SESSION_TTL_HOURS).contains(&hours) => hours,
                _ => {
                    return Err(Error::Config {
                        message: format!(
                            "SESSION_TTL_HOURS must be between 1 and {MAX_SESSION_TTL_HOURS}, got '{raw}'"
                        ),
                    });
                }
            },
            None => DEFAULT_SESSION_TTL_HOURS,
        };

        let cookie_secure = match non_empty("SESSION_COOKIE_SECURE") {
            Some(raw) => raw.trim().parse::<bool>().map_err(|_| Error::Config {
                message: format!("SESSION_COOKIE_SECURE must be true or false, got '{raw}'"),
            })?,
            None => true,
        };

        let tally_url = non_empty("TALLY_URL")
            .unwrap_or_else(|| DEFAULT_TALLY_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            bind_addr,
            tally_url,
            service_key: non_empty("SERVICE_KEY"),
            cron_secret: non_empty("CRON_SECRET"),
            session_ttl_hours,
            cookie_secure,
            config_path: non_empty("CONFIG_PATH").unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string()),
            tally_company: non_empty("TALLY_COMPANY"),
            tally_payment_ledger: non_empty("TALLY_PAYMENT_LEDGER")
                .unwrap_or_else(|| DEFAULT_PAYMENT_LEDGER.to_string()),
            tally_purchase_ledger: non_empty("TALLY_PURCHASE_LEDGER")
                .unwrap_or_else(|| DEFAULT_PURCHASE_LEDGER.to_string()),
        })
    }

    /// Company and ledgers used when posting GQR settlements.
    #[must_use]
    pub fn posting_ledgers(&self) -> PostingLedgers {
        PostingLedgers {
            company: self.tally_company.clone(),
            payment_ledger: self.tally_payment_ledger.clone(),
            purchase_ledger: self.tally_purchase_ledger.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() -> Result<()> {
        let config = AppConfig::from_lookup(lookup_from(&[]))?;
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.tally_url, "http://localhost:9000");
        assert_eq!(config.session_ttl_hours, 12);
        assert!(config.cookie_secure);
        assert!(config.service_key.is_none());
        assert!(config.cron_secret.is_none());
        assert_eq!(config.posting_ledgers().payment_ledger, "Cash");
        assert!(config.posting_ledgers().company.is_none());
        Ok(())
    }

    #[test]
    fn test_reads_values_and_trims_tally_url() -> Result<()> {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("BIND_ADDR", "127.0.0.1:3000"),
            ("TALLY_URL", "http://10.0.0.5:9000/"),
            ("CRON_SECRET", "s3cret"),
            ("SERVICE_KEY", "  "),
            ("SESSION_TTL_HOURS", "24"),
            ("SESSION_COOKIE_SECURE", "false"),
            ("TALLY_COMPANY", "Nashik Agro Exports"),
        ]))?;
        assert!(!config.cookie_secure);
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.tally_url, "http://10.0.0.5:9000");
        assert_eq!(config.cron_secret.as_deref(), Some("s3cret"));
        assert!(config.service_key.is_none());
        assert_eq!(config.session_ttl_hours, 24);
        assert_eq!(
            config.posting_ledgers().company.as_deref(),
            Some("Nashik Agro Exports")
        );
        Ok(())
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            AppConfig::from_lookup(lookup_from(&[("BIND_ADDR", "nope")])),
            Err(Error::Config { .. })
        ));
        assert!(matches!(
            AppConfig::from_lookup(lookup_from(&[("SESSION_TTL_HOURS", "0")])),
            Err(Error::Config { .. })
        ));
        assert!(matches!(
            AppConfig::from_lookup(lookup_from(&[("SESSION_COOKIE_SECURE", "maybe")])),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn test_session_ttl_is_capped_at_one_year() -> Result<()> {
        let config = AppConfig::from_lookup(lookup_from(&[("SESSION_TTL_HOURS", "8760")]))?;
        assert_eq!(config.session_ttl_hours, MAX_SESSION_TTL_HOURS);

        for raw in ["8761", "100000000000", "99999999999999999999"] {
            assert!(matches!(
                AppConfig::from_lookup(lookup_from(&[("SESSION_TTL_HOURS", raw)])),
                Err(Error::Config { .. })
            ));
        }
        Ok(())
    }
}
