use thiserror::Error;

/// Crate-wide error type shared by the core, Tally and API layers.
#[derive(Debug, Error)]
pub enum Error {
    /// Startup or configuration problem
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description
        message: String,
    },

    /// Input rejected before touching the database
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable description
        message: String,
    },

    /// A referenced row does not exist
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity name, e.g. "Supplier"
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// The request conflicts with current state (duplicates, finalized records)
    #[error("Conflict: {message}")]
    Conflict {
        /// Human-readable description
        message: String,
    },

    /// Missing, unknown or expired session
    #[error("Authentication required")]
    Unauthorized,

    /// Authenticated, but the role does not allow the action
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Human-readable description
        message: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Tally answered, but rejected or garbled the request
    #[error("Tally error: {message}")]
    Tally {
        /// Human-readable description
        message: String,
    },

    /// Tally could not be reached within the timeout
    #[error("Tally is not reachable: {message}")]
    TallyUnavailable {
        /// Human-readable description
        message: String,
    },

    /// Tally sent something that is not well-formed XML
    #[error("XML error: {message}")]
    Xml {
        /// Parser message
        message: String,
    },

    /// Password hashing failed
    #[error("Credential error: {message}")]
    Credentials {
        /// Hasher message
        message: String,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a `Validation` error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a `NotFound` error keyed by a numeric id.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Wraps any XML reader failure.
    pub fn xml(err: impl std::fmt::Display) -> Self {
        Self::Xml {
            message: err.to_string(),
        }
    }

    /// Wraps a password hashing failure.
    pub fn credentials(err: impl std::fmt::Display) -> Self {
        Self::Credentials {
            message: err.to_string(),
        }
    }

    /// Maps unique-constraint violations to `Conflict`, leaves other errors untouched.
    #[must_use]
    pub fn on_duplicate(self, message: impl Into<String>) -> Self {
        match self {
            Self::Database(ref err) if is_unique_violation(err) => Self::Conflict {
                message: message.into(),
            },
            other => other,
        }
    }
}

fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
    if matches!(
        err.sql_err(),
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
    ) {
        return true;
    }
    let text = err.to_string();
    text.contains("UNIQUE") || text.contains("unique")
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_duplicate_maps_unique_violation() {
        let err = Error::Database(sea_orm::DbErr::Custom(
            "UNIQUE constraint failed: suppliers.name".to_string(),
        ));
        assert!(matches!(
            err.on_duplicate("Supplier already exists"),
            Error::Conflict { .. }
        ));
    }

    #[test]
    fn test_on_duplicate_keeps_other_errors() {
        let err = Error::validation("bad");
        assert!(matches!(
            err.on_duplicate("ignored"),
            Error::Validation { .. }
        ));
    }

    #[test]
    fn test_not_found_message() {
        let err = Error::not_found("Supplier", 7);
        assert_eq!(err.to_string(), "Supplier not found: 7");
    }
}
