//! Password hashing, login sessions and role checks.
//!
//! Passwords are stored as Argon2id PHC strings, which carry their own salt and cost.
//! A login creates a `sessions` row whose random token is handed to the browser as a
//! cookie. Every authenticated request goes back to the database, so deactivating a
//! user or changing their role takes effect immediately.

use crate::{
    entities::{Session, UserProfile, session, user_profile},
    errors::{Error, Result},
};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use chrono::{TimeDelta, Utc};
use sea_orm::{Set, prelude::*};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Access level of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Manages users and everything else
    Admin,
    /// Runs procurement, finalizes and posts GQRs
    Manager,
    /// Enters day-to-day records
    Staff,
}

impl Role {
    /// Value stored in the `role` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Staff => "staff",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "staff" => Ok(Self::Staff),
            other => Err(Error::validation(format!("Unknown role '{other}'"))),
        }
    }
}

/// The user behind a valid session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    pub role: Role,
}

impl TryFrom<&user_profile::Model> for AuthUser {
    type Error = Error;

    fn try_from(user: &user_profile::Model) -> Result<Self> {
        Ok(Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role.parse()?,
        })
    }
}

/// Lower-cased, trimmed form of an e-mail address used for lookups.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Hashes `password` into an Argon2id PHC string with a fresh random salt.
///
/// # Errors
/// Returns `Error::Credentials` if the hasher rejects its parameters.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes()).map_err(Error::credentials)?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(Error::credentials)
}

/// Checks `password` against a stored PHC string. Malformed hashes never match.
#[must_use]
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(err) => {
            tracing::warn!("Stored password hash is malformed: {}", err);
            false
        }
    }
}

/// Compares a presented secret with the configured one in constant time.
#[must_use]
pub fn secrets_match(presented: &str, expected: &str) -> bool {
    bool::from(presented.as_bytes().ct_eq(expected.as_bytes()))
}

/// Expiry of a session opened at `now` that lasts `ttl_hours`.
///
/// # Errors
/// Returns `Error::Config` when the lifetime does not fit in a timestamp.
pub fn session_expiry(now: DateTimeUtc, ttl_hours: i64) -> Result<DateTimeUtc> {
    TimeDelta::try_hours(ttl_hours)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| Error::Config {
            message: format!("Session lifetime of {ttl_hours} hours is out of range"),
        })
}

async fn find_user_by_email(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Option<user_profile::Model>> {
    UserProfile::find()
        .filter(user_profile::Column::Email.eq(normalize_email(email)))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Verifies credentials and opens a new session lasting `ttl_hours`.
///
/// # Errors
/// Returns `Unauthorized` for an unknown e-mail, a wrong password or an inactive user.
pub async fn login(
    db: &DatabaseConnection,
    email: &str,
    password: &str,
    ttl_hours: i64,
) -> Result<(session::Model, AuthUser)> {
    let Some(user) = find_user_by_email(db, email).await? else {
        tracing::warn!("Login attempt for unknown user {}", normalize_email(email));
        return Err(Error::Unauthorized);
    };
    if !verify_password(password, &user.password_hash) {
        tracing::warn!(user_id = user.id, "Login attempt with wrong password");
        return Err(Error::Unauthorized);
    }
    if !user.is_active {
        tracing::warn!(user_id = user.id, "Login attempt by inactive user");
        return Err(Error::Unauthorized);
    }

    let now = Utc::now();
    let expires_at = session_expiry(now, ttl_hours)?;
    let created = session::ActiveModel {
        token: Set(Uuid::new_v4().to_string()),
        user_id: Set(user.id),
        created_at: Set(now),
        expires_at: Set(expires_at),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(user_id = user.id, "User {} logged in", user.email);
    Ok((created, AuthUser::try_from(&user)?))
}

/// Resolves a session token to its user.
///
/// # Errors
/// Returns `Unauthorized` when the token is unknown or expired, or the user has been
/// deactivated or deleted.
pub async fn authenticate(db: &DatabaseConnection, token: &str) -> Result<AuthUser> {
    let Some(found) = Session::find()
        .filter(session::Column::Token.eq(token))
        .one(db)
        .await?
    else {
        return Err(Error::Unauthorized);
    };

    if found.expires_at <= Utc::now() {
        Session::delete_by_id(found.id).exec(db).await?;
        return Err(Error::Unauthorized);
    }

    let user = UserProfile::find_by_id(found.user_id)
        .one(db)
        .await?
        .filter(|u| u.is_active)
        .ok_or(Error::Unauthorized)?;
    AuthUser::try_from(&user)
}

/// Ends a session. Unknown tokens are ignored.
pub async fn logout(db: &DatabaseConnection, token: &str) -> Result<()> {
    Session::delete_many()
        .filter(session::Column::Token.eq(token))
        .exec(db)
        .await?;
    Ok(())
}

/// Deletes every expired session and returns how many were removed.
pub async fn purge_expired_sessions(db: &DatabaseConnection) -> Result<u64> {
    let result = Session::delete_many()
        .filter(session::Column::ExpiresAt.lte(Utc::now()))
        .exec(db)
        .await?;
    if result.rows_affected > 0 {
        tracing::info!("Purged {} expired sessions", result.rows_affected);
    }
    Ok(result.rows_affected)
}

/// Re-loads the caller from the database and checks they are active with one of
/// `allowed` roles.
///
/// # Errors
/// Returns `Unauthorized` if the user no longer exists and `Forbidden` if they are
/// inactive or hold another role.
pub async fn require_role(
    db: &DatabaseConnection,
    user_id: i64,
    allowed: &[Role],
) -> Result<user_profile::Model> {
    let user = UserProfile::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(Error::Unauthorized)?;
    let role = user.role.parse::<Role>()?;
    if !user.is_active || !allowed.contains(&role) {
        let names: Vec<&str> = allowed.iter().map(|r| r.as_str()).collect();
        return Err(Error::Forbidden {
            message: format!("Requires role {}", names.join(" or ")),
        });
    }
    Ok(user)
}

/// Re-loads the caller from the database and checks they are an active admin.
///
/// # Errors
/// Returns `Unauthorized` if the user no longer exists and `Forbidden` if they are not
/// an active admin.
pub async fn require_admin(db: &DatabaseConnection, user_id: i64) -> Result<user_profile::Model> {
    require_role(db, user_id, &[Role::Admin])
        .await
        .map_err(|err| match err {
            Error::Forbidden { .. } => Error::Forbidden {
                message: "Administrator access required".to_string(),
            },
            other => other,
        })
}
