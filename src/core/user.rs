//! User administration - create, update and remove user profiles.
//!
//! Every operation here takes the caller's id and re-reads their role from the
//! database with [`auth::require_admin`] before doing anything.

use crate::{
    core::{
        auth::{self, Role},
        validate,
    },
    entities::{Session, UserProfile, session, user_profile},
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Deserialize;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Fields for a new user.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub role: Role,
}

/// Partial update; fields left as `None` keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub password: Option<String>,
}

fn check_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn check_email(email: &str) -> Result<String> {
    let email = auth::normalize_email(&validate::required_text("Email", email)?);
    if !email.contains('@') {
        return Err(Error::validation(format!("'{email}' is not an e-mail address")));
    }
    Ok(email)
}

/// Inserts a user without an admin check. Used by [`create_user`] and at startup.
pub(crate) async fn insert_user(
    db: &DatabaseConnection,
    input: NewUser,
) -> Result<user_profile::Model> {
    let email = check_email(&input.email)?;
    check_password(&input.password)?;

    let password_hash = auth::hash_password(&input.password)?;
    let now = chrono::Utc::now();
    let user = user_profile::ActiveModel {
        email: Set(email.clone()),
        full_name: Set(validate::optional_text(input.full_name)),
        role: Set(input.role.as_str().to_string()),
        password_hash: Set(password_hash),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = user
        .insert(db)
        .await
        .map_err(|e| Error::from(e).on_duplicate(format!("User '{email}' already exists")))?;

    tracing::info!(user_id = created.id, role = %input.role, "Created user {}", created.email);
    Ok(created)
}

/// Lists every user ordered by e-mail.
pub async fn list_users(
    db: &DatabaseConnection,
    caller_id: i64,
) -> Result<Vec<user_profile::Model>> {
    auth::require_admin(db, caller_id).await?;
    UserProfile::find()
        .order_by_asc(user_profile::Column::Email)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Creates a user on behalf of an admin.
///
/// # Errors
/// Returns `Forbidden` for non-admin callers, `Validation` for a malformed e-mail or a
/// short password, and `Conflict` when the e-mail is taken.
pub async fn create_user(
    db: &DatabaseConnection,
    caller_id: i64,
    input: NewUser,
) -> Result<user_profile::Model> {
    auth::require_admin(db, caller_id).await?;
    insert_user(db, input).await
}

/// Applies a partial update on behalf of an admin.
///
/// Deactivating a user or changing their password ends their open sessions.
pub async fn update_user(
    db: &DatabaseConnection,
    caller_id: i64,
    user_id: i64,
    update: UserUpdate,
) -> Result<user_profile::Model> {
    auth::require_admin(db, caller_id).await?;
    if let Some(password) = update.password.as_deref() {
        check_password(password)?;
    }

    let existing = UserProfile::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("User", user_id))?;
    let mut end_sessions = false;

    let mut user: user_profile::ActiveModel = existing.into();
    if let Some(full_name) = update.full_name {
        user.full_name = Set(validate::optional_text(Some(full_name)));
    }
    if let Some(role) = update.role {
        user.role = Set(role.as_str().to_string());
    }
    if let Some(is_active) = update.is_active {
        user.is_active = Set(is_active);
        end_sessions |= !is_active;
    }
    if let Some(password) = update.password {
        user.password_hash = Set(auth::hash_password(&password)?);
        end_sessions = true;
    }
    user.updated_at = Set(chrono::Utc::now());

    let txn = db.begin().await?;
    let updated = user.update(&txn).await?;
    if end_sessions {
        Session::delete_many()
            .filter(session::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;
    }
    txn.commit().await?;

    tracing::info!(user_id, caller_id, "Updated user {}", updated.email);
    Ok(updated)
}

/// Deletes a user and their sessions on behalf of an admin.
///
/// # Errors
/// Returns `Conflict` when an admin tries to delete their own account.
pub async fn delete_user(db: &DatabaseConnection, caller_id: i64, user_id: i64) -> Result<()> {
    auth::require_admin(db, caller_id).await?;
    if caller_id == user_id {
        return Err(Error::Conflict {
            message: "You cannot delete your own account".to_string(),
        });
    }

    let existing = UserProfile::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("User", user_id))?;

    let txn = db.begin().await?;
    Session::delete_many()
        .filter(session::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?;
    UserProfile::delete_by_id(user_id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(user_id, caller_id, "Deleted user {}", existing.email);
    Ok(())
}

/// Creates the first admin from `ADMIN_EMAIL` / `ADMIN_PASSWORD` when no users exist.
///
/// Returns the created admin, or `None` when users already exist or either value is
/// missing.
pub async fn bootstrap_admin(
    db: &DatabaseConnection,
    email: Option<&str>,
    password: Option<&str>,
) -> Result<Option<user_profile::Model>> {
    if UserProfile::find().count(db).await? > 0 {
        return Ok(None);
    }
    let (Some(email), Some(password)) = (email, password) else {
        tracing::warn!("No users exist and ADMIN_EMAIL / ADMIN_PASSWORD are not set");
        return Ok(None);
    };

    let admin = insert_user(
        db,
        NewUser {
            email: email.to_string(),
            password: password.to_string(),
            full_name: Some("Administrator".to_string()),
            role: Role::Admin,
        },
    )
    .await?;
    Ok(Some(admin))
}
