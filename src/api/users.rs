//! Admin user management. The caller's role is re-checked in the core layer.

use super::{AppState, json_body};
use crate::{
    core::{
        auth::AuthUser,
        user::{self, NewUser, UserUpdate},
    },
    entities::user_profile,
    errors::Result,
};
use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};

type UserJson = Json<user_profile::Model>;

/// `GET /api/admin/users`
pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> Result<Json<Vec<user_profile::Model>>> {
    Ok(Json(user::list_users(&state.db, caller.id).await?))
}

/// `POST /api/admin/users`
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    payload: std::result::Result<Json<NewUser>, JsonRejection>,
) -> Result<(StatusCode, UserJson)> {
    let input = json_body(payload)?;
    let created = user::create_user(&state.db, caller.id, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /api/admin/users/:id`
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(user_id): Path<i64>,
    payload: std::result::Result<Json<UserUpdate>, JsonRejection>,
) -> Result<UserJson> {
    let input = json_body(payload)?;
    Ok(Json(user::update_user(&state.db, caller.id, user_id, input).await?))
}

/// `DELETE /api/admin/users/:id`
pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(user_id): Path<i64>,
) -> Result<StatusCode> {
    user::delete_user(&state.db, caller.id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
