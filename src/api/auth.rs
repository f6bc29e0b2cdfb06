//! Login, logout and the current user.

use super::{
    AppState, json_body,
    middleware::{session_cookie, session_token},
};
use crate::{
    core::auth::{self, AuthUser},
    errors::Result,
};
use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, header},
    response::{AppendHeaders, IntoResponse},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

/// Login form.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// `GET /api/health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /login` - the sign-in entry point for browsers without a session.
pub async fn login_page() -> Json<Value> {
    Json(json!({ "message": "Sign in by posting email and password to /api/auth/login" }))
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let form = json_body(payload)?;
    let ttl_hours = state.config.session_ttl_hours;
    let (session, user) = auth::login(&state.db, &form.email, &form.password, ttl_hours).await?;
    let max_age = (session.expires_at - Utc::now()).num_seconds().max(0);

    Ok((
        AppendHeaders([(
            header::SET_COOKIE,
            session_cookie(&session.token, max_age, state.config.cookie_secure),
        )]),
        Json(json!({ "user": user, "expires_at": session.expires_at })),
    ))
}

/// `POST /api/auth/logout`
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse> {
    if let Some(token) = session_token(&headers) {
        auth::logout(&state.db, &token).await?;
    }
    Ok((
        AppendHeaders([(
            header::SET_COOKIE,
            session_cookie("", 0, state.config.cookie_secure),
        )]),
        Json(json!({ "status": "logged_out" })),
    ))
}

/// `GET /api/auth/me`
pub async fn me(Extension(user): Extension<AuthUser>) -> Json<AuthUser> {
    Json(user)
}
