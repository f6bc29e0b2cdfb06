//! Request tracing and session gatekeeping.

use super::AppState;
use crate::{core::auth, errors::Error};
use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::time::Instant;
use tracing::Instrument;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session";

/// Paths that never require a session. The export and cron routes check their own
/// bearer tokens.
const PUBLIC_PATHS: &[&str] = &[
    "/api/health",
    "/api/auth/login",
    "/api/auth/logout",
    "/api/gqr-data",
    "/api/cron/maintenance",
];

/// Reads the session token from the `Cookie` header.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            pair.trim()
                .strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
                .map(str::to_string)
        })
        .filter(|token| !token.is_empty())
}

/// Reads a `Bearer` token from the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// `Set-Cookie` value for a session lasting `max_age_secs`; zero clears the cookie.
#[must_use]
pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{SESSION_COOKIE}={token}; HttpOnly; Path=/; SameSite=Lax; Max-Age={max_age_secs}{secure}"
    )
}

/// Login page URL that sends the user back to `path` afterwards.
#[must_use]
pub fn login_redirect(path: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(path.as_bytes()).collect();
    format!("/login?redirect={encoded}")
}

/// Wraps every request in an `http.request` span and logs its outcome.
pub async fn request_tracing_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().to_string();
    let route = request.uri().path().to_string();
    let span = tracing::info_span!("http.request", method = %method, route = %route);

    async move {
        let started = Instant::now();
        let response = next.run(request).await;
        tracing::info!(
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis(),
            "Request handled"
        );
        response
    }
    .instrument(span)
    .await
}

/// Attaches the session's [`auth::AuthUser`] to the request, or turns the request away.
///
/// Unauthenticated API calls get a 401; anything else is redirected to the login page.
/// Signed-in users visiting `/login` are sent to `/`.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if PUBLIC_PATHS.contains(&path.as_str()) {
        return next.run(request).await;
    }

    let user = match session_token(request.headers()) {
        Some(token) => match auth::authenticate(&state.db, &token).await {
            Ok(user) => Some(user),
            Err(Error::Unauthorized) => None,
            Err(err) => return err.into_response(),
        },
        None => None,
    };

    if path == "/login" {
        return match user {
            Some(_) => Redirect::to("/").into_response(),
            None => next.run(request).await,
        };
    }

    match user {
        Some(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        None if path.starts_with("/api/") => Error::Unauthorized.into_response(),
        None => Redirect::to(&login_redirect(&path)).into_response(),
    }
}
