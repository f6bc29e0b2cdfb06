//! HTTP API - axum router, shared state and request handlers.
//!
//! Handlers parse the request, call into [`crate::core`] and let
//! [`crate::errors::Error`] turn failures into JSON responses.

pub mod auth;
pub mod cron;
pub mod error;
pub mod gqr;
pub mod masters;
pub mod middleware;
pub mod purchase_orders;
pub mod tally;
pub mod users;

use crate::{
    config::app::AppConfig,
    errors::{Error, Result},
    tally::TallyGateway,
};
use axum::{
    Json, Router,
    extract::rejection::JsonRejection,
    http::{HeaderName, Method, Uri, header},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post, put},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub tally: Arc<dyn TallyGateway>,
}

/// Unwraps a JSON body, reporting malformed or incomplete input as a validation error.
pub(crate) fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| Error::validation(rejection.body_text()))
}

async fn not_found(uri: Uri) -> Error {
    Error::not_found("Route", uri.path())
}

fn export_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ])
}

/// Builds the full application router.
pub fn build_router(state: AppState) -> Router {
    let export = Router::new()
        .route("/api/gqr-data", get(gqr::export))
        .layer(export_cors());

    Router::new()
        .route("/login", get(auth::login_page))
        .route("/api/health", get(auth::health))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/admin/users", get(users::list).post(users::create))
        .route("/api/admin/users/:id", put(users::update).delete(users::delete))
        .route(
            "/api/suppliers",
            get(masters::list_suppliers).post(masters::create_supplier),
        )
        .route(
            "/api/suppliers/:id",
            get(masters::get_supplier)
                .put(masters::update_supplier)
                .delete(masters::delete_supplier),
        )
        .route("/api/items", get(masters::list_items).post(masters::create_item))
        .route(
            "/api/items/:id",
            get(masters::get_item)
                .put(masters::update_item)
                .delete(masters::delete_item),
        )
        .route(
            "/api/gap-items",
            get(masters::list_gap_items).post(masters::create_gap_item),
        )
        .route(
            "/api/gap-items/:id",
            get(masters::get_gap_item)
                .put(masters::update_gap_item)
                .delete(masters::delete_gap_item),
        )
        .route(
            "/api/sieve-sizes",
            get(masters::list_sieve_sizes).post(masters::create_sieve_size),
        )
        .route(
            "/api/sieve-sizes/:id",
            get(masters::get_sieve_size)
                .put(masters::update_sieve_size)
                .delete(masters::delete_sieve_size),
        )
        .route("/api/units", get(masters::list_units).post(masters::create_unit))
        .route(
            "/api/units/:id",
            get(masters::get_unit)
                .put(masters::update_unit)
                .delete(masters::delete_unit),
        )
        .route(
            "/api/purchase-orders",
            get(purchase_orders::list).post(purchase_orders::create),
        )
        .route(
            "/api/purchase-orders/:id",
            get(purchase_orders::get).put(purchase_orders::update),
        )
        .route(
            "/api/purchase-orders/:id/status",
            post(purchase_orders::set_status),
        )
        .route(
            "/api/pre-gr",
            get(purchase_orders::list_pre_gr).post(purchase_orders::create_pre_gr),
        )
        .route("/api/pre-gr/:id", get(purchase_orders::get_pre_gr))
        .route("/api/gqr", get(gqr::list).post(gqr::create))
        .route("/api/gqr/:id", get(gqr::get).put(gqr::update))
        .route("/api/gqr/:id/finalize", post(gqr::finalize))
        .route("/api/gqr/:id/tally-posted", patch(gqr::set_tally_posted))
        .route("/api/gqr/:id/post-to-tally", post(gqr::post_to_tally))
        .route("/api/tally/status", get(tally::status))
        .route("/api/tally/companies", get(tally::companies))
        .route("/api/cron/maintenance", post(cron::maintenance))
        .merge(export)
        .fallback(not_found)
        .layer(from_fn_with_state(
            state.clone(),
            middleware::session_middleware,
        ))
        .layer(from_fn(middleware::request_tracing_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    use super::*;
    use crate::{
        core::auth::Role,
        entities::user_profile,
        tally::{ImportResult, TallyCompany, TallyStatus},
        test_utils::*,
    };
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{HeaderMap, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use sea_orm::{ActiveModelTrait, Set};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    struct StubTally;

    #[async_trait]
    impl TallyGateway for StubTally {
        async fn status(&self) -> TallyStatus {
            TallyStatus {
                running: true,
                detail: "TallyPrime Server is Running".to_string(),
            }
        }

        async fn companies(&self) -> Result<Vec<TallyCompany>> {
            Ok(vec![TallyCompany {
                name: "Nashik Agro Exports".to_string(),
                guid: None,
                starting_from: None,
            }])
        }

        async fn import_vouchers(&self, _request_xml: String) -> Result<ImportResult> {
            Ok(ImportResult {
                created: 1,
                ..Default::default()
            })
        }
    }

    fn app(db: DatabaseConnection) -> Router {
        let config = AppConfig {
            service_key: Some("svc-key".to_string()),
            cron_secret: Some("cron-secret".to_string()),
            ..Default::default()
        };
        build_router(AppState {
            db,
            config: Arc::new(config),
            tally: Arc::new(StubTally),
        })
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, body)
    }

    fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: &Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    /// Logs in and returns the `Cookie` header value for the new session.
    async fn login_cookie(app: &Router, email: &str) -> String {
        let (status, headers, _) = send(
            app,
            json_request(
                "POST",
                "/api/auth/login",
                None,
                &json!({ "email": email, "password": TEST_PASSWORD }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let set_cookie = headers
            .get(header::SET_COOKIE)
            .expect("login sets a cookie")
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_is_public() -> Result<()> {
        let app = app(setup_test_db().await?);
        let (status, _, body) = send(&app, get_request("/api/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        Ok(())
    }

    #[tokio::test]
    async fn test_unauthenticated_requests() -> Result<()> {
        let app = app(setup_test_db().await?);

        let (status, _, body) = send(&app, get_request("/api/suppliers", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());

        let (status, headers, _) = send(&app, get_request("/dashboard", None)).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(headers[header::LOCATION], "/login?redirect=%2Fdashboard");

        let (status, _, _) = send(&app, get_request("/api/suppliers", Some("session=bogus"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn test_login_session_and_logout() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "clerk@example.com", Role::Staff).await?;
        let app = app(db);

        let cookie = login_cookie(&app, "clerk@example.com").await;
        let (status, _, body) = send(&app, get_request("/api/auth/me", Some(&cookie))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "clerk@example.com");
        assert_eq!(body["role"], "staff");

        let (status, headers, _) = send(&app, get_request("/login", Some(&cookie))).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(headers[header::LOCATION], "/");

        let (status, _, _) =
            send(&app, json_request("POST", "/api/auth/logout", Some(&cookie), &json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _, _) = send(&app, get_request("/api/auth/me", Some(&cookie))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _, _) = send(
            &app,
            json_request(
                "POST",
                "/api/auth/login",
                None,
                &json!({ "email": "clerk@example.com", "password": "wrong-password" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_or_blank_fields_return_400() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "clerk@example.com", Role::Staff).await?;
        let app = app(db);
        let cookie = login_cookie(&app, "clerk@example.com").await;

        let (status, _, body) = send(
            &app,
            json_request("POST", "/api/suppliers", Some(&cookie), &json!({ "phone": "98220" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, _, _) = send(
            &app,
            json_request("POST", "/api/suppliers", Some(&cookie), &json!({ "name": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, body) = send(
            &app,
            json_request(
                "POST",
                "/api/suppliers",
                Some(&cookie),
                &json!({ "name": "Lasalgaon FPO" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["name"], "Lasalgaon FPO");
        Ok(())
    }

    #[tokio::test]
    async fn test_admin_routes_recheck_role() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = create_test_user(&db, "admin@example.com", Role::Admin).await?;
        let app = app(db.clone());
        let cookie = login_cookie(&app, "admin@example.com").await;

        let (status, _, body) = send(&app, get_request("/api/admin/users", Some(&cookie))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().map(Vec::len), Some(1));

        // Demoted after the session was created
        let mut demoted: user_profile::ActiveModel = admin.into();
        demoted.role = Set(Role::Staff.as_str().to_string());
        demoted.update(&db).await?;

        let (status, _, _) = send(&app, get_request("/api/admin/users", Some(&cookie))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        Ok(())
    }

    #[tokio::test]
    async fn test_gqr_export_auth_and_cors() -> Result<()> {
        let fixture = setup_with_gqr().await?;
        let app = app(fixture.db.clone());

        let (status, _, _) = send(&app, get_request("/api/gqr-data", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .uri(format!("/api/gqr-data?id={}", fixture.gqr.id))
            .header(header::AUTHORIZATION, "Bearer svc-key")
            .header(header::ORIGIN, "https://dashboard.example.com")
            .body(Body::empty())
            .unwrap();
        let (status, headers, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"][0]["supplier"]["name"], "Nashik Onion Traders");

        let preflight = Request::builder()
            .method("OPTIONS")
            .uri("/api/gqr-data")
            .header(header::ORIGIN, "https://dashboard.example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "apikey")
            .body(Body::empty())
            .unwrap();
        let (status, headers, _) = send(&app, preflight).await;
        assert!(status.is_success());
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let request = Request::builder()
            .uri("/api/gqr-data")
            .header(header::AUTHORIZATION, "Bearer svc-ke")
            .body(Body::empty())
            .unwrap();
        let (status, _, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn test_gqr_export_with_session_and_status() -> Result<()> {
        let fixture = setup_with_gqr().await?;
        let app = app(fixture.db.clone());
        let cookie = login_cookie(&app, &fixture.manager.email).await;
        let id = fixture.gqr.id;

        let (status, _, body) =
            send(&app, get_request(&format!("/api/gqr-data?id={id}"), Some(&cookie))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);

        let (status, _, body) = send(
            &app,
            get_request(&format!("/api/gqr-data?id={id}&status=draft"), Some(&cookie)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);

        let (status, _, body) = send(
            &app,
            get_request(&format!("/api/gqr-data?id={id}&status=finalized"), Some(&cookie)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);

        let (status, _, _) =
            send(&app, get_request("/api/gqr-data", Some("session=expired-or-forged"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn test_staff_cannot_settle_gqr() -> Result<()> {
        let fixture = setup_with_gqr().await?;
        create_test_user(&fixture.db, "gate@example.com", Role::Staff).await?;
        let app = app(fixture.db.clone());
        let staff = login_cookie(&app, "gate@example.com").await;
        let base = format!("/api/gqr/{}", fixture.gqr.id);

        let (status, _, _) = send(
            &app,
            json_request("POST", &format!("{base}/finalize"), Some(&staff), &json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let manager = login_cookie(&app, &fixture.manager.email).await;
        let (status, _, _) = send(
            &app,
            json_request("POST", &format!("{base}/finalize"), Some(&manager), &json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, _) = send(
            &app,
            json_request(
                "POST",
                &format!("{base}/post-to-tally"),
                Some(&staff),
                &json!({ "kind": "payment" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _, _) = send(
            &app,
            json_request(
                "PATCH",
                &format!("{base}/tally-posted"),
                Some(&staff),
                &json!({ "posted": true }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // Staff can still read the report
        let (status, _, body) = send(&app, get_request(&base, Some(&staff))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["gqr"]["tally_posted"], false);
        Ok(())
    }

    #[tokio::test]
    async fn test_gqr_lifecycle_over_http() -> Result<()> {
        let fixture = setup_with_gqr().await?;
        let app = app(fixture.db.clone());
        let cookie = login_cookie(&app, &fixture.manager.email).await;
        let base = format!("/api/gqr/{}", fixture.gqr.id);

        let (status, _, body) = send(
            &app,
            json_request("POST", &format!("{base}/finalize"), Some(&cookie), &json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["finalized_by"], "qc@example.com");

        let (status, _, _) = send(
            &app,
            json_request("POST", &format!("{base}/finalize"), Some(&cookie), &json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _, body) = send(
            &app,
            json_request(
                "POST",
                &format!("{base}/post-to-tally"),
                Some(&cookie),
                &json!({ "kind": "payment" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tally_posted"], true);

        let (status, _, body) = send(
            &app,
            json_request(
                "PATCH",
                &format!("{base}/tally-posted"),
                Some(&cookie),
                &json!({ "posted": false }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tally_posted_at"], Value::Null);
        Ok(())
    }

    #[tokio::test]
    async fn test_cron_requires_secret() -> Result<()> {
        let app = app(setup_test_db().await?);

        let request = Request::builder()
            .method("POST")
            .uri("/api/cron/maintenance")
            .header(header::AUTHORIZATION, "Bearer wrong")
            .body(Body::empty())
            .unwrap();
        let (status, _, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .method("POST")
            .uri("/api/cron/maintenance")
            .header(header::AUTHORIZATION, "Bearer cron-secret")
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pending_tally_postings"], 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_tally_endpoints_use_gateway() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "clerk@example.com", Role::Staff).await?;
        let app = app(db);
        let cookie = login_cookie(&app, "clerk@example.com").await;

        let (status, _, body) = send(&app, get_request("/api/tally/status", Some(&cookie))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["running"], true);

        let (status, _, body) =
            send(&app, get_request("/api/tally/companies", Some(&cookie))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["name"], "Nashik Agro Exports");
        Ok(())
    }
}
