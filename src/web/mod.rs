//! HTTP surface - JSON API plus printable HTML documents.
//!
//! Handlers are thin: they pull the signed-in user out of the request, call
//! one `core` operation and serialize its result. Role checks live in `core`.

pub mod auth;

mod accounts;
mod containers;
mod invoices;
mod items;
mod reports;
mod support;

use crate::{
    config::Pricing,
    services::{Mailer, PhotoHost},
    store::Records,
};
use axum::{
    Json, Router,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use auth::{CurrentUser, SessionStore};

/// Everything a handler can reach.
#[derive(Clone)]
pub struct AppState {
    /// Typed record access
    pub records: Records,
    /// Freight pricing for new and re-measured items
    pub pricing: Pricing,
    /// Credentials email delivery
    pub mailer: Mailer,
    /// Photo uploads
    pub photos: Arc<dyn PhotoHost>,
    /// Signed-in users
    pub sessions: SessionStore,
    /// Public dashboard URL, linked from emails
    pub base_url: String,
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/login", post(auth::login))
        .route("/api/logout", post(auth::logout))
        .merge(accounts::routes())
        .merge(items::routes())
        .merge(containers::routes())
        .merge(invoices::routes())
        .merge(support::routes())
        .merge(reports::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        entities::ItemStatus,
        errors::{Error, Result},
        test_utils::*,
    };
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app() -> (Router, Records) {
        let (_, records) = setup_records();
        let state = AppState {
            records: records.clone(),
            pricing: Pricing::default(),
            mailer: Mailer::disabled(),
            photos: Arc::new(FakePhotoHost::default()),
            sessions: SessionStore::new(1),
            base_url: "http://localhost:8080".to_string(),
        };
        (router(state), records)
    }

    async fn call(app: &Router, request: Request<Body>) -> Result<(StatusCode, String)> {
        let response = app
            .clone()
            .oneshot(request)
            .await
            .map_err(|e: std::convert::Infallible| -> Error { match e {} })?;
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|e| Error::Internal {
                message: e.to_string(),
            })?
            .to_bytes();
        Ok((status, String::from_utf8_lossy(&bytes).into_owned()))
    }

    fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<Request<Body>> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        builder.body(body).map_err(|e| Error::Internal {
            message: e.to_string(),
        })
    }

    async fn json_call(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let (status, text) = call(app, request(method, uri, token, body)?).await?;
        let value = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)?
        };
        Ok((status, value))
    }

    async fn login(app: &Router, email: &str, password: &str) -> Result<String> {
        let (status, body) = json_call(
            app,
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await?;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        Ok(body["token"].as_str().unwrap_or_default().to_string())
    }

    #[tokio::test]
    async fn test_health() -> Result<()> {
        let (app, _) = app();
        let (status, body) = json_call(&app, Method::GET, "/health", None, None).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        Ok(())
    }

    #[tokio::test]
    async fn test_requests_need_a_session() -> Result<()> {
        let (app, records) = app();
        test_admin(&records).await?;

        let (status, body) = json_call(&app, Method::GET, "/api/items", None, None).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].as_str().is_some_and(|m| m.contains("Sign in")));

        let (status, _) = json_call(&app, Method::GET, "/api/items", Some("bogus"), None).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = json_call(
            &app,
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "email": "admin@shiplink.test", "password": "wrong" })),
        )
        .await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let token = login(&app, "admin@shiplink.test", TEST_PASSWORD).await?;
        let (status, me) = json_call(&app, Method::GET, "/api/me", Some(&token), None).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["role"], "admin");
        assert!(me.get("passwordHash").is_none());

        let (status, _) = json_call(&app, Method::POST, "/api/logout", Some(&token), None).await?;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = json_call(&app, Method::GET, "/api/me", Some(&token), None).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn test_admin_onboards_customer_who_stays_in_their_lane() -> Result<()> {
        let (app, records) = app();
        test_admin(&records).await?;
        let admin = login(&app, "admin@shiplink.test", TEST_PASSWORD).await?;

        let (status, issued) = json_call(
            &app,
            Method::POST,
            "/api/users",
            Some(&admin),
            Some(json!({ "name": "Kwame Mensah", "email": "kwame@example.com", "role": "customer" })),
        )
        .await?;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(issued["delivery"]["status"], "logged");
        let password = issued["password"].as_str().unwrap_or_default().to_string();
        let customer_id = issued["user"]["id"].as_str().unwrap_or_default().to_string();

        let customer = login(&app, "kwame@example.com", &password).await?;
        let (status, _) = json_call(
            &app,
            Method::POST,
            "/api/items",
            Some(&customer),
            Some(json!({
                "customerId": customer_id,
                "description": "Shoes",
                "lengthCm": 50.0,
                "widthCm": 40.0,
                "heightCm": 30.0,
                "quantity": 1
            })),
        )
        .await?;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, dashboard) =
            json_call(&app, Method::GET, "/api/dashboard", Some(&customer), None).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(dashboard["role"], "customer");

        // deactivation signs the customer out immediately
        let (status, _) = json_call(
            &app,
            Method::PATCH,
            &format!("/api/users/{customer_id}/active"),
            Some(&admin),
            Some(json!({ "active": false })),
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = json_call(&app, Method::GET, "/api/me", Some(&customer), None).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn test_profile_and_password_changes_reach_sessions() -> Result<()> {
        let (app, records) = app();
        test_admin(&records).await?;
        let customer = create_test_customer(&records, "Akua", "akua@example.com").await?;
        create_test_item(&records, &customer.id, ItemStatus::Received).await?;
        let admin = login(&app, "admin@shiplink.test", TEST_PASSWORD).await?;
        let laptop = login(&app, "akua@example.com", TEST_PASSWORD).await?;
        let phone = login(&app, "akua@example.com", TEST_PASSWORD).await?;

        let (status, _) = json_call(
            &app,
            Method::PATCH,
            "/api/me",
            Some(&laptop),
            Some(json!({ "name": "Akua Asante" })),
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        for token in [&laptop, &phone] {
            let (status, items) = json_call(&app, Method::GET, "/api/items", Some(token), None).await?;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(items[0]["customerName"], "Akua Asante");
        }

        // changing the password keeps the session that did it
        let (status, _) = json_call(
            &app,
            Method::POST,
            "/api/me/password",
            Some(&laptop),
            Some(json!({ "currentPassword": TEST_PASSWORD, "newPassword": "new-password-2" })),
        )
        .await?;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = json_call(&app, Method::GET, "/api/me", Some(&phone), None).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = json_call(&app, Method::GET, "/api/me", Some(&laptop), None).await?;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = json_call(
            &app,
            Method::POST,
            &format!("/api/users/{}/password", customer.id),
            Some(&admin),
            None,
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = json_call(&app, Method::GET, "/api/me", Some(&laptop), None).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = json_call(&app, Method::GET, "/api/me", Some(&admin), None).await?;
        assert_eq!(status, StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn test_item_check_in_and_photo_upload() -> Result<()> {
        let (app, records) = app();
        test_team_member(&records).await?;
        let customer = create_test_customer(&records, "Akua", "akua@example.com").await?;
        let team = login(&app, "team@shiplink.test", TEST_PASSWORD).await?;

        let (status, item) = json_call(
            &app,
            Method::POST,
            "/api/items",
            Some(&team),
            Some(json!({
                "customerId": customer.id,
                "description": "Phone cases",
                "lengthCm": 100.0,
                "widthCm": 100.0,
                "heightCm": 100.0,
                "quantity": 2,
                "weightKg": 12.5
            })),
        )
        .await?;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(item["cbm"], 2.0);
        assert_eq!(item["status"], "Received");
        let id = item["id"].as_str().unwrap_or_default().to_string();

        let boundary = "shiplinkboundary";
        let form = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"box.jpg\"\r\n\
             Content-Type: image/jpeg\r\n\r\nJPEGDATA\r\n--{boundary}--\r\n"
        );
        let upload = Request::builder()
            .method(Method::POST)
            .uri(format!("/api/items/{id}/photos"))
            .header(header::AUTHORIZATION, format!("Bearer {team}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(form))
            .map_err(|e| Error::Internal {
                message: e.to_string(),
            })?;
        let (status, text) = call(&app, upload).await?;
        assert_eq!(status, StatusCode::OK, "{text}");
        let updated: Value = serde_json::from_str(&text)?;
        assert_eq!(updated["photos"], json!(["https://images.test/1/box.jpg"]));

        let (status, _) = json_call(
            &app,
            Method::PATCH,
            &format!("/api/items/{id}/status"),
            Some(&team),
            Some(json!({ "status": "Delivered" })),
        )
        .await?;
        assert_eq!(status, StatusCode::FORBIDDEN);
        Ok(())
    }

    #[tokio::test]
    async fn test_packing_list_is_html() -> Result<()> {
        let (app, records) = app();
        test_team_member(&records).await?;
        let customer = create_test_customer(&records, "Akua", "akua@example.com").await?;
        let container = create_test_container(&records, "TGHU1234567").await?;
        let item = create_test_item(&records, &customer.id, ItemStatus::Loaded).await?;
        records
            .patch::<crate::entities::Item>(&item.id, json!({ "containerId": container.id }))
            .await?;
        let team = login(&app, "team@shiplink.test", TEST_PASSWORD).await?;

        let response = app
            .clone()
            .oneshot(request(
                Method::GET,
                &format!("/api/containers/{}/packing-list", container.id),
                Some(&team),
                None,
            )?)
            .await
            .map_err(|e: std::convert::Infallible| -> Error { match e {} })?;
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(content_type.starts_with("text/html"));

        let (_, html) = call(
            &app,
            request(
                Method::GET,
                &format!("/api/containers/{}/packing-list", container.id),
                Some(&team),
                None,
            )?,
        )
        .await?;
        assert!(html.contains("TGHU1234567"));
        assert!(html.contains("Akua"));
        Ok(())
    }
}
