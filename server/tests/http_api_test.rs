//! Drives the full router against the in-memory store.

use std::str::FromStr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::Duration;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;

use eventdesk_server::auth::{Identity, JwtIdentityProvider};
use eventdesk_server::routes::create_routes;
use eventdesk_server::services::RetryPolicy;
use eventdesk_server::state::AppState;
use eventdesk_server::store::MemoryTicketStore;

struct TestApp {
    router: Router,
    jwt: JwtIdentityProvider,
}

impl TestApp {
    fn new() -> Self {
        let jwt = JwtIdentityProvider::new("integration-secret", "eventdesk-test");
        let state = AppState::new(
            Arc::new(MemoryTicketStore::new()),
            Arc::new(jwt.clone()),
            RetryPolicy::default(),
        );
        Self {
            router: create_routes(state),
            jwt,
        }
    }

    fn token(&self, user_id: &str) -> String {
        let identity = Identity {
            user_id: user_id.to_string(),
            display_name: format!("{} name", user_id),
            email: format!("{}@example.com", user_id),
        };
        self.jwt.issue(&identity, Duration::minutes(10)).unwrap()
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        user_id: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user_id) = user_id {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", self.token(user_id)));
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn create_type(&self, event_id: &str, price: f64, total: i32) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/tickets/types",
                Some("organizer"),
                Some(json!({
                    "event_id": event_id,
                    "name": "General admission",
                    "description": "Standing room",
                    "price": price,
                    "total_quantity": total,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn purchase(&self, ticket_type_id: &str, event_id: &str, buyer: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/api/tickets/purchase",
            Some(buyer),
            Some(json!({
                "ticket_type_id": ticket_type_id,
                "event_id": event_id,
                "event_title": "RustConf",
            })),
        )
        .await
    }
}

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).unwrap(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).unwrap(),
        other => panic!("not a decimal: {}", other),
    }
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
}

#[tokio::test]
async fn test_requests_without_token_are_rejected() {
    let app = TestApp::new();
    let (status, body) = app
        .send(
            Method::POST,
            "/api/tickets/purchase",
            None,
            Some(json!({"ticket_type_id": uuid::Uuid::new_v4(), "event_id": "e", "event_title": "t"})),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "AUTH_ERROR");
}

#[tokio::test]
async fn test_purchase_validate_and_stats_flow() {
    let app = TestApp::new();
    let type_id = app.create_type("evt-42", 25.5, 2).await;

    let (status, first) = app.purchase(&type_id, "evt-42", "alice").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["data"]["status"], "active");
    assert_eq!(first["data"]["user_id"], "alice");
    assert_eq!(first["data"]["user_email"], "alice@example.com");
    assert_eq!(decimal(&first["data"]["price"]), Decimal::new(255, 1));

    let (status, _) = app.purchase(&type_id, "evt-42", "bob").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, sold_out) = app.purchase(&type_id, "evt-42", "carol").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(sold_out["error"]["code"], "SOLD_OUT");

    let (status, available) = app
        .send(Method::GET, "/api/tickets/available?event_id=evt-42", Some("dave"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(available["data"]["tickets"], json!([]));

    let code = first["data"]["redemption_code"].as_str().unwrap().to_string();
    let (status, validated) = app
        .send(
            Method::POST,
            "/api/tickets/validate",
            Some("door-staff"),
            Some(json!({"redemption_code": code})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(validated["data"]["status"], "used");
    assert_eq!(validated["data"]["validated_by"], "door-staff");
    assert!(validated["data"]["used_at"].is_string());

    let (status, replay) = app
        .send(
            Method::POST,
            "/api/tickets/validate",
            Some("door-staff"),
            Some(json!({"redemption_code": code})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(replay["error"]["code"], "ALREADY_USED");

    let (status, unknown) = app
        .send(
            Method::POST,
            "/api/tickets/validate",
            Some("door-staff"),
            Some(json!({"redemption_code": "doesnotexist"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(unknown["error"]["code"], "NOT_FOUND");

    let (status, stats) = app
        .send(Method::GET, "/api/tickets/stats?event_id=evt-42", Some("organizer"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["data"]["total_tickets_sold"], 2);
    assert_eq!(stats["data"]["used_tickets"], 1);
    assert_eq!(decimal(&stats["data"]["total_revenue"]), Decimal::new(51, 0));
    assert_eq!(stats["data"]["stats_by_type"][0]["sold_quantity"], 2);
}

#[tokio::test]
async fn test_ticket_listing_scopes() {
    let app = TestApp::new();
    let type_id = app.create_type("evt-7", 10.0, 10).await;
    app.purchase(&type_id, "evt-7", "alice").await;
    app.purchase(&type_id, "evt-7", "alice").await;
    app.purchase(&type_id, "evt-7", "bob").await;

    let (_, mine) = app
        .send(Method::GET, "/api/tickets?event_id=evt-7", Some("bob"), None)
        .await;
    assert_eq!(mine["data"]["tickets"].as_array().unwrap().len(), 1);

    let (_, organizer) = app
        .send(
            Method::GET,
            "/api/tickets?event_id=evt-7&organizer=true",
            Some("organizer"),
            None,
        )
        .await;
    assert_eq!(organizer["data"]["tickets"].as_array().unwrap().len(), 3);

    let (status, sold) = app
        .send(Method::GET, "/api/tickets/sold?event_id=evt-7", Some("organizer"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sold["data"]["tickets"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_ticket_type_management() {
    let app = TestApp::new();
    let type_id = app.create_type("evt-3", 40.0, 5).await;

    let (status, listed) = app
        .send(Method::GET, "/api/tickets/types?event_id=evt-3", Some("organizer"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["data"]["ticket_types"][0]["available_quantity"], 5);

    let (status, updated) = app
        .send(
            Method::PUT,
            &format!("/api/tickets/types/{}", type_id),
            Some("organizer"),
            Some(json!({"name": "Late admission", "price": 55, "total_quantity": 8})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["data"]["name"], "Late admission");
    assert_eq!(updated["data"]["total_quantity"], 8);

    app.purchase(&type_id, "evt-3", "alice").await;
    let (status, refused) = app
        .send(
            Method::DELETE,
            &format!("/api/tickets/types/{}", type_id),
            Some("organizer"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(refused["error"]["code"], "CONFLICT");

    let unsold = app.create_type("evt-3", 10.0, 1).await;
    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/tickets/types/{}", unsold),
            Some("organizer"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_bad_input_is_a_validation_error() {
    let app = TestApp::new();

    let (status, body) = app
        .send(
            Method::POST,
            "/api/tickets/types",
            Some("organizer"),
            Some(json!({"event_id": "evt-1", "price": 10, "total_quantity": 3})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = app
        .send(
            Method::POST,
            "/api/tickets/types",
            Some("organizer"),
            Some(json!({"event_id": "evt-1", "name": "VIP", "price": -5, "total_quantity": 3})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/tickets/types",
            Some("organizer"),
            Some(json!({"event_id": "evt-1", "name": "VIP", "price": "10.005", "total_quantity": 3})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = app
        .send(Method::DELETE, "/api/tickets/types/not-a-uuid", Some("organizer"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(Method::GET, "/api/tickets/stats", Some("organizer"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, missing) = app
        .purchase(&uuid::Uuid::new_v4().to_string(), "evt-1", "alice")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(missing["error"]["code"], "NOT_FOUND");
}
