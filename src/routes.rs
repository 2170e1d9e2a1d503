//! Route definitions for the Armora API

use axum::{
    routing::{get, post},
    Router,
};

use crate::app_state::AppState;
use crate::handlers::*;

// Officer matching routes
pub fn matching_routes() -> Router<AppState> {
    Router::new().route("/api/cpos/search", post(search_cpos))
}

// Payment routes
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/api/payments/quote", post(quote_payment))
        .route("/api/payments/intent", post(create_payment_intent))
        .route("/api/payments/confirm", post(confirm_payment))
}

// Provider webhook routes
pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/api/webhooks/stripe", post(stripe_webhook))
}

// Booking routes
pub fn booking_routes() -> Router<AppState> {
    Router::new().route("/api/bookings/:id", get(get_booking))
}

/// Every API route with state applied. Middleware layers are added by the
/// binary.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(matching_routes())
        .merge(payment_routes())
        .merge(webhook_routes())
        .merge(booking_routes())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use chrono::Utc;
    use serde_json::{json, Value};
    use tower::util::ServiceExt;
    use uuid::Uuid;

    use crate::payments::{ChargeBasis, PaymentService};
    use crate::store::MemoryStore;
    use crate::test_support::{
        bearer_token, officer, signature_header, StubProvider, TEST_JWT_SECRET, TEST_WEBHOOK_SECRET,
    };

    struct TestApp {
        router: Router,
        provider: Arc<StubProvider>,
    }

    fn test_app_with_secret(webhook_secret: Option<&str>) -> TestApp {
        let store = Arc::new(MemoryStore::with_roster(vec![
            officer("canary_wharf", 51.5049, -0.0195, 4.8),
            officer("manchester", 53.4808, -2.2426, 4.9),
        ]));
        let provider = Arc::new(StubProvider::new());
        let payments = Arc::new(PaymentService::new(
            store.clone(),
            provider.clone(),
            ChargeBasis::FeeSplit,
            "gbp".to_string(),
        ));
        let state = AppState::new(
            store,
            payments,
            webhook_secret.map(str::to_string),
            300,
            TEST_JWT_SECRET,
        );

        TestApp {
            router: app(state),
            provider,
        }
    }

    fn test_app() -> TestApp {
        test_app_with_secret(Some(TEST_WEBHOOK_SECRET))
    }

    fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn read_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn search_body(latitude: f64) -> Value {
        json!({
            "latitude": latitude,
            "longitude": -0.1278,
            "protectionLevel": "executive",
            "startTime": "2030-01-01T10:00:00Z",
            "endTime": "2030-01-01T14:00:00Z"
        })
    }

    #[tokio::test]
    async fn test_root_and_health() {
        let app = test_app();
        for uri in ["/", "/health"] {
            let response = app
                .router
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_search_requires_auth() {
        let app = test_app();
        let response = app
            .router
            .oneshot(post_json("/api/cpos/search", None, search_body(51.5074)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = read_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "AUTH_ERROR");
    }

    #[tokio::test]
    async fn test_search_rejects_forged_token() {
        let app = test_app();
        let response = app
            .router
            .oneshot(post_json(
                "/api/cpos/search",
                Some("not.a.token"),
                search_body(51.5074),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_search_rejects_invalid_coordinates() {
        let app = test_app();
        let token = bearer_token(Uuid::new_v4());
        let response = app
            .router
            .oneshot(post_json("/api/cpos/search", Some(&token), search_body(95.0)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_search_rejects_inverted_window() {
        let app = test_app();
        let token = bearer_token(Uuid::new_v4());
        let mut body = search_body(51.5074);
        body["endTime"] = json!("2030-01-01T09:00:00Z");

        let response = app
            .router
            .oneshot(post_json("/api/cpos/search", Some(&token), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_search_returns_nearby_officer() {
        let app = test_app();
        let token = bearer_token(Uuid::new_v4());
        let response = app
            .router
            .oneshot(post_json("/api/cpos/search", Some(&token), search_body(51.5074)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["data"]["totalMatches"], 1);
        assert_eq!(body["data"]["cpos"][0]["displayName"], "canary_wharf");
        assert_eq!(body["data"]["searchCriteria"]["maxDistanceKm"], 50.0);
    }

    #[tokio::test]
    async fn test_quote() {
        let app = test_app();
        let response = app
            .router
            .oneshot(post_json("/api/payments/quote", None, json!({ "amount": 10000 })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["data"]["platformFee"], 3500);
        assert_eq!(body["data"]["officerEarnings"], 8500);
        assert_eq!(body["data"]["clientTotal"], 12000);
    }

    #[tokio::test]
    async fn test_intent_rejects_zero_amount() {
        let app = test_app();
        let token = bearer_token(Uuid::new_v4());
        let response = app
            .router
            .oneshot(post_json("/api/payments/intent", Some(&token), json!({ "amount": 0 })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(app.provider.created_count().await, 0);
    }

    #[tokio::test]
    async fn test_intent_provider_failure_is_bad_gateway() {
        let app = test_app();
        app.provider.fail_next_create().await;
        let token = bearer_token(Uuid::new_v4());
        let response = app
            .router
            .oneshot(post_json("/api/payments/intent", Some(&token), json!({ "amount": 5000 })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_intent_and_confirm_flow() {
        let app = test_app();
        let user = Uuid::new_v4();
        let token = bearer_token(user);

        let response = app
            .router
            .clone()
            .oneshot(post_json("/api/payments/intent", Some(&token), json!({ "amount": 10000 })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let created = read_json(response).await;
        assert_eq!(created["data"]["amount"], 12000);
        let intent_id = created["data"]["providerIntentId"].as_str().unwrap().to_string();
        assert!(created["data"]["clientSecret"].is_string());

        let confirm = json!({ "providerIntentId": intent_id, "userId": user });
        let response = app
            .router
            .clone()
            .oneshot(post_json("/api/payments/confirm", Some(&token), confirm.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["code"], "PAYMENT_NOT_COMPLETED");
        assert!(body["error"].as_str().unwrap().contains("requires_payment_method"));

        app.provider.set_status(&intent_id, "succeeded").await;
        let response = app
            .router
            .oneshot(post_json("/api/payments/confirm", Some(&token), confirm))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["data"]["payment"]["status"], "succeeded");
    }

    #[tokio::test]
    async fn test_confirm_for_other_user_is_unauthorized() {
        let app = test_app();
        let token = bearer_token(Uuid::new_v4());
        let response = app
            .router
            .oneshot(post_json(
                "/api/payments/confirm",
                Some(&token),
                json!({ "providerIntentId": "pi_123", "userId": Uuid::new_v4() }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_foreign_booking_is_not_found() {
        let app = test_app();
        let owner = Uuid::new_v4();
        let body = json!({
            "amount": 10000,
            "booking": {
                "protectionLevel": "essential",
                "pickup": { "address": "10 Downing Street" },
                "scheduledAt": "2030-01-01T10:00:00Z",
                "estimatedDurationMinutes": 120
            }
        });
        let response = app
            .router
            .clone()
            .oneshot(post_json("/api/payments/intent", Some(&bearer_token(owner)), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let booking_id = read_json(response).await["data"]["bookingId"]
            .as_str()
            .unwrap()
            .to_string();

        let get = |token: String| {
            Request::builder()
                .uri(format!("/api/bookings/{}", booking_id))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap()
        };

        let response = app
            .router
            .clone()
            .oneshot(get(bearer_token(owner)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .router
            .oneshot(get(bearer_token(Uuid::new_v4())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    fn webhook_request(body: &str, signature: Option<String>) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri("/api/webhooks/stripe");
        if let Some(signature) = signature {
            builder = builder.header("Stripe-Signature", signature);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_webhook_bad_signature_is_rejected() {
        let app = test_app();
        let body = json!({ "id": "evt_1", "type": "invoice.paid", "data": { "object": {} } })
            .to_string();
        let signature = signature_header(&body, "whsec_wrong", Utc::now().timestamp());

        let response = app
            .router
            .oneshot(webhook_request(&body, Some(signature)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["code"], "INVALID_SIGNATURE");
    }

    #[tokio::test]
    async fn test_webhook_unknown_event_is_acknowledged() {
        let app = test_app();
        let body = json!({ "id": "evt_2", "type": "invoice.paid", "data": { "object": {} } })
            .to_string();
        let signature = signature_header(&body, TEST_WEBHOOK_SECRET, Utc::now().timestamp());

        let response = app
            .router
            .oneshot(webhook_request(&body, Some(signature)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["data"]["outcome"], "ignored");
    }

    #[tokio::test]
    async fn test_webhook_without_secret_is_unavailable() {
        let app = test_app_with_secret(None);
        let response = app
            .router
            .oneshot(webhook_request("{}", Some("t=1,v1=00".to_string())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
