//! Fixtures and doubles shared by unit tests

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::auth::Claims;
use crate::models::{AvailabilityStatus, Location, NewBooking, ProtectionLevel, ProtectionOfficer};
use crate::payments::provider::{IntentRequest, PaymentProvider, ProviderError, ProviderIntent};

pub const TEST_JWT_SECRET: &str = "test-jwt-secret";
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";

pub fn officer(name: &str, lat: f64, lon: f64, rating: f64) -> ProtectionOfficer {
    ProtectionOfficer {
        id: Uuid::new_v4(),
        display_name: name.to_string(),
        rating,
        completed_assignments: 42,
        supported_levels: vec![
            ProtectionLevel::Essential,
            ProtectionLevel::Executive,
            ProtectionLevel::Shadow,
        ],
        license_number: format!("SIA-{}", name.to_uppercase()),
        license_expiry: Utc::now() + Duration::days(365),
        latitude: lat,
        longitude: lon,
        hourly_rate: 6_500,
        availability: AvailabilityStatus::Available,
    }
}

pub fn new_booking(level: ProtectionLevel) -> NewBooking {
    NewBooking {
        protection_level: level,
        pickup: Location {
            address: "1 Canada Square, London".to_string(),
            latitude: Some(51.5049),
            longitude: Some(-0.0195),
        },
        dropoff: Some(Location {
            address: "Heathrow Terminal 5".to_string(),
            latitude: Some(51.4723),
            longitude: Some(-0.4880),
        }),
        scheduled_at: Utc::now() + Duration::days(2),
        estimated_duration_minutes: 90,
        estimated_distance_km: Some(28.5),
    }
}

pub fn bearer_token(user_id: Uuid) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: now + 3600,
        iat: now,
        email: Some("principal@example.com".to_string()),
        role: Some("authenticated".to_string()),
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

/// `Stripe-Signature` header value for `payload`
pub fn signature_header(payload: &str, secret: &str, timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

/// In-memory payment provider
#[derive(Default)]
pub struct StubProvider {
    intents: Mutex<HashMap<String, ProviderIntent>>,
    requests: Mutex<Vec<IntentRequest>>,
    fail_next: Mutex<bool>,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_next_create(&self) {
        *self.fail_next.lock().await = true;
    }

    pub async fn last_request(&self) -> Option<IntentRequest> {
        self.requests.lock().await.last().cloned()
    }

    pub async fn created_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    pub async fn intent(&self, id: &str) -> Option<ProviderIntent> {
        self.intents.lock().await.get(id).cloned()
    }

    pub async fn put_intent(&self, id: &str, status: &str, amount: i64) -> ProviderIntent {
        let intent = ProviderIntent {
            id: id.to_string(),
            client_secret: Some(format!("{}_secret_test", id)),
            status: status.to_string(),
            amount,
            currency: "gbp".to_string(),
            payment_method_types: vec!["card".to_string()],
            metadata: Default::default(),
            last_payment_error: None,
        };
        self.intents
            .lock()
            .await
            .insert(id.to_string(), intent.clone());
        intent
    }

    /// Change the status of a known intent (or create one for 1000 minor units).
    pub async fn set_status(&self, id: &str, status: &str) -> ProviderIntent {
        let mut intents = self.intents.lock().await;
        let intent = intents
            .entry(id.to_string())
            .or_insert_with(|| ProviderIntent {
                id: id.to_string(),
                client_secret: None,
                status: String::new(),
                amount: 1_000,
                currency: "gbp".to_string(),
                payment_method_types: vec!["card".to_string()],
                metadata: Default::default(),
                last_payment_error: None,
            });
        intent.status = status.to_string();
        intent.clone()
    }
}

#[async_trait]
impl PaymentProvider for StubProvider {
    async fn create_intent(&self, request: &IntentRequest) -> Result<ProviderIntent, ProviderError> {
        let mut fail_next = self.fail_next.lock().await;
        if *fail_next {
            *fail_next = false;
            return Err(ProviderError::Api {
                status: 503,
                message: "provider unavailable".to_string(),
            });
        }

        self.requests.lock().await.push(request.clone());
        let id = format!("pi_{}", Uuid::new_v4().simple());
        let intent = ProviderIntent {
            id: id.clone(),
            client_secret: Some(format!("{}_secret_test", id)),
            status: "requires_payment_method".to_string(),
            amount: request.amount,
            currency: request.currency.clone(),
            payment_method_types: vec!["card".to_string()],
            metadata: request.metadata.clone(),
            last_payment_error: None,
        };
        self.intents.lock().await.insert(id, intent.clone());
        Ok(intent)
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<ProviderIntent, ProviderError> {
        self.intents
            .lock()
            .await
            .get(intent_id)
            .cloned()
            .ok_or_else(|| ProviderError::Api {
                status: 404,
                message: format!("No such payment_intent: '{}'", intent_id),
            })
    }
}
