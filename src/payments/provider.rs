//! Payment provider seam and the Stripe REST client

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },
}

/// Parameters for a new payment intent
#[derive(Debug, Clone, PartialEq)]
pub struct IntentRequest {
    pub amount: i64,
    pub currency: String,
    pub description: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderErrorDetail {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// Provider-side view of a payment intent.
///
/// Mirrors the Stripe `payment_intent` object, which is also the `data.object`
/// of `payment_intent.*` webhook events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderIntent {
    pub id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    pub status: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub payment_method_types: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub last_payment_error: Option<ProviderErrorDetail>,
}

impl ProviderIntent {
    pub fn is_succeeded(&self) -> bool {
        self.status == "succeeded"
    }

    pub fn payment_method_type(&self) -> Option<String> {
        self.payment_method_types.first().cloned()
    }

    pub fn failure_message(&self) -> Option<String> {
        self.last_payment_error
            .as_ref()
            .and_then(|e| e.message.clone().or_else(|| e.code.clone()))
    }
}

#[async_trait]
pub trait PaymentProvider: Send + Sync + 'static {
    async fn create_intent(&self, request: &IntentRequest) -> Result<ProviderIntent, ProviderError>;

    async fn retrieve_intent(&self, intent_id: &str) -> Result<ProviderIntent, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: ProviderErrorDetail,
}

/// Stripe REST client (`/v1/payment_intents`)
pub struct StripeProvider {
    http_client: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl StripeProvider {
    pub fn new(api_base: &str, secret_key: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        })
    }

    fn intent_form(request: &IntentRequest) -> Vec<(String, String)> {
        let mut form = vec![
            ("amount".to_string(), request.amount.to_string()),
            ("currency".to_string(), request.currency.clone()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];
        if let Some(description) = &request.description {
            form.push(("description".to_string(), description.clone()));
        }
        for (key, value) in &request.metadata {
            form.push((format!("metadata[{}]", key), value.clone()));
        }
        form
    }

    async fn parse_intent(response: reqwest::Response) -> Result<ProviderIntent, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<ProviderIntent>().await?);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<StripeErrorBody>(&text)
            .ok()
            .and_then(|body| body.error.message)
            .unwrap_or(text);
        tracing::warn!(status = status.as_u16(), %message, "stripe request failed");

        Err(ProviderError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    async fn create_intent(&self, request: &IntentRequest) -> Result<ProviderIntent, ProviderError> {
        let response = self
            .http_client
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&Self::intent_form(request))
            .send()
            .await?;

        Self::parse_intent(response).await
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<ProviderIntent, ProviderError> {
        let response = self
            .http_client
            .get(format!("{}/v1/payment_intents/{}", self.api_base, intent_id))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        Self::parse_intent(response).await
    }
}
