//! Payment provider webhook routing
//!
//! Events are verified before anything is parsed, then dispatched by type.
//! Every transition is written as absolute state keyed by provider ids, so an
//! at-least-once redelivery converges on the same rows.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

pub mod events;
pub mod signature;

use crate::error::{ArmoraError, ArmoraResult};
use crate::models::{Subscription, SubscriptionStatus};
use crate::payments::{PaymentService, ProviderIntent, RefundNotice};
use crate::store::BookingStore;
use events::{ChargeObject, EventKind, SubscriptionObject, WebhookEvent};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WebhookOutcome {
    Processed { event_type: String },
    Duplicate { event_id: String },
    Ignored { event_type: String },
}

pub struct WebhookRouter {
    payments: Arc<PaymentService>,
    store: Arc<dyn BookingStore>,
    secret: String,
    tolerance_seconds: i64,
}

impl WebhookRouter {
    pub fn new(
        payments: Arc<PaymentService>,
        store: Arc<dyn BookingStore>,
        secret: String,
        tolerance_seconds: i64,
    ) -> Self {
        Self {
            payments,
            store,
            secret,
            tolerance_seconds,
        }
    }

    /// Verify and route one delivery. Fails closed: nothing is parsed or
    /// written unless the signature checks out.
    pub async fn handle(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
    ) -> ArmoraResult<WebhookOutcome> {
        let header = signature_header.ok_or_else(|| {
            ArmoraError::InvalidSignature("missing signature header".to_string())
        })?;
        signature::verify(
            payload,
            header,
            &self.secret,
            self.tolerance_seconds,
            Utc::now().timestamp(),
        )?;

        let event: WebhookEvent = serde_json::from_slice(payload)
            .map_err(|e| ArmoraError::Validation(format!("malformed event: {}", e)))?;

        if self.store.is_event_processed(&event.id).await? {
            tracing::debug!(event_id = %event.id, "duplicate webhook delivery");
            return Ok(WebhookOutcome::Duplicate { event_id: event.id });
        }

        let kind = EventKind::from_type(&event.event_type);
        match kind {
            EventKind::PaymentSucceeded => {
                let intent: ProviderIntent = parse_object(&event)?;
                self.payments.apply_payment_succeeded(&intent).await?;
            }
            EventKind::PaymentFailed => {
                let intent: ProviderIntent = parse_object(&event)?;
                self.payments.apply_payment_failed(&intent).await?;
            }
            EventKind::Refunded => {
                let charge: ChargeObject = parse_object(&event)?;
                self.handle_refund(&charge).await?;
            }
            EventKind::SubscriptionUpserted => {
                let subscription: SubscriptionObject = parse_object(&event)?;
                self.upsert_subscription(&subscription, None).await?;
            }
            EventKind::SubscriptionCancelled => {
                let subscription: SubscriptionObject = parse_object(&event)?;
                self.cancel_subscription(&subscription).await?;
            }
            EventKind::Unknown => {
                tracing::info!(event_id = %event.id, event_type = %event.event_type, "ignoring unhandled webhook event");
                return Ok(WebhookOutcome::Ignored {
                    event_type: event.event_type,
                });
            }
        }

        self.store
            .mark_event_processed(&event.id, &event.event_type)
            .await?;
        tracing::info!(event_id = %event.id, event_type = %event.event_type, "webhook event processed");

        Ok(WebhookOutcome::Processed {
            event_type: event.event_type,
        })
    }

    async fn handle_refund(&self, charge: &ChargeObject) -> ArmoraResult<()> {
        let Some(provider_intent_id) = &charge.payment_intent else {
            tracing::warn!(charge_id = %charge.id, "refunded charge has no payment intent");
            return Ok(());
        };
        if !charge.refunded {
            tracing::info!(
                charge_id = %charge.id,
                amount_refunded = charge.amount_refunded,
                "partial refund recorded by provider only"
            );
            return Ok(());
        }

        self.payments
            .apply_refund(&RefundNotice {
                provider_intent_id: provider_intent_id.clone(),
                amount: charge.amount,
                currency: charge.currency.clone(),
            })
            .await?;
        Ok(())
    }

    async fn upsert_subscription(
        &self,
        object: &SubscriptionObject,
        status_override: Option<SubscriptionStatus>,
    ) -> ArmoraResult<Subscription> {
        let now = Utc::now();
        let subscription = Subscription {
            id: Uuid::new_v4(),
            provider_subscription_id: object.id.clone(),
            provider_customer_id: object.customer.clone(),
            user_id: object
                .metadata
                .get("user_id")
                .and_then(|value| Uuid::parse_str(value).ok()),
            price_id: object.price_id(),
            status: status_override.unwrap_or_else(|| SubscriptionStatus::from_provider(&object.status)),
            current_period_end: object.period_end(),
            created_at: now,
            updated_at: now,
        };

        let stored = self.store.upsert_subscription(&subscription).await?;
        tracing::info!(
            subscription_id = %stored.provider_subscription_id,
            status = ?stored.status,
            "subscription upserted"
        );
        Ok(stored)
    }

    async fn cancel_subscription(&self, object: &SubscriptionObject) -> ArmoraResult<()> {
        if self.store.cancel_subscription(&object.id).await?.is_none() {
            // First sighting is a deletion; still record the final state.
            self.upsert_subscription(object, Some(SubscriptionStatus::Cancelled))
                .await?;
        }
        tracing::info!(subscription_id = %object.id, "subscription cancelled");
        Ok(())
    }
}

fn parse_object<T: serde::de::DeserializeOwned>(event: &WebhookEvent) -> ArmoraResult<T> {
    serde_json::from_value(event.data.object.clone()).map_err(|e| {
        ArmoraError::Validation(format!(
            "malformed {} object in event {}: {}",
            event.event_type, event.id, e
        ))
    })
}
