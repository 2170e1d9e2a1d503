//! Provider event envelope and the objects the router reads from it

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

pub const PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";
pub const PAYMENT_FAILED: &str = "payment_intent.payment_failed";
pub const CHARGE_REFUNDED: &str = "charge.refunded";
pub const SUBSCRIPTION_CREATED: &str = "customer.subscription.created";
pub const SUBSCRIPTION_UPDATED: &str = "customer.subscription.updated";
pub const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

/// Routing decision for an event type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    PaymentSucceeded,
    PaymentFailed,
    Refunded,
    SubscriptionUpserted,
    SubscriptionCancelled,
    Unknown,
}

impl EventKind {
    pub fn from_type(event_type: &str) -> Self {
        match event_type {
            PAYMENT_SUCCEEDED => EventKind::PaymentSucceeded,
            PAYMENT_FAILED => EventKind::PaymentFailed,
            CHARGE_REFUNDED => EventKind::Refunded,
            SUBSCRIPTION_CREATED | SUBSCRIPTION_UPDATED => EventKind::SubscriptionUpserted,
            SUBSCRIPTION_DELETED => EventKind::SubscriptionCancelled,
            _ => EventKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChargeObject {
    pub id: String,
    #[serde(default)]
    pub payment_intent: Option<String>,
    pub amount: i64,
    #[serde(default)]
    pub amount_refunded: i64,
    pub currency: String,
    #[serde(default)]
    pub refunded: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionObject {
    pub id: String,
    pub customer: String,
    pub status: String,
    #[serde(default)]
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub items: Option<SubscriptionItems>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionItems {
    #[serde(default)]
    pub data: Vec<SubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionItem {
    #[serde(default)]
    pub price: Option<PriceRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceRef {
    pub id: String,
}

impl SubscriptionObject {
    pub fn price_id(&self) -> Option<String> {
        self.items
            .as_ref()
            .and_then(|items| items.data.first())
            .and_then(|item| item.price.as_ref())
            .map(|price| price.id.clone())
    }

    pub fn period_end(&self) -> Option<DateTime<Utc>> {
        self.current_period_end
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_routing() {
        assert_eq!(EventKind::from_type(PAYMENT_SUCCEEDED), EventKind::PaymentSucceeded);
        assert_eq!(EventKind::from_type(SUBSCRIPTION_UPDATED), EventKind::SubscriptionUpserted);
        assert_eq!(EventKind::from_type("invoice.paid"), EventKind::Unknown);
    }

    #[test]
    fn test_subscription_object_fields() {
        let sub: SubscriptionObject = serde_json::from_value(serde_json::json!({
            "id": "sub_1",
            "customer": "cus_1",
            "status": "active",
            "current_period_end": 1_767_225_600,
            "items": { "data": [ { "price": { "id": "price_gold" } } ] }
        }))
        .unwrap();

        assert_eq!(sub.price_id().as_deref(), Some("price_gold"));
        assert_eq!(sub.period_end().unwrap().timestamp(), 1_767_225_600);
        assert!(sub.metadata.is_empty());
    }
}
