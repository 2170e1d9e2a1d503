//! Payment records keyed by provider intent id

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "payment_record_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentRecordStatus {
    Pending,
    Succeeded,
    Failed,
    Refunded,
}

/// One row per provider payment intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: Uuid,
    pub provider_intent_id: String,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentRecordStatus,
    pub payment_method_type: Option<String>,
    pub booking_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    pub fn new(provider_intent_id: impl Into<String>, amount: i64, currency: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            provider_intent_id: provider_intent_id.into(),
            amount,
            currency: currency.into(),
            status: PaymentRecordStatus::Pending,
            payment_method_type: None,
            booking_id: None,
            user_id: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Refunded records are frozen apart from their timestamps.
    pub fn is_frozen(&self) -> bool {
        self.status == PaymentRecordStatus::Refunded
    }
}
