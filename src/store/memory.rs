//! In-process store used for local development and tests

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{BookingStore, StoreError};
use crate::models::{
    Booking, BookingStatus, GeoPoint, PaymentRecord, PaymentRecordStatus, PaymentStatus,
    ProtectionOfficer, Subscription, SubscriptionStatus,
};

#[derive(Default)]
struct Inner {
    bookings: HashMap<Uuid, Booking>,
    payments: HashMap<String, PaymentRecord>,
    subscriptions: HashMap<String, Subscription>,
    roster: Vec<ProtectionOfficer>,
    processed_events: HashSet<String>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roster(roster: Vec<ProtectionOfficer>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                roster,
                ..Inner::default()
            }),
        }
    }

    pub async fn payment_count(&self) -> usize {
        self.inner.read().await.payments.len()
    }

    pub async fn booking_count(&self) -> usize {
        self.inner.read().await.bookings.len()
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn insert_booking(&self, booking: &Booking) -> Result<Booking, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.bookings.contains_key(&booking.id) {
            return Err(StoreError::Conflict(format!("booking {} already exists", booking.id)));
        }
        inner.bookings.insert(booking.id, booking.clone());
        Ok(booking.clone())
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        Ok(self.inner.read().await.bookings.get(&id).cloned())
    }

    async fn set_booking_status(
        &self,
        id: Uuid,
        status: BookingStatus,
        payment_status: PaymentStatus,
    ) -> Result<Option<Booking>, StoreError> {
        let mut inner = self.inner.write().await;
        Ok(inner.bookings.get_mut(&id).map(|booking| {
            booking.status = status;
            booking.payment_status = payment_status;
            booking.updated_at = Utc::now();
            booking.clone()
        }))
    }

    async fn get_payment_by_intent(
        &self,
        provider_intent_id: &str,
    ) -> Result<Option<PaymentRecord>, StoreError> {
        Ok(self.inner.read().await.payments.get(provider_intent_id).cloned())
    }

    async fn upsert_payment(&self, record: &PaymentRecord) -> Result<PaymentRecord, StoreError> {
        let mut inner = self.inner.write().await;
        let stored = match inner.payments.get(&record.provider_intent_id) {
            Some(existing) if existing.is_frozen() => PaymentRecord {
                updated_at: Utc::now(),
                ..existing.clone()
            },
            Some(existing) => PaymentRecord {
                id: existing.id,
                booking_id: record.booking_id.or(existing.booking_id),
                user_id: record.user_id.or(existing.user_id),
                created_at: existing.created_at,
                updated_at: Utc::now(),
                ..record.clone()
            },
            None => record.clone(),
        };
        inner
            .payments
            .insert(stored.provider_intent_id.clone(), stored.clone());
        Ok(stored)
    }

    async fn upsert_subscription(
        &self,
        subscription: &Subscription,
    ) -> Result<Subscription, StoreError> {
        let mut inner = self.inner.write().await;
        let stored = match inner.subscriptions.get(&subscription.provider_subscription_id) {
            Some(existing) => Subscription {
                id: existing.id,
                user_id: subscription.user_id.or(existing.user_id),
                created_at: existing.created_at,
                updated_at: Utc::now(),
                ..subscription.clone()
            },
            None => subscription.clone(),
        };
        inner
            .subscriptions
            .insert(stored.provider_subscription_id.clone(), stored.clone());
        Ok(stored)
    }

    async fn cancel_subscription(
        &self,
        provider_subscription_id: &str,
    ) -> Result<Option<Subscription>, StoreError> {
        let mut inner = self.inner.write().await;
        Ok(inner
            .subscriptions
            .get_mut(provider_subscription_id)
            .map(|subscription| {
                subscription.status = SubscriptionStatus::Cancelled;
                subscription.updated_at = Utc::now();
                subscription.clone()
            }))
    }

    async fn list_roster(
        &self,
        _center: GeoPoint,
        _radius_km: f64,
    ) -> Result<Vec<ProtectionOfficer>, StoreError> {
        Ok(self.inner.read().await.roster.clone())
    }

    async fn is_event_processed(&self, event_id: &str) -> Result<bool, StoreError> {
        Ok(self.inner.read().await.processed_events.contains(event_id))
    }

    async fn mark_event_processed(&self, event_id: &str, _event_type: &str) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .processed_events
            .insert(event_id.to_string());
        Ok(())
    }

    async fn list_orphaned_payments(&self) -> Result<Vec<PaymentRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .payments
            .values()
            .filter(|p| p.status == PaymentRecordStatus::Succeeded && p.booking_id.is_none())
            .cloned()
            .collect())
    }

    async fn list_stale_pending_bookings(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .bookings
            .values()
            .filter(|b| b.status == BookingStatus::Pending && b.created_at < older_than)
            .cloned()
            .collect())
    }
}
