//! Data-access layer for bookings, payments, subscriptions and the officer roster
//!
//! Handlers never talk to the database directly. Every write that can be
//! replayed by the payment provider is an absolute-state upsert keyed by a
//! provider id, so repeated deliveries converge on the same rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    Booking, BookingStatus, GeoPoint, PaymentRecord, PaymentStatus, ProtectionOfficer,
    Subscription,
};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A record with the same identity already exists.
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Storage backend used by the booking services.
///
/// Implementations must be `Send + Sync + 'static` so they can live in axum
/// application state behind an `Arc`.
#[async_trait]
pub trait BookingStore: Send + Sync + 'static {
    async fn insert_booking(&self, booking: &Booking) -> Result<Booking, StoreError>;

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError>;

    /// Overwrite both status columns. Returns `None` when the booking does not exist.
    async fn set_booking_status(
        &self,
        id: Uuid,
        status: BookingStatus,
        payment_status: PaymentStatus,
    ) -> Result<Option<Booking>, StoreError>;

    async fn get_payment_by_intent(
        &self,
        provider_intent_id: &str,
    ) -> Result<Option<PaymentRecord>, StoreError>;

    /// Insert or replace the record keyed by `provider_intent_id`.
    ///
    /// The stored `id` and `created_at` of an existing row are kept, and a
    /// `None` booking or user link never clears a stored one. A row that
    /// is already refunded only has its `updated_at` touched; the stored row is
    /// returned either way.
    async fn upsert_payment(&self, record: &PaymentRecord) -> Result<PaymentRecord, StoreError>;

    /// Insert or replace the subscription keyed by `provider_subscription_id`.
    async fn upsert_subscription(
        &self,
        subscription: &Subscription,
    ) -> Result<Subscription, StoreError>;

    async fn cancel_subscription(
        &self,
        provider_subscription_id: &str,
    ) -> Result<Option<Subscription>, StoreError>;

    /// Officers that may lie within `radius_km` of `center`.
    ///
    /// Backends may over-return (a bounding box, or the whole roster); callers
    /// apply the exact eligibility filter afterwards.
    async fn list_roster(
        &self,
        center: GeoPoint,
        radius_km: f64,
    ) -> Result<Vec<ProtectionOfficer>, StoreError>;

    async fn is_event_processed(&self, event_id: &str) -> Result<bool, StoreError>;

    async fn mark_event_processed(&self, event_id: &str, event_type: &str) -> Result<(), StoreError>;

    /// Succeeded payments with no linked booking.
    async fn list_orphaned_payments(&self) -> Result<Vec<PaymentRecord>, StoreError>;

    /// Bookings still `pending` that were created before `older_than`.
    async fn list_stale_pending_bookings(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError>;
}
