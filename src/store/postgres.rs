//! Postgres-backed store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use super::{BookingStore, StoreError};
use crate::geo::bounding_box;
use crate::models::{
    AvailabilityStatus, Booking, BookingStatus, GeoPoint, PaymentRecord, PaymentStatus,
    ProtectionOfficer, Subscription, SubscriptionStatus,
};

pub struct PgStore {
    db_pool: PgPool,
}

impl PgStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Connect and apply pending migrations.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let db_pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&db_pool).await?;
        tracing::info!("database migrations applied");

        Ok(Self::new(db_pool))
    }
}

#[async_trait]
impl BookingStore for PgStore {
    async fn insert_booking(&self, booking: &Booking) -> Result<Booking, StoreError> {
        let inserted = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (
                id, client_id, protection_level, pickup_address, pickup_latitude,
                pickup_longitude, dropoff_address, dropoff_latitude, dropoff_longitude,
                scheduled_at, estimated_duration_minutes, estimated_distance_km,
                status, payment_status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *
            "#,
        )
        .bind(booking.id)
        .bind(booking.client_id)
        .bind(booking.protection_level)
        .bind(&booking.pickup_address)
        .bind(booking.pickup_latitude)
        .bind(booking.pickup_longitude)
        .bind(&booking.dropoff_address)
        .bind(booking.dropoff_latitude)
        .bind(booking.dropoff_longitude)
        .bind(booking.scheduled_at)
        .bind(booking.estimated_duration_minutes)
        .bind(booking.estimated_distance_km)
        .bind(booking.status)
        .bind(booking.payment_status)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .fetch_one(&self.db_pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(format!("booking {} already exists", booking.id))
            }
            other => StoreError::Database(other),
        })?;

        Ok(inserted)
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?;

        Ok(booking)
    }

    async fn set_booking_status(
        &self,
        id: Uuid,
        status: BookingStatus,
        payment_status: PaymentStatus,
    ) -> Result<Option<Booking>, StoreError> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET status = $1, payment_status = $2, updated_at = $3
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(status)
        .bind(payment_status)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(booking)
    }

    async fn get_payment_by_intent(
        &self,
        provider_intent_id: &str,
    ) -> Result<Option<PaymentRecord>, StoreError> {
        let record = sqlx::query_as::<_, PaymentRecord>(
            "SELECT * FROM payment_records WHERE provider_intent_id = $1",
        )
        .bind(provider_intent_id)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(record)
    }

    async fn upsert_payment(&self, record: &PaymentRecord) -> Result<PaymentRecord, StoreError> {
        let upserted = sqlx::query_as::<_, PaymentRecord>(
            r#"
            INSERT INTO payment_records (
                id, provider_intent_id, amount, currency, status, payment_method_type,
                booking_id, user_id, error_message, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (provider_intent_id) DO UPDATE SET
                amount = EXCLUDED.amount,
                currency = EXCLUDED.currency,
                status = EXCLUDED.status,
                payment_method_type = EXCLUDED.payment_method_type,
                booking_id = COALESCE(EXCLUDED.booking_id, payment_records.booking_id),
                user_id = COALESCE(EXCLUDED.user_id, payment_records.user_id),
                error_message = EXCLUDED.error_message,
                updated_at = EXCLUDED.updated_at
            WHERE payment_records.status <> 'refunded'
            RETURNING *
            "#,
        )
        .bind(record.id)
        .bind(&record.provider_intent_id)
        .bind(record.amount)
        .bind(&record.currency)
        .bind(record.status)
        .bind(&record.payment_method_type)
        .bind(record.booking_id)
        .bind(record.user_id)
        .bind(&record.error_message)
        .bind(record.created_at)
        .bind(Utc::now())
        .fetch_optional(&self.db_pool)
        .await?;

        if let Some(upserted) = upserted {
            return Ok(upserted);
        }

        // Conflict with a refunded row: only the timestamp moves.
        let frozen = sqlx::query_as::<_, PaymentRecord>(
            r#"
            UPDATE payment_records
            SET updated_at = $1
            WHERE provider_intent_id = $2
            RETURNING *
            "#,
        )
        .bind(Utc::now())
        .bind(&record.provider_intent_id)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(frozen)
    }

    async fn upsert_subscription(
        &self,
        subscription: &Subscription,
    ) -> Result<Subscription, StoreError> {
        let upserted = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (
                id, provider_subscription_id, provider_customer_id, user_id, price_id,
                status, current_period_end, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (provider_subscription_id) DO UPDATE SET
                provider_customer_id = EXCLUDED.provider_customer_id,
                user_id = COALESCE(EXCLUDED.user_id, subscriptions.user_id),
                price_id = EXCLUDED.price_id,
                status = EXCLUDED.status,
                current_period_end = EXCLUDED.current_period_end,
                updated_at = EXCLUDED.updated_at
            RETURNING *
            "#,
        )
        .bind(subscription.id)
        .bind(&subscription.provider_subscription_id)
        .bind(&subscription.provider_customer_id)
        .bind(subscription.user_id)
        .bind(&subscription.price_id)
        .bind(subscription.status)
        .bind(subscription.current_period_end)
        .bind(subscription.created_at)
        .bind(Utc::now())
        .fetch_one(&self.db_pool)
        .await?;

        Ok(upserted)
    }

    async fn cancel_subscription(
        &self,
        provider_subscription_id: &str,
    ) -> Result<Option<Subscription>, StoreError> {
        let cancelled = sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions
            SET status = $1, updated_at = $2
            WHERE provider_subscription_id = $3
            RETURNING *
            "#,
        )
        .bind(SubscriptionStatus::Cancelled)
        .bind(Utc::now())
        .bind(provider_subscription_id)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(cancelled)
    }

    async fn list_roster(
        &self,
        center: GeoPoint,
        radius_km: f64,
    ) -> Result<Vec<ProtectionOfficer>, StoreError> {
        let (lat_delta, lon_delta) = bounding_box(center, radius_km);

        let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT * FROM protection_officers WHERE availability = ");
        query_builder.push_bind(AvailabilityStatus::Available);

        query_builder.push(" AND latitude BETWEEN ");
        query_builder.push_bind(center.lat - lat_delta);
        query_builder.push(" AND ");
        query_builder.push_bind(center.lat + lat_delta);

        // A box crossing the antimeridian is left unbounded in longitude.
        let (min_lon, max_lon) = (center.lon - lon_delta, center.lon + lon_delta);
        if min_lon >= -180.0 && max_lon <= 180.0 {
            query_builder.push(" AND longitude BETWEEN ");
            query_builder.push_bind(min_lon);
            query_builder.push(" AND ");
            query_builder.push_bind(max_lon);
        }

        query_builder.push(" ORDER BY id");

        let officers = query_builder
            .build_query_as::<ProtectionOfficer>()
            .fetch_all(&self.db_pool)
            .await?;

        Ok(officers)
    }

    async fn is_event_processed(&self, event_id: &str) -> Result<bool, StoreError> {
        let processed = sqlx::query_as::<_, (bool,)>(
            "SELECT EXISTS (SELECT 1 FROM processed_webhook_events WHERE event_id = $1)",
        )
        .bind(event_id)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(processed.0)
    }

    async fn mark_event_processed(&self, event_id: &str, event_type: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO processed_webhook_events (event_id, event_type, processed_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(event_type)
        .bind(Utc::now())
        .execute(&self.db_pool)
        .await?;

        Ok(())
    }

    async fn list_orphaned_payments(&self) -> Result<Vec<PaymentRecord>, StoreError> {
        let records = sqlx::query_as::<_, PaymentRecord>(
            r#"
            SELECT * FROM payment_records
            WHERE status = 'succeeded' AND booking_id IS NULL
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.db_pool)
        .await?;

        Ok(records)
    }

    async fn list_stale_pending_bookings(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError> {
        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE status = 'pending' AND created_at < $1
            ORDER BY created_at
            "#,
        )
        .bind(older_than)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(bookings)
    }
}
