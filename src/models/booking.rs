//! Booking (protection assignment) records

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

/// Service tier requested for an assignment
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Hash)]
#[sqlx(type_name = "protection_level", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProtectionLevel {
    Essential,
    Executive,
    Shadow,
    ClientVehicle,
}

// Officers store their certified levels as `protection_level[]`.
impl sqlx::postgres::PgHasArrayType for ProtectionLevel {
    fn array_type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("_protection_level")
    }
}

/// Booking status
///
/// `pending -> confirmed -> in_progress -> completed`, with `payment_failed`
/// and `cancelled` as side branches.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    PaymentFailed,
    Cancelled,
}

impl BookingStatus {
    /// Statuses a paid booking is allowed to sit in.
    pub fn is_paid_state(self) -> bool {
        matches!(
            self,
            BookingStatus::Confirmed | BookingStatus::InProgress | BookingStatus::Completed
        )
    }
}

/// Payment status as seen from the booking
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "booking_payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

/// Booking model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub client_id: Uuid,
    pub protection_level: ProtectionLevel,
    pub pickup_address: String,
    pub pickup_latitude: Option<f64>,
    pub pickup_longitude: Option<f64>,
    pub dropoff_address: Option<String>,
    pub dropoff_latitude: Option<f64>,
    pub dropoff_longitude: Option<f64>,
    pub scheduled_at: DateTime<Utc>,
    pub estimated_duration_minutes: i32,
    pub estimated_distance_km: Option<f64>,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Address with optional coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[validate(length(min = 1, max = 500))]
    pub address: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
}

/// Booking details supplied by the client alongside a payment
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub protection_level: ProtectionLevel,
    #[validate]
    pub pickup: Location,
    #[validate]
    pub dropoff: Option<Location>,
    pub scheduled_at: DateTime<Utc>,
    #[validate(range(min = 1, max = 10080))]
    pub estimated_duration_minutes: i32,
    #[validate(range(min = 0.0))]
    pub estimated_distance_km: Option<f64>,
}

impl Booking {
    /// Build a booking record for `client_id` in the given state.
    pub fn from_request(
        client_id: Uuid,
        request: NewBooking,
        status: BookingStatus,
        payment_status: PaymentStatus,
    ) -> Self {
        let now = Utc::now();
        let (dropoff_address, dropoff_latitude, dropoff_longitude) = match request.dropoff {
            Some(dropoff) => (Some(dropoff.address), dropoff.latitude, dropoff.longitude),
            None => (None, None, None),
        };

        Self {
            id: Uuid::new_v4(),
            client_id,
            protection_level: request.protection_level,
            pickup_address: request.pickup.address,
            pickup_latitude: request.pickup.latitude,
            pickup_longitude: request.pickup.longitude,
            dropoff_address,
            dropoff_latitude,
            dropoff_longitude,
            scheduled_at: request.scheduled_at,
            estimated_duration_minutes: request.estimated_duration_minutes,
            estimated_distance_km: request.estimated_distance_km,
            status,
            payment_status,
            created_at: now,
            updated_at: now,
        }
    }
}
