//! Data models for the Armora booking core

use serde::{Deserialize, Serialize};

pub mod booking;
pub mod officer;
pub mod payment;
pub mod subscription;

pub use booking::{Booking, BookingStatus, Location, NewBooking, PaymentStatus, ProtectionLevel};
pub use officer::{AvailabilityStatus, GeoPoint, ProtectionOfficer};
pub use payment::{PaymentRecord, PaymentRecordStatus};
pub use subscription::{Subscription, SubscriptionStatus};

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    pub fn failure(code: &str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            code: Some(code.to_string()),
        }
    }
}
