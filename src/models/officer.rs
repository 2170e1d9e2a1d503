//! Close protection officer roster (read model)

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

use super::ProtectionLevel;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "availability_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityStatus {
    Available,
    Busy,
    Offline,
}

/// Officer as sourced from the external roster. Never mutated by this service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProtectionOfficer {
    pub id: Uuid,
    pub display_name: String,
    pub rating: f64,
    pub completed_assignments: i32,
    pub supported_levels: Vec<ProtectionLevel>,
    pub license_number: String,
    pub license_expiry: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub hourly_rate: i64,
    pub availability: AvailabilityStatus,
}

impl ProtectionOfficer {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}
