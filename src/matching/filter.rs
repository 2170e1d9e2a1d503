//! Eligibility filter over an officer roster

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::distance_between;
use crate::models::{AvailabilityStatus, GeoPoint, ProtectionLevel, ProtectionOfficer};

pub const DEFAULT_MAX_DISTANCE_KM: f64 = 50.0;
pub const DEFAULT_MIN_RATING: f64 = 4.0;

/// Requested window for the assignment. `start < end` is the caller's
/// responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
    pub location: GeoPoint,
    pub protection_level: ProtectionLevel,
    pub time_window: TimeWindow,
    pub max_distance_km: f64,
    pub min_rating: f64,
}

impl SearchCriteria {
    pub fn new(location: GeoPoint, protection_level: ProtectionLevel, time_window: TimeWindow) -> Self {
        Self {
            location,
            protection_level,
            time_window,
            max_distance_km: DEFAULT_MAX_DISTANCE_KM,
            min_rating: DEFAULT_MIN_RATING,
        }
    }
}

/// An eligible officer annotated with its distance from the search point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(flatten)]
    pub officer: ProtectionOfficer,
    pub distance_km: f64,
}

/// Return every officer in `roster` that is available, certified for the
/// requested level, rated at least `min_rating`, licensed as of `now` and
/// within `max_distance_km`. Roster order is preserved.
pub fn find_candidates(
    criteria: &SearchCriteria,
    roster: &[ProtectionOfficer],
    now: DateTime<Utc>,
) -> Vec<Candidate> {
    roster
        .iter()
        .filter(|officer| officer.availability == AvailabilityStatus::Available)
        .filter(|officer| officer.supported_levels.contains(&criteria.protection_level))
        .filter(|officer| officer.rating >= criteria.min_rating)
        .filter(|officer| officer.license_expiry >= now)
        .filter_map(|officer| {
            let distance_km = distance_between(criteria.location, officer.location());
            // NaN never compares <=, so malformed coordinates drop out here
            (distance_km <= criteria.max_distance_km).then(|| Candidate {
                officer: officer.clone(),
                distance_km,
            })
        })
        .collect()
}
