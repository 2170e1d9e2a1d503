//! Close protection officer matching: eligibility filter and ranking

use std::sync::Arc;

use chrono::Utc;

use crate::error::ArmoraResult;
use crate::store::BookingStore;

pub mod filter;
pub mod ranker;

pub use filter::{
    find_candidates, Candidate, SearchCriteria, TimeWindow, DEFAULT_MAX_DISTANCE_KM,
    DEFAULT_MIN_RATING,
};
pub use ranker::rank;

pub struct MatchingService {
    store: Arc<dyn BookingStore>,
}

impl MatchingService {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    /// Eligible officers for `criteria`, best first.
    ///
    /// The roster is read fresh from the store on every call.
    pub async fn search(&self, criteria: &SearchCriteria) -> ArmoraResult<Vec<Candidate>> {
        let roster = self
            .store
            .list_roster(criteria.location, criteria.max_distance_km)
            .await?;
        let candidates = find_candidates(criteria, &roster, Utc::now());
        let ranked = rank(&candidates);

        tracing::debug!(
            roster = roster.len(),
            matches = ranked.len(),
            level = ?criteria.protection_level,
            "officer search completed"
        );

        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AvailabilityStatus, GeoPoint, ProtectionLevel};
    use crate::store::MemoryStore;
    use crate::test_support::officer;
    use chrono::Duration;

    fn window() -> TimeWindow {
        let start = Utc::now() + Duration::hours(2);
        TimeWindow {
            start,
            end: start + Duration::hours(4),
        }
    }

    #[tokio::test]
    async fn test_search_filters_and_ranks() {
        let mut offline = officer("offline", 51.5074, -0.1278, 5.0);
        offline.availability = AvailabilityStatus::Offline;
        let store = Arc::new(MemoryStore::with_roster(vec![
            officer("near_good", 51.5080, -0.1270, 4.6),
            officer("paris", 48.8566, 2.3522, 5.0),
            offline,
            officer("best", 51.5200, -0.1000, 4.9),
            officer("low", 51.5075, -0.1279, 3.5),
        ]));
        let service = MatchingService::new(store);

        let criteria = SearchCriteria::new(
            GeoPoint::new(51.5074, -0.1278),
            ProtectionLevel::Executive,
            window(),
        );
        let results = service.search(&criteria).await.unwrap();

        let names: Vec<&str> = results
            .iter()
            .map(|c| c.officer.display_name.as_str())
            .collect();
        assert_eq!(names, vec!["best", "near_good"]);
    }

    #[tokio::test]
    async fn test_search_empty_roster() {
        let service = MatchingService::new(Arc::new(MemoryStore::new()));
        let criteria = SearchCriteria::new(
            GeoPoint::new(0.0, 0.0),
            ProtectionLevel::Essential,
            window(),
        );
        assert!(service.search(&criteria).await.unwrap().is_empty());
    }
}
