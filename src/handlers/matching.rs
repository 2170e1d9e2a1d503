use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::json_body;
use crate::auth::AuthenticatedUser;
use crate::error::{ArmoraError, ArmoraResult};
use crate::matching::{Candidate, MatchingService, SearchCriteria, TimeWindow};
use crate::models::{ApiResponse, GeoPoint, ProtectionLevel};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SearchCposRequest {
    #[validate(range(min = -90.0, max = 90.0, message = "latitude must be within ±90"))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "longitude must be within ±180"))]
    pub longitude: f64,
    pub protection_level: ProtectionLevel,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[validate(range(min = 0.0, max = 500.0))]
    pub max_distance: Option<f64>,
    #[validate(range(min = 0.0, max = 5.0))]
    pub min_rating: Option<f64>,
}

impl SearchCposRequest {
    fn into_criteria(self) -> ArmoraResult<SearchCriteria> {
        self.validate()?;
        if self.start_time >= self.end_time {
            return Err(ArmoraError::Validation(
                "startTime must be before endTime".to_string(),
            ));
        }

        let mut criteria = SearchCriteria::new(
            GeoPoint::new(self.latitude, self.longitude),
            self.protection_level,
            TimeWindow {
                start: self.start_time,
                end: self.end_time,
            },
        );
        if let Some(max_distance) = self.max_distance {
            criteria.max_distance_km = max_distance;
        }
        if let Some(min_rating) = self.min_rating {
            criteria.min_rating = min_rating;
        }
        Ok(criteria)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCposResponse {
    pub total_matches: usize,
    pub cpos: Vec<Candidate>,
    pub search_criteria: SearchCriteria,
}

/// Find available officers near a point, best first
pub async fn search_cpos(
    State(matching): State<Arc<MatchingService>>,
    user: AuthenticatedUser,
    payload: Result<Json<SearchCposRequest>, JsonRejection>,
) -> ArmoraResult<Json<ApiResponse<SearchCposResponse>>> {
    let criteria = json_body(payload)?.into_criteria()?;
    let cpos = matching.search(&criteria).await?;

    tracing::info!(
        user_id = %user.user_id,
        matches = cpos.len(),
        level = ?criteria.protection_level,
        "cpo search"
    );

    Ok(Json(ApiResponse::ok(SearchCposResponse {
        total_matches: cpos.len(),
        cpos,
        search_criteria: criteria,
    })))
}
