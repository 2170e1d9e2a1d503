//! Authentication for Armora
//!
//! Requests carry a bearer token issued by the identity provider. Handlers
//! that take an [`AuthenticatedUser`] reject anything without a valid one.

mod jwt;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::ArmoraError;

pub use jwt::{verify_token, Claims};

/// Caller identity taken from a verified bearer token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub claims: Claims,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ArmoraError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ArmoraError::Auth("missing bearer token".to_string()))?;

        let claims = verify_token(bearer.token(), &state.jwt_secret)?;
        let user_id = claims.user_id()?;

        Ok(Self { user_id, claims })
    }
}
