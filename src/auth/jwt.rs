//! Bearer token verification (HS256)

use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ArmoraError, ArmoraResult};

/// Claims issued by the identity provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl Claims {
    pub fn user_id(&self) -> ArmoraResult<Uuid> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| ArmoraError::Auth("token subject is not a user id".to_string()))
    }
}

/// Decode `token` and check its signature and expiry.
pub fn verify_token(token: &str, secret: &str) -> ArmoraResult<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    // Identity-provider tokens carry an audience we do not pin.
    validation.validate_aud = false;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => ArmoraError::Auth("token has expired".to_string()),
        _ => ArmoraError::Auth(format!("invalid token: {}", e)),
    })
}
