use std::env;
use std::time::Duration;

use crate::payments::fees::ChargeBasis;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: [u8; 4],
    pub port: u16,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub stripe_secret_key: String,
    pub stripe_api_base: String,
    pub stripe_webhook_secret: Option<String>,
    pub webhook_tolerance_seconds: i64,
    pub jwt_secret: String,
    pub cors_allowed_origins: Vec<String>,
    pub charge_basis: ChargeBasis,
    pub default_currency: String,
    pub provider_timeout: Duration,
    pub reconcile_interval: Duration,
    pub reconcile_pending_after: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let charge_basis = match get("CHARGE_BASIS") {
            Some(value) => value.parse::<ChargeBasis>().map_err(|_| ConfigError::Invalid {
                key: "CHARGE_BASIS",
                value,
            })?,
            None => ChargeBasis::default(),
        };

        let host = match get("HOST") {
            Some(value) => parse_ipv4(&value).ok_or(ConfigError::Invalid { key: "HOST", value })?,
            None => [127, 0, 0, 1],
        };

        Ok(Self {
            host,
            port: parse_or(get("PORT"), "PORT", 3001)?,
            database_url: get("DATABASE_URL"),
            database_max_connections: parse_or(
                get("DATABASE_MAX_CONNECTIONS"),
                "DATABASE_MAX_CONNECTIONS",
                10,
            )?,
            stripe_secret_key: required("STRIPE_SECRET_KEY")?,
            stripe_api_base: get("STRIPE_API_BASE")
                .unwrap_or_else(|| "https://api.stripe.com".to_string()),
            stripe_webhook_secret: get("STRIPE_WEBHOOK_SECRET"),
            webhook_tolerance_seconds: parse_or(
                get("WEBHOOK_TOLERANCE_SECONDS"),
                "WEBHOOK_TOLERANCE_SECONDS",
                300,
            )?,
            jwt_secret: required("JWT_SECRET")?,
            cors_allowed_origins: get("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|| "http://localhost:3000".to_string())
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            charge_basis,
            default_currency: get("DEFAULT_CURRENCY")
                .map(|c| c.to_lowercase())
                .unwrap_or_else(|| "gbp".to_string()),
            provider_timeout: Duration::from_secs(parse_or(
                get("PROVIDER_TIMEOUT_SECONDS"),
                "PROVIDER_TIMEOUT_SECONDS",
                30,
            )?),
            reconcile_interval: Duration::from_secs(parse_or(
                get("RECONCILE_INTERVAL_SECONDS"),
                "RECONCILE_INTERVAL_SECONDS",
                900,
            )?),
            reconcile_pending_after: Duration::from_secs(parse_or(
                get("RECONCILE_PENDING_AFTER_SECONDS"),
                "RECONCILE_PENDING_AFTER_SECONDS",
                3600,
            )?),
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

fn parse_ipv4(value: &str) -> Option<[u8; 4]> {
    value
        .trim()
        .parse::<std::net::Ipv4Addr>()
        .ok()
        .map(|addr| addr.octets())
}
