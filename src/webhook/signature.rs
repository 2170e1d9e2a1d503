//! Provider webhook signature verification
//!
//! Header format: `t=<unix seconds>,v1=<hex>[,v1=<hex>...]`. The signature is
//! HMAC-SHA256 over `"<t>.<raw body>"` keyed with the endpoint secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{ArmoraError, ArmoraResult};

type HmacSha256 = Hmac<Sha256>;

struct ParsedHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

fn parse_header(header: &str) -> ArmoraResult<ParsedHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse::<i64>().ok(),
            // Unparseable hex can never match, so it is skipped.
            "v1" => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| ArmoraError::InvalidSignature("missing timestamp".to_string()))?;
    if signatures.is_empty() {
        return Err(ArmoraError::InvalidSignature(
            "no v1 signature present".to_string(),
        ));
    }

    Ok(ParsedHeader {
        timestamp,
        signatures,
    })
}

/// Verify `payload` against `header`. A non-positive `tolerance_seconds`
/// disables the timestamp check.
pub fn verify(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_seconds: i64,
    now: i64,
) -> ArmoraResult<()> {
    let parsed = parse_header(header)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|err| ArmoraError::InvalidSignature(format!("invalid webhook secret: {err}")))?;
    mac.update(parsed.timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    // verify_slice compares in constant time and consumes the MAC.
    if !parsed
        .signatures
        .iter()
        .any(|candidate| mac.clone().verify_slice(candidate).is_ok())
    {
        return Err(ArmoraError::InvalidSignature(
            "signature mismatch".to_string(),
        ));
    }

    if tolerance_seconds > 0 && (now - parsed.timestamp).abs() > tolerance_seconds {
        return Err(ArmoraError::InvalidSignature(
            "timestamp outside tolerance".to_string(),
        ));
    }

    Ok(())
}
