//! Fee split and client total for a booking charge
//!
//! All amounts are integer minor units. Percentages are applied with
//! round-half-up, and `platform_fee + officer_earnings == client_total` holds
//! for every breakdown this module produces.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ArmoraError, ArmoraResult};

pub const PLATFORM_FEE_PERCENT: i64 = 35;
pub const OFFICER_EARNINGS_PERCENT: i64 = 85;
pub const CLIENT_TOTAL_PERCENT: i64 = 120;
pub const VAT_PERCENT: i64 = 20;

/// Upper bound on a single charge (one million in major units).
pub const MAX_BASE_AMOUNT: i64 = 100_000_000;

/// Which computed total is charged to the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeBasis {
    /// base x 1.20, the total the platform/officer split is defined against
    #[default]
    FeeSplit,
    /// base + 20% VAT
    VatInclusive,
}

impl FromStr for ChargeBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fee_split" => Ok(ChargeBasis::FeeSplit),
            "vat_inclusive" => Ok(ChargeBasis::VatInclusive),
            other => Err(format!("unknown charge basis: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeBreakdown {
    pub base_amount: i64,
    pub platform_fee: i64,
    pub officer_earnings: i64,
    /// Amount actually charged to the client, per `charge_basis`.
    pub client_total: i64,
    pub fee_split_total: i64,
    pub vat: i64,
    pub vat_inclusive_total: i64,
    pub charge_basis: ChargeBasis,
}

fn percent_of(amount: i64, percent: i64) -> i64 {
    ((amount as i128 * percent as i128 + 50) / 100) as i64
}

/// Compute the breakdown for a positive `base_amount`.
///
/// The officer share is the remainder after the platform fee so the split
/// always sums to the charged total; it equals round(base x 0.85) except when
/// both percentages round up, where it is one minor unit lower.
pub fn calculate(base_amount: i64, basis: ChargeBasis) -> ArmoraResult<FeeBreakdown> {
    if base_amount <= 0 {
        return Err(ArmoraError::Validation(
            "amount must be a positive number of minor units".to_string(),
        ));
    }
    if base_amount > MAX_BASE_AMOUNT {
        return Err(ArmoraError::Validation(format!(
            "amount exceeds the maximum of {}",
            MAX_BASE_AMOUNT
        )));
    }

    let platform_fee = percent_of(base_amount, PLATFORM_FEE_PERCENT);
    let fee_split_total = percent_of(base_amount, CLIENT_TOTAL_PERCENT);
    let vat = percent_of(base_amount, VAT_PERCENT);
    let vat_inclusive_total = base_amount + vat;

    if fee_split_total != vat_inclusive_total {
        tracing::warn!(
            base_amount,
            fee_split_total,
            vat_inclusive_total,
            ?basis,
            "charge totals disagree"
        );
    }

    let client_total = match basis {
        ChargeBasis::FeeSplit => fee_split_total,
        ChargeBasis::VatInclusive => vat_inclusive_total,
    };

    Ok(FeeBreakdown {
        base_amount,
        platform_fee,
        officer_earnings: client_total - platform_fee,
        client_total,
        fee_split_total,
        vat,
        vat_inclusive_total,
        charge_basis: basis,
    })
}
