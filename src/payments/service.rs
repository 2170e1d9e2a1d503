//! Payment service layer - intent creation, confirmation and provider-driven
//! state transitions

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::fees::{self, ChargeBasis, FeeBreakdown};
use super::provider::{IntentRequest, PaymentProvider, ProviderIntent};
use crate::error::{ArmoraError, ArmoraResult};
use crate::models::{
    Booking, BookingStatus, NewBooking, PaymentRecord, PaymentRecordStatus, PaymentStatus,
};
use crate::store::BookingStore;

/// Provider metadata limits (key count, key length, value length)
const MAX_METADATA_KEYS: usize = 40;
const MAX_METADATA_KEY_LEN: usize = 40;
const MAX_METADATA_VALUE_LEN: usize = 500;

/// Metadata keys the server sets itself; client values for them are dropped.
const RESERVED_METADATA_KEYS: [&str; 5] = [
    "booking_id",
    "user_id",
    "base_amount",
    "platform_fee",
    "officer_earnings",
];

#[derive(Debug, Clone, Default)]
pub struct CreateIntentInput {
    pub amount: i64,
    pub currency: Option<String>,
    pub assignment_id: Option<Uuid>,
    pub booking: Option<NewBooking>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedIntent {
    pub client_secret: Option<String>,
    pub provider_intent_id: String,
    pub amount: i64,
    pub currency: String,
    pub booking_id: Option<Uuid>,
    pub breakdown: FeeBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    pub payment: PaymentRecord,
    pub assignment: Option<Booking>,
}

/// Fully refunded provider charge
#[derive(Debug, Clone, PartialEq)]
pub struct RefundNotice {
    pub provider_intent_id: String,
    pub amount: i64,
    pub currency: String,
}

pub struct PaymentService {
    store: Arc<dyn BookingStore>,
    provider: Arc<dyn PaymentProvider>,
    charge_basis: ChargeBasis,
    default_currency: String,
}

impl PaymentService {
    pub fn new(
        store: Arc<dyn BookingStore>,
        provider: Arc<dyn PaymentProvider>,
        charge_basis: ChargeBasis,
        default_currency: String,
    ) -> Self {
        Self {
            store,
            provider,
            charge_basis,
            default_currency,
        }
    }

    /// Fee breakdown for `amount` without contacting the provider
    pub fn quote(&self, amount: i64) -> ArmoraResult<FeeBreakdown> {
        fees::calculate(amount, self.charge_basis)
    }

    /// Request a provider intent for the client total and record it as pending.
    ///
    /// Nothing is written unless the provider call succeeds.
    pub async fn create_intent(
        &self,
        user_id: Uuid,
        input: CreateIntentInput,
    ) -> ArmoraResult<CreatedIntent> {
        let breakdown = fees::calculate(input.amount, self.charge_basis)?;
        let currency = normalize_currency(input.currency.as_deref(), &self.default_currency)?;

        if input.assignment_id.is_some() && input.booking.is_some() {
            return Err(ArmoraError::Validation(
                "provide either assignmentId or booking, not both".to_string(),
            ));
        }

        // Booking to link: an existing one, or a new pending one built up front
        // so its id can travel in the provider metadata.
        let existing_booking = match input.assignment_id {
            Some(id) => Some(self.owned_booking(id, user_id).await?),
            None => None,
        };
        let new_booking = match input.booking {
            Some(request) => {
                request.validate()?;
                Some(Booking::from_request(
                    user_id,
                    request,
                    BookingStatus::Pending,
                    PaymentStatus::Pending,
                ))
            }
            None => None,
        };
        let booking_id = existing_booking
            .as_ref()
            .or(new_booking.as_ref())
            .map(|b| b.id);

        let mut metadata = flatten_metadata(input.metadata)?;
        metadata.retain(|key, _| !RESERVED_METADATA_KEYS.contains(&key.as_str()));
        metadata.insert("user_id".to_string(), user_id.to_string());
        metadata.insert("base_amount".to_string(), breakdown.base_amount.to_string());
        metadata.insert("platform_fee".to_string(), breakdown.platform_fee.to_string());
        metadata.insert(
            "officer_earnings".to_string(),
            breakdown.officer_earnings.to_string(),
        );
        if let Some(id) = booking_id {
            metadata.insert("booking_id".to_string(), id.to_string());
        }

        let intent = self
            .provider
            .create_intent(&IntentRequest {
                amount: breakdown.client_total,
                currency: currency.clone(),
                description: Some("Armora protection booking".to_string()),
                metadata,
            })
            .await
            .map_err(|e| {
                tracing::error!(error = %e, amount = breakdown.client_total, "intent creation failed");
                ArmoraError::PaymentProviderUnavailable(e.to_string())
            })?;

        if let Some(booking) = &new_booking {
            self.store.insert_booking(booking).await?;
        }

        let mut record = PaymentRecord::new(&intent.id, breakdown.client_total, &currency);
        record.booking_id = booking_id;
        record.user_id = Some(user_id);
        record.payment_method_type = intent.payment_method_type();
        let record = self.store.upsert_payment(&record).await?;

        tracing::info!(
            provider_intent_id = %record.provider_intent_id,
            amount = record.amount,
            booking_id = ?record.booking_id,
            "payment intent created"
        );

        Ok(CreatedIntent {
            client_secret: intent.client_secret,
            provider_intent_id: intent.id,
            amount: breakdown.client_total,
            currency,
            booking_id,
            breakdown,
        })
    }

    /// Confirm a payment the client completed.
    ///
    /// Safe to repeat for the same intent: the record is upserted, a booking is
    /// only created while the record has none linked, and a linked booking is
    /// moved to confirmed/paid.
    pub async fn confirm(
        &self,
        provider_intent_id: &str,
        user_id: Uuid,
        booking_data: Option<NewBooking>,
    ) -> ArmoraResult<Confirmation> {
        validate_intent_id(provider_intent_id)?;
        if let Some(data) = &booking_data {
            data.validate()?;
        }

        let intent = self
            .provider
            .retrieve_intent(provider_intent_id)
            .await
            .map_err(|e| ArmoraError::PaymentProviderUnavailable(e.to_string()))?;

        // Another client's payment reads as absent.
        let existing = self.store.get_payment_by_intent(provider_intent_id).await?;
        let owner = existing
            .as_ref()
            .and_then(|record| record.user_id)
            .or_else(|| metadata_uuid(&intent, "user_id"));
        if owner.is_some_and(|owner| owner != user_id) {
            tracing::warn!(provider_intent_id, %user_id, "confirmation refused, payment owned by another user");
            return Err(ArmoraError::NotFound(format!("payment {}", provider_intent_id)));
        }

        if !intent.is_succeeded() {
            tracing::info!(
                provider_intent_id,
                status = %intent.status,
                "confirmation refused, payment not completed"
            );
            return Err(ArmoraError::PaymentNotCompleted {
                status: intent.status,
            });
        }

        let payment = self.record_succeeded(&intent, Some(user_id)).await?;
        if payment.is_frozen() {
            return self.with_linked_booking(payment).await;
        }

        match (booking_data, payment.booking_id) {
            (Some(data), None) => {
                let booking = Booking::from_request(
                    user_id,
                    data,
                    BookingStatus::Confirmed,
                    PaymentStatus::Paid,
                );
                let booking = self.store.insert_booking(&booking).await?;

                let linked = PaymentRecord {
                    booking_id: Some(booking.id),
                    ..payment
                };
                let payment = self.store.upsert_payment(&linked).await?;
                tracing::info!(booking_id = %booking.id, provider_intent_id, "booking created on confirmation");

                Ok(Confirmation {
                    payment,
                    assignment: Some(booking),
                })
            }
            (_, Some(booking_id)) => {
                let assignment = self.confirm_linked_booking(booking_id).await?;
                Ok(Confirmation { payment, assignment })
            }
            (None, None) => {
                tracing::warn!(provider_intent_id, "payment confirmed with no booking");
                Ok(Confirmation {
                    payment,
                    assignment: None,
                })
            }
        }
    }

    /// Provider reported success asynchronously.
    pub async fn apply_payment_succeeded(&self, intent: &ProviderIntent) -> ArmoraResult<Confirmation> {
        let payment = self.record_succeeded(intent, None).await?;
        if payment.is_frozen() {
            return self.with_linked_booking(payment).await;
        }

        let assignment = match payment.booking_id {
            Some(booking_id) => self.confirm_linked_booking(booking_id).await?,
            None => {
                tracing::warn!(provider_intent_id = %intent.id, "orphaned payment, no booking linked");
                None
            }
        };

        Ok(Confirmation { payment, assignment })
    }

    /// Provider reported a failed attempt.
    ///
    /// A record that already succeeded or was refunded is left alone, so a
    /// late or replayed failure never downgrades a paid booking.
    pub async fn apply_payment_failed(&self, intent: &ProviderIntent) -> ArmoraResult<Confirmation> {
        let existing = self.store.get_payment_by_intent(&intent.id).await?;
        let record = match existing {
            Some(existing)
                if matches!(
                    existing.status,
                    PaymentRecordStatus::Succeeded | PaymentRecordStatus::Refunded
                ) =>
            {
                tracing::info!(provider_intent_id = %intent.id, status = ?existing.status, "ignoring failure for settled payment");
                return self.with_linked_booking(existing).await;
            }
            Some(existing) => PaymentRecord {
                status: PaymentRecordStatus::Failed,
                error_message: intent.failure_message(),
                ..existing
            },
            None => {
                let mut record = PaymentRecord::new(&intent.id, intent.amount, &intent.currency);
                record.status = PaymentRecordStatus::Failed;
                record.error_message = intent.failure_message();
                record.payment_method_type = intent.payment_method_type();
                record.booking_id = self.booking_hint(intent).await?;
                record.user_id = metadata_uuid(intent, "user_id");
                record
            }
        };
        let payment = self.store.upsert_payment(&record).await?;

        let assignment = match payment.booking_id {
            Some(booking_id) => match self.store.get_booking(booking_id).await? {
                Some(booking)
                    if matches!(
                        booking.status,
                        BookingStatus::Pending | BookingStatus::PaymentFailed
                    ) =>
                {
                    self.store
                        .set_booking_status(
                            booking_id,
                            BookingStatus::PaymentFailed,
                            PaymentStatus::Failed,
                        )
                        .await?
                }
                other => other,
            },
            None => None,
        };

        tracing::warn!(
            provider_intent_id = %intent.id,
            error = ?payment.error_message,
            "payment failed"
        );

        Ok(Confirmation { payment, assignment })
    }

    /// Provider reported a full refund. The record is frozen afterwards.
    pub async fn apply_refund(&self, refund: &RefundNotice) -> ArmoraResult<Confirmation> {
        let record = match self.store.get_payment_by_intent(&refund.provider_intent_id).await? {
            Some(existing) => PaymentRecord {
                status: PaymentRecordStatus::Refunded,
                ..existing
            },
            None => {
                let mut record =
                    PaymentRecord::new(&refund.provider_intent_id, refund.amount, &refund.currency);
                record.status = PaymentRecordStatus::Refunded;
                record
            }
        };
        let payment = self.store.upsert_payment(&record).await?;

        let assignment = match payment.booking_id {
            Some(booking_id) => {
                self.store
                    .set_booking_status(booking_id, BookingStatus::Cancelled, PaymentStatus::Refunded)
                    .await?
            }
            None => None,
        };

        tracing::info!(provider_intent_id = %refund.provider_intent_id, "payment refunded");

        Ok(Confirmation { payment, assignment })
    }

    /// Booking owned by `user_id`. Other clients' bookings read as absent.
    pub async fn owned_booking(&self, booking_id: Uuid, user_id: Uuid) -> ArmoraResult<Booking> {
        match self.store.get_booking(booking_id).await? {
            Some(booking) if booking.client_id == user_id => Ok(booking),
            _ => Err(ArmoraError::NotFound(format!("booking {}", booking_id))),
        }
    }

    // ===== Private Helper Methods =====

    /// Upsert the record for `intent` as succeeded, keeping anything already
    /// known about it. Refunded records come back unchanged.
    async fn record_succeeded(
        &self,
        intent: &ProviderIntent,
        user_id: Option<Uuid>,
    ) -> ArmoraResult<PaymentRecord> {
        let record = match self.store.get_payment_by_intent(&intent.id).await? {
            Some(existing) if existing.is_frozen() => return Ok(existing),
            Some(existing) => PaymentRecord {
                amount: intent.amount,
                currency: intent.currency.clone(),
                status: PaymentRecordStatus::Succeeded,
                payment_method_type: intent
                    .payment_method_type()
                    .or_else(|| existing.payment_method_type.clone()),
                user_id: existing.user_id.or(user_id),
                error_message: None,
                ..existing
            },
            None => {
                let mut record = PaymentRecord::new(&intent.id, intent.amount, &intent.currency);
                record.status = PaymentRecordStatus::Succeeded;
                record.payment_method_type = intent.payment_method_type();
                record.user_id = user_id.or_else(|| metadata_uuid(intent, "user_id"));
                record.booking_id = self.booking_hint(intent).await?;
                record
            }
        };

        Ok(self.store.upsert_payment(&record).await?)
    }

    /// Move a linked booking to confirmed/paid. Bookings already past
    /// confirmation keep their status.
    async fn confirm_linked_booking(&self, booking_id: Uuid) -> ArmoraResult<Option<Booking>> {
        let Some(booking) = self.store.get_booking(booking_id).await? else {
            tracing::error!(%booking_id, "payment linked to missing booking");
            return Ok(None);
        };

        let status = if booking.status.is_paid_state() {
            booking.status
        } else {
            BookingStatus::Confirmed
        };
        if status == booking.status && booking.payment_status == PaymentStatus::Paid {
            return Ok(Some(booking));
        }

        let updated = self
            .store
            .set_booking_status(booking_id, status, PaymentStatus::Paid)
            .await?;
        tracing::info!(%booking_id, ?status, "booking confirmed");
        Ok(updated)
    }

    async fn with_linked_booking(&self, payment: PaymentRecord) -> ArmoraResult<Confirmation> {
        let assignment = match payment.booking_id {
            Some(id) => self.store.get_booking(id).await?,
            None => None,
        };
        Ok(Confirmation { payment, assignment })
    }

    /// Booking id carried in the intent metadata, if that booking exists.
    async fn booking_hint(&self, intent: &ProviderIntent) -> ArmoraResult<Option<Uuid>> {
        match metadata_uuid(intent, "booking_id") {
            Some(id) => Ok(self.store.get_booking(id).await?.map(|b| b.id)),
            None => Ok(None),
        }
    }
}

fn metadata_uuid(intent: &ProviderIntent, key: &str) -> Option<Uuid> {
    intent
        .metadata
        .get(key)
        .and_then(|value| Uuid::parse_str(value).ok())
}

pub fn validate_intent_id(intent_id: &str) -> ArmoraResult<()> {
    let well_formed = !intent_id.is_empty()
        && intent_id.len() <= 255
        && intent_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if well_formed {
        Ok(())
    } else {
        Err(ArmoraError::Validation(
            "providerIntentId is malformed".to_string(),
        ))
    }
}

fn normalize_currency(requested: Option<&str>, default: &str) -> ArmoraResult<String> {
    let currency = requested.unwrap_or(default).trim().to_ascii_lowercase();
    if currency.len() == 3 && currency.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(currency)
    } else {
        Err(ArmoraError::Validation(format!(
            "unsupported currency code: {}",
            currency
        )))
    }
}

/// Provider metadata is a flat string map; non-string JSON values are
/// serialised.
fn flatten_metadata(
    metadata: BTreeMap<String, serde_json::Value>,
) -> ArmoraResult<BTreeMap<String, String>> {
    if metadata.len() > MAX_METADATA_KEYS {
        return Err(ArmoraError::Validation(format!(
            "metadata supports at most {} keys",
            MAX_METADATA_KEYS
        )));
    }

    metadata
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            if key.is_empty() || key.len() > MAX_METADATA_KEY_LEN || value.len() > MAX_METADATA_VALUE_LEN
            {
                return Err(ArmoraError::Validation(format!(
                    "metadata entry '{}' exceeds provider limits",
                    key
                )));
            }
            Ok((key, value))
        })
        .collect()
}
