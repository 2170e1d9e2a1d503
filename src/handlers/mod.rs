//! API handlers for Armora

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::{ArmoraError, ArmoraResult};

pub mod bookings;
pub mod matching;
pub mod payments;
pub mod webhook;

pub use bookings::get_booking;
pub use matching::search_cpos;
pub use payments::{confirm_payment, create_payment_intent, quote_payment};
pub use webhook::stripe_webhook;

pub async fn root() -> &'static str {
    "Armora API Server"
}

pub async fn health_check() -> &'static str {
    "OK"
}

/// Unwrap a JSON body, turning extractor rejections into validation errors so
/// every failure uses the same envelope.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ArmoraResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ArmoraError::Validation(rejection.body_text()))
}
