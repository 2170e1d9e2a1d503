use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Deserialize;
use uuid::Uuid;

use super::json_body;
use crate::auth::AuthenticatedUser;
use crate::error::{ArmoraError, ArmoraResult};
use crate::models::{ApiResponse, NewBooking};
use crate::payments::{Confirmation, CreateIntentInput, CreatedIntent, FeeBreakdown, PaymentService};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub amount: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentRequest {
    pub amount: i64,
    pub currency: Option<String>,
    pub assignment_id: Option<Uuid>,
    pub booking: Option<NewBooking>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest {
    pub provider_intent_id: String,
    pub user_id: Uuid,
    pub assignment_data: Option<NewBooking>,
}

/// Fee breakdown for a base amount
pub async fn quote_payment(
    State(payments): State<Arc<PaymentService>>,
    payload: Result<Json<QuoteRequest>, JsonRejection>,
) -> ArmoraResult<Json<ApiResponse<FeeBreakdown>>> {
    let request = json_body(payload)?;
    let breakdown = payments.quote(request.amount)?;
    Ok(Json(ApiResponse::ok(breakdown)))
}

/// Create a provider payment intent for the caller
pub async fn create_payment_intent(
    State(payments): State<Arc<PaymentService>>,
    user: AuthenticatedUser,
    payload: Result<Json<CreateIntentRequest>, JsonRejection>,
) -> ArmoraResult<Json<ApiResponse<CreatedIntent>>> {
    let request = json_body(payload)?;
    let created = payments
        .create_intent(
            user.user_id,
            CreateIntentInput {
                amount: request.amount,
                currency: request.currency,
                assignment_id: request.assignment_id,
                booking: request.booking,
                metadata: request.metadata,
            },
        )
        .await?;

    Ok(Json(ApiResponse::ok(created)))
}

/// Confirm a completed payment and link or create its booking
pub async fn confirm_payment(
    State(payments): State<Arc<PaymentService>>,
    user: AuthenticatedUser,
    payload: Result<Json<ConfirmPaymentRequest>, JsonRejection>,
) -> ArmoraResult<Json<ApiResponse<Confirmation>>> {
    let request = json_body(payload)?;
    if request.user_id != user.user_id {
        tracing::warn!(
            token_user = %user.user_id,
            body_user = %request.user_id,
            "confirmation for another user refused"
        );
        return Err(ArmoraError::Auth(
            "userId does not match the authenticated user".to_string(),
        ));
    }

    let confirmation = payments
        .confirm(
            &request.provider_intent_id,
            user.user_id,
            request.assignment_data,
        )
        .await?;

    Ok(Json(ApiResponse::ok(confirmation)))
}
