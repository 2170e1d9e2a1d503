use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};

use crate::app_state::AppState;
use crate::error::{ArmoraError, ArmoraResult};
use crate::models::ApiResponse;
use crate::webhook::WebhookOutcome;

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Payment provider webhook. Reads the raw body so the signature is checked
/// against the exact bytes that were signed.
pub async fn stripe_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ArmoraResult<Json<ApiResponse<WebhookOutcome>>> {
    // Fail-closed: without a signing secret nothing is accepted
    let Some(router) = &app_state.webhook_router else {
        tracing::error!("Webhook secret not configured - rejecting request");
        return Err(ArmoraError::Unavailable(
            "Webhook endpoint is not configured".to_string(),
        ));
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let outcome = router.handle(&body, signature).await.map_err(|e| {
        tracing::warn!(error = %e, "webhook rejected");
        e
    })?;

    Ok(Json(ApiResponse::ok(outcome)))
}
