use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::ArmoraResult;
use crate::models::{ApiResponse, Booking};
use crate::payments::PaymentService;

/// Fetch one of the caller's bookings
pub async fn get_booking(
    State(payments): State<Arc<PaymentService>>,
    user: AuthenticatedUser,
    Path(booking_id): Path<Uuid>,
) -> ArmoraResult<Json<ApiResponse<Booking>>> {
    let booking = payments.owned_booking(booking_id, user.user_id).await?;
    Ok(Json(ApiResponse::ok(booking)))
}
