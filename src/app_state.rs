//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::matching::MatchingService;
use crate::payments::PaymentService;
use crate::store::BookingStore;
use crate::webhook::WebhookRouter;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BookingStore>,
    pub payment_service: Arc<PaymentService>,
    pub matching_service: Arc<MatchingService>,
    /// `None` when no webhook signing secret is configured.
    pub webhook_router: Option<Arc<WebhookRouter>>,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn BookingStore>,
        payment_service: Arc<PaymentService>,
        webhook_secret: Option<String>,
        webhook_tolerance_seconds: i64,
        jwt_secret: &str,
    ) -> Self {
        let matching_service = Arc::new(MatchingService::new(store.clone()));
        let webhook_router = webhook_secret
            .filter(|secret| !secret.is_empty())
            .map(|secret| {
                Arc::new(WebhookRouter::new(
                    payment_service.clone(),
                    store.clone(),
                    secret,
                    webhook_tolerance_seconds,
                ))
            });

        Self {
            store,
            payment_service,
            matching_service,
            webhook_router,
            jwt_secret: Arc::from(jwt_secret),
        }
    }
}

impl FromRef<AppState> for Arc<PaymentService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.payment_service.clone()
    }
}

impl FromRef<AppState> for Arc<MatchingService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.matching_service.clone()
    }
}
