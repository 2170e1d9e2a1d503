//! Periodic consistency sweep
//!
//! Linked writes (payment record, then booking) are sequential, so an
//! interrupted request can leave a succeeded payment with no booking or a
//! booking stuck in `pending`. The sweep only reports these; resolving them
//! is an operator decision.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

use crate::store::{BookingStore, StoreError};

const SUPERVISOR_MAX_BACKOFF_SECONDS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub orphaned_payments: Vec<String>,
    pub stale_pending_bookings: Vec<uuid::Uuid>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.orphaned_payments.is_empty() && self.stale_pending_bookings.is_empty()
    }
}

pub struct Reconciler {
    store: Arc<dyn BookingStore>,
    interval: Duration,
    pending_after: Duration,
}

impl Reconciler {
    pub fn new(store: Arc<dyn BookingStore>, interval: Duration, pending_after: Duration) -> Self {
        Self {
            store,
            interval,
            pending_after,
        }
    }

    pub async fn run_once(&self) -> Result<ReconcileReport, StoreError> {
        let orphaned = self.store.list_orphaned_payments().await?;
        let cutoff = chrono::Duration::from_std(self.pending_after)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age));
        let stale = match cutoff {
            Some(cutoff) => self.store.list_stale_pending_bookings(cutoff).await?,
            None => {
                warn!(
                    pending_after_seconds = self.pending_after.as_secs(),
                    "pending threshold out of range; skipping stale booking scan"
                );
                Vec::new()
            }
        };

        for payment in &orphaned {
            warn!(
                provider_intent_id = %payment.provider_intent_id,
                amount = payment.amount,
                user_id = ?payment.user_id,
                "succeeded payment has no booking"
            );
        }
        for booking in &stale {
            warn!(
                booking_id = %booking.id,
                created_at = %booking.created_at,
                "booking still pending payment"
            );
        }

        Ok(ReconcileReport {
            orphaned_payments: orphaned
                .into_iter()
                .map(|p| p.provider_intent_id)
                .collect(),
            stale_pending_bookings: stale.into_iter().map(|b| b.id).collect(),
        })
    }

    pub async fn start(self: Arc<Self>) {
        info!(interval_seconds = self.interval.as_secs(), "reconciliation sweep started");

        loop {
            match self.run_once().await {
                Ok(report) if report.is_clean() => info!("reconciliation sweep clean"),
                Ok(report) => warn!(
                    orphaned_payments = report.orphaned_payments.len(),
                    stale_pending_bookings = report.stale_pending_bookings.len(),
                    "reconciliation sweep found inconsistencies"
                ),
                Err(err) => error!(error = %err, "reconciliation sweep failed"),
            }

            sleep(self.interval).await;
        }
    }
}

/// Run the sweep in the background, restarting it with capped exponential
/// backoff if it panics.
pub fn spawn_supervised(reconciler: Arc<Reconciler>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut restart_count: u32 = 0;
        loop {
            let handle = tokio::spawn(reconciler.clone().start());

            match handle.await {
                Ok(()) => {
                    info!("reconciliation sweep exited; stopping supervisor");
                    break;
                }
                Err(join_error) => {
                    if join_error.is_panic() {
                        error!("reconciliation sweep panicked; restarting");
                    } else {
                        error!(error = %join_error, "reconciliation task failed; restarting");
                    }
                }
            }

            restart_count = restart_count.saturating_add(1);
            let backoff_seconds =
                (2u64.saturating_pow(restart_count.min(5))).min(SUPERVISOR_MAX_BACKOFF_SECONDS);
            warn!(restart_count, backoff_seconds, "reconciliation restart backoff");
            sleep(Duration::from_secs(backoff_seconds)).await;
        }
    })
}
