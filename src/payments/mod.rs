//! Payment intent creation, confirmation and fee policy

pub mod fees;
pub mod provider;
pub mod service;

pub use fees::{ChargeBasis, FeeBreakdown};
pub use provider::{PaymentProvider, ProviderError, ProviderIntent, StripeProvider};
pub use service::{Confirmation, CreateIntentInput, CreatedIntent, PaymentService, RefundNotice};
