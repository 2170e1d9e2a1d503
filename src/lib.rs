//! Armora Backend Library
//!
//! Booking core for the Armora close protection service: officer matching,
//! payment intents and confirmation, provider webhooks and fee policy.

pub mod app_state;
pub mod auth;
pub mod config;
pub mod error;
pub mod geo;
pub mod handlers;
pub mod matching;
pub mod models;
pub mod payments;
pub mod reconcile;
pub mod routes;
pub mod store;
pub mod webhook;

#[cfg(test)]
pub(crate) mod test_support;
