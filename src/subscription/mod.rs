//! # Subscription Module
//!
//! Reconciles "donate $N/month" intents against billing-provider state:
//! - Fresh provider queries on every operation, no local cache
//! - New donors go through hosted checkout; existing donors are updated in
//!   place with no proration
//! - Webhook events are verified, then translated into notification emails

pub mod handlers;
pub mod manager;
pub mod models;
pub mod routes;


pub use manager::SubscriptionManager;
pub use routes::subscription_routes;
