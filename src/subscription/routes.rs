//! Subscription routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the subscription router
///
/// # Routes
/// - `GET  /manage` - Current donation state (session required)
/// - `POST /subscribe` - Create or change the monthly donation
/// - `GET  /subscribe/portal` - Billing portal redirect
/// - `POST /cancel` - Cancel the monthly donation
/// - `POST /webhook` - Billing provider webhook endpoint
pub fn subscription_routes() -> Router {
    Router::new()
        .route("/manage", get(handlers::manage))
        .route("/subscribe", post(handlers::subscribe))
        .route("/subscribe/portal", get(handlers::portal))
        .route("/cancel", post(handlers::cancel))
        .route("/webhook", post(handlers::webhook))
}
