//! Donation routes

use axum::{routing::post, Router};

use super::handlers;

/// Creates and returns the donation router
///
/// # Routes
/// - `POST /donate` - Start a one-time donation checkout
pub fn donation_routes() -> Router {
    Router::new().route("/donate", post(handlers::donate))
}
