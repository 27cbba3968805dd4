//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `GET  /auth/github/start` - Begin GitHub OAuth
/// - `GET  /auth/github/callback` - GitHub OAuth return leg
/// - `GET  /auth/google/start` - Begin Google OAuth
/// - `GET  /auth/google/callback` - Google OAuth return leg
/// - `POST /auth/email` - Request a magic-link email
/// - `GET  /auth/email/callback` - Magic-link return leg
/// - `GET  /auth/signout` - Clear the session cookie
pub fn auth_routes() -> Router {
    Router::new()
        .route("/auth/github/start", get(handlers::github_start))
        .route("/auth/github/callback", get(handlers::github_callback))
        .route("/auth/google/start", get(handlers::google_start))
        .route("/auth/google/callback", get(handlers::google_callback))
        .route("/auth/email", post(handlers::email_auth))
        .route("/auth/email/callback", get(handlers::email_callback))
        .route("/auth/signout", get(handlers::signout))
}
