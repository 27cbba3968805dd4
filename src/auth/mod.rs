//! # Auth Module
//!
//! All sign-in paths and session plumbing:
//! - GitHub and Google OAuth (authorization-code grant with CSRF state cookies)
//! - Email magic links (HMAC time-window codes, no token storage)
//! - Signed-cookie sessions and the `SessionUser` extractor for protected routes

pub mod cookies;
pub mod extractors;
pub mod handlers;
pub mod magic_link;
pub mod models;
pub mod routes;

#[cfg(test)]
mod tests;

pub use routes::auth_routes;
