//! # Donation Module
//!
//! One-time donations: amount validation and hosted checkout session
//! creation. No session is required; the visitor identifies at checkout.

pub mod handlers;
pub mod manager;
pub mod models;
pub mod routes;

#[cfg(test)]
mod tests;

pub use manager::DonationManager;
pub use routes::donation_routes;
