// src/services/mod.rs
//
// Clients for external collaborators: the OAuth identity providers, the
// billing provider, and the email delivery API

pub mod github;
pub mod google;
pub mod resend;
pub mod stripe;

// Re-export commonly used types for convenience
pub use github::GitHubOAuth;
pub use google::GoogleOAuth;
pub use resend::ResendClient;
pub use stripe::{BillingApi, StripeService};
