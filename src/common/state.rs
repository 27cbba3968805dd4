// Application state shared across all modules

use std::sync::Arc;

use crate::auth::cookies::SignedCookies;
use crate::auth::magic_link::MagicLinkService;
use crate::donation::DonationManager;
use crate::emails::EmailService;
use crate::services::{GitHubOAuth, GoogleOAuth, StripeService};
use crate::subscription::SubscriptionManager;

/// Application state containing configuration and constructed services.
///
/// Everything in here is immutable after startup; durable state lives in the
/// billing provider or in the client's signed cookies, so no locks are needed.
#[derive(Clone)]
pub struct AppState {
    pub cookies: Arc<SignedCookies>,
    pub magic_link: Arc<MagicLinkService>,
    pub github: Arc<GitHubOAuth>,
    pub google: Arc<GoogleOAuth>,
    pub stripe: Arc<StripeService>,
    pub emails: Arc<EmailService>,
    pub subscriptions: Arc<SubscriptionManager>,
    pub donations: Arc<DonationManager>,
}
