// Application configuration loaded once at startup

use anyhow::{bail, Result};
use std::env;

/// Immutable application configuration.
///
/// Built from environment variables once in `main` and shared read-only through
/// `AppState`. Required variables fail fast with the variable name so a
/// misconfigured deploy dies immediately instead of 500ing later.
#[derive(Debug, Clone)]
pub struct Config {
    pub production: bool,
    pub server_host: String,
    pub port: u16,
    pub base_url: String,
    pub cookie_secret: String,
    pub totp_secret: String,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: Option<String>,
    pub stripe_portal_config: String,
    pub stripe_product_id: String,
    pub github_client_id: String,
    pub github_secret: String,
    pub google_client_id: String,
    pub google_secret: String,
    pub resend_key: String,
    pub email_from: String,
}

fn require_var(key: &str) -> Result<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => bail!("Missing required env var: {}", key),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let production = env::var("APP_ENV").map(|v| v == "production").unwrap_or(false);
        let server_host = require_var("SERVER_HOST")?;
        let protocol = if production { "https" } else { "http" };

        Ok(Self {
            production,
            base_url: format!("{}://{}", protocol, server_host),
            server_host,
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse::<u16>().ok())
                .unwrap_or(3000),
            cookie_secret: require_var("COOKIE_SECRET")?,
            totp_secret: require_var("TOTP_SECRET")?,
            stripe_secret_key: require_var("STRIPE_SECRET")?,
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").ok().filter(|v| !v.is_empty()),
            stripe_portal_config: require_var("STRIPE_PORTAL_CONFIG")?,
            stripe_product_id: env::var("STRIPE_PRODUCT_ID")
                .unwrap_or_else(|_| "monthly_donation".to_string()),
            github_client_id: require_var("GITHUB_CLIENT_ID")?,
            github_secret: require_var("GITHUB_SECRET")?,
            google_client_id: require_var("GOOGLE_CLIENT_ID")?,
            google_secret: require_var("GOOGLE_SECRET")?,
            resend_key: require_var("RESEND_KEY")?,
            email_from: env::var("EMAIL_DOMAIN")
                .unwrap_or_else(|_| "onboarding@resend.dev".to_string()),
        })
    }
}
