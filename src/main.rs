// src/main.rs
use axum::{extract::Extension, routing::get, Router};
use dotenv::dotenv;
use reqwest::Client;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod auth;
mod common;
mod donation;
mod emails;
mod services;
mod subscription;

use auth::cookies::SignedCookies;
use auth::magic_link::MagicLinkService;
use common::{AppState, Config};
use emails::EmailService;
use services::{BillingApi, GitHubOAuth, GoogleOAuth, ResendClient, StripeService};

use auth::auth_routes;
use donation::{DonationManager, donation_routes};
use subscription::{SubscriptionManager, subscription_routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env()?;

    if config.stripe_webhook_secret.is_none() {
        warn!("STRIPE_WEBHOOK_SECRET is not set; webhook deliveries will be rejected");
    }

    // One shared HTTP client for every outbound API
    let http = Client::new();

    let cookies = Arc::new(SignedCookies::new(
        config.cookie_secret.clone(),
        config.production,
    ));
    let magic_link = Arc::new(MagicLinkService::new(
        config.totp_secret.clone(),
        config.base_url.clone(),
    ));
    let github = Arc::new(GitHubOAuth::new(
        http.clone(),
        config.github_client_id.clone(),
        config.github_secret.clone(),
        &config.base_url,
    ));
    let google = Arc::new(GoogleOAuth::new(
        http.clone(),
        config.google_client_id.clone(),
        config.google_secret.clone(),
        &config.base_url,
    ));
    let stripe = Arc::new(StripeService::new(
        http.clone(),
        config.stripe_secret_key.clone(),
        config.stripe_webhook_secret.clone(),
    ));
    let mailer = Arc::new(ResendClient::new(http.clone(), config.resend_key.clone()));

    let emails = Arc::new(EmailService::new(
        mailer,
        magic_link.clone(),
        &config.email_from,
    ));

    let billing: Arc<dyn BillingApi> = stripe.clone();
    let subscriptions = Arc::new(SubscriptionManager::new(
        billing.clone(),
        emails.clone(),
        config.stripe_product_id.clone(),
        config.stripe_portal_config.clone(),
        config.base_url.clone(),
    ));
    let donations = Arc::new(DonationManager::new(billing, config.base_url.clone()));

    let state = AppState {
        cookies,
        magic_link,
        github,
        google,
        stripe,
        emails,
        subscriptions,
        donations,
    };

    let app = Router::new()
        .merge(auth_routes())
        .merge(subscription_routes())
        .merge(donation_routes())
        .route("/healthz", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(Extension(Arc::new(state)));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(%addr, base_url = %config.base_url, "Donation portal listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
