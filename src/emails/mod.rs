//! # Emails Module
//!
//! Composes notification emails from templates and hands them to the
//! configured [`Mailer`]. One instance is constructed at startup and shared.

pub mod templates;

use std::sync::Arc;
use tracing::info;

use crate::auth::magic_link::MagicLinkService;
use crate::common::{safe_email_log, Cents};
use crate::services::resend::{EmailError, Mailer, SentEmail};

pub struct EmailService {
    mailer: Arc<dyn Mailer>,
    magic_link: Arc<MagicLinkService>,
    from_address: String,
}

impl EmailService {
    pub fn new(
        mailer: Arc<dyn Mailer>,
        magic_link: Arc<MagicLinkService>,
        from_email: &str,
    ) -> Self {
        Self {
            mailer,
            magic_link,
            from_address: format!("Donations <{}>", from_email),
        }
    }

    pub async fn send_magic_link_email(&self, email: &str) -> Result<SentEmail, EmailError> {
        let url = self.magic_link.issue_url(email);
        let sent = self
            .mailer
            .send(
                &self.from_address,
                email,
                "Sign in to manage your donation",
                &templates::magic_link_email(&url),
            )
            .await?;
        info!(email = %safe_email_log(email), email_id = %sent.id, "Magic link email sent");
        Ok(sent)
    }

    pub async fn send_subscription_welcome_email(
        &self,
        email: &str,
        amount: Cents,
    ) -> Result<SentEmail, EmailError> {
        let sent = self
            .mailer
            .send(
                &self.from_address,
                email,
                "Welcome! Your monthly donation is set up",
                &templates::subscription_welcome_email(amount),
            )
            .await?;
        info!(email = %safe_email_log(email), amount, "Subscription welcome email sent");
        Ok(sent)
    }

    pub async fn send_subscription_canceled_email(
        &self,
        email: &str,
        amount: Option<Cents>,
    ) -> Result<SentEmail, EmailError> {
        let sent = self
            .mailer
            .send(
                &self.from_address,
                email,
                "Your monthly donation has been canceled",
                &templates::subscription_canceled_email(amount),
            )
            .await?;
        info!(email = %safe_email_log(email), "Subscription canceled email sent");
        Ok(sent)
    }

    pub async fn send_subscription_past_due_email(
        &self,
        email: &str,
        amount: Option<Cents>,
    ) -> Result<SentEmail, EmailError> {
        let sent = self
            .mailer
            .send(
                &self.from_address,
                email,
                "Payment issue with your monthly donation",
                &templates::subscription_past_due_email(amount),
            )
            .await?;
        info!(email = %safe_email_log(email), "Subscription past-due email sent");
        Ok(sent)
    }

    pub async fn send_subscription_updated_email(
        &self,
        email: &str,
        old_amount: Cents,
        new_amount: Cents,
    ) -> Result<SentEmail, EmailError> {
        let sent = self
            .mailer
            .send(
                &self.from_address,
                email,
                "Your monthly donation amount has been updated",
                &templates::subscription_updated_email(old_amount, new_amount),
            )
            .await?;
        info!(
            email = %safe_email_log(email),
            old_amount,
            new_amount,
            "Subscription updated email sent"
        );
        Ok(sent)
    }
}
