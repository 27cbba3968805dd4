//! One-time donation checkout

use std::sync::Arc;
use tracing::{error, info};

use crate::common::Cents;
use crate::services::stripe::BillingApi;

use super::models::{DonateResult, DonationErrorCode};

/// One-time donations below $2 are rejected; card fees eat the rest.
pub const MINIMUM_DONATION_CENTS: Cents = 200;

pub struct DonationManager {
    billing: Arc<dyn BillingApi>,
    base_url: String,
}

impl DonationManager {
    pub fn new(billing: Arc<dyn BillingApi>, base_url: impl Into<String>) -> Self {
        Self {
            billing,
            base_url: base_url.into(),
        }
    }

    /// Create a hosted one-time checkout session for the given amount.
    pub async fn donate(&self, amount: Cents) -> Result<DonateResult, DonationErrorCode> {
        if amount < MINIMUM_DONATION_CENTS {
            return Err(DonationErrorCode::InvalidAmount);
        }

        let success_url = format!("{}/thank-you", self.base_url);
        let cancel_url = format!("{}/", self.base_url);

        let session = self
            .billing
            .create_payment_checkout(
                amount,
                "One-time donation",
                "Thank you for supporting the space",
                &success_url,
                &cancel_url,
            )
            .await
            .map_err(|e| {
                error!(error = %e, amount, "Donation checkout session creation failed");
                DonationErrorCode::SessionError
            })?;

        let Some(url) = session.url else {
            error!(session_id = %session.id, "Donation checkout session created without a URL");
            return Err(DonationErrorCode::SessionError);
        };

        info!(amount, session_id = %session.id, "Donation checkout session created");
        Ok(DonateResult {
            url,
            session_id: session.id,
        })
    }
}
