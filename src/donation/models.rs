//! Donation data models

use serde::Deserialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DonationErrorCode {
    InvalidAmount,
    SessionError,
}

impl DonationErrorCode {
    /// Stable slug used in redirect query parameters
    pub fn slug(self) -> &'static str {
        match self {
            DonationErrorCode::InvalidAmount => "invalid_amount",
            DonationErrorCode::SessionError => "session_error",
        }
    }
}

impl fmt::Display for DonationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            DonationErrorCode::InvalidAmount => "Please select a valid donation amount",
            DonationErrorCode::SessionError => "Unable to start the donation. Please try again.",
        };
        write!(f, "{}", message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonateResult {
    pub url: String,
    pub session_id: String,
}

/// Form body for POST /donate, same tier-selector shape as the subscribe form
#[derive(Debug, Deserialize)]
pub struct DonateForm {
    pub amount: String,
    pub custom_amount: Option<String>,
}
