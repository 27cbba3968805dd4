//! Donation handlers

use axum::extract::Extension;
use axum::response::Redirect;
use axum::Form;
use std::sync::Arc;
use tracing::info;

use crate::common::{parse_amount_dollars, AppState};

use super::manager::MINIMUM_DONATION_CENTS;
use super::models::{DonateForm, DonationErrorCode};

/// POST /donate
///
/// One-time donations need no session; the visitor enters their email at
/// checkout. Errors redirect back to the landing page.
pub async fn donate(
    Extension(state): Extension<Arc<AppState>>,
    Form(form): Form<DonateForm>,
) -> Redirect {
    let raw = if form.amount == "custom" {
        form.custom_amount.as_deref().unwrap_or("")
    } else {
        form.amount.as_str()
    };

    let Some(amount) = parse_amount_dollars(raw, MINIMUM_DONATION_CENTS / 100) else {
        info!(raw, "Rejected unparseable donation amount");
        return Redirect::to(&format!(
            "/?error={}",
            DonationErrorCode::InvalidAmount.slug()
        ));
    };

    match state.donations.donate(amount).await {
        Ok(result) => Redirect::to(&result.url),
        Err(code) => Redirect::to(&format!("/?error={}", code.slug())),
    }
}
