//! Subscription handlers
//!
//! Browser-facing routes respond with redirects carrying `info`/`error` query
//! parameters rather than JSON errors; the webhook route speaks plain status
//! codes to the billing provider.

use axum::body::Bytes;
use axum::extract::Extension;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Redirect;
use axum::{Form, Json};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::auth::extractors::SessionUser;
use crate::common::{parse_amount_dollars, safe_email_log, ApiError, AppState};

use super::manager::{SubscriptionError, MINIMUM_SUBSCRIPTION_CENTS};
use super::models::{
    derive_state, subscription_amount, SubscribeForm, SubscribeOutcome, SubscriptionErrorCode,
};

fn manage_error(code: SubscriptionErrorCode) -> Redirect {
    Redirect::to(&format!("/manage?error={}", code.slug()))
}

fn manage_fault(email: &str, context: &str, error: &anyhow::Error) -> Redirect {
    error!(error = %error, email = %safe_email_log(email), "{}", context);
    Redirect::to("/manage?error=internal_error")
}

/// GET /manage
///
/// Current donation state for the signed-in visitor, derived from fresh
/// provider queries on every request.
pub async fn manage(
    Extension(state): Extension<Arc<AppState>>,
    user: SessionUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let info = state
        .subscriptions
        .get_subscription(&user.email)
        .await
        .map_err(|e| {
            error!(error = %e, email = %safe_email_log(&user.email), "Failed to load donation state");
            ApiError::InternalServer("Failed to load donation state".to_string())
        })?;

    let logical = derive_state(info.customer.as_ref(), info.subscription.as_ref());
    let amount = info.subscription.as_ref().and_then(subscription_amount);

    Ok(Json(json!({
        "email": user.email,
        "provider": user.provider,
        "state": logical,
        "amount": amount,
    })))
}

/// POST /subscribe
///
/// The tier selector posts a dollar amount, or "custom" plus a free-form
/// amount. New donors are redirected to hosted checkout; existing donors get
/// their amount changed in place and land back on the manage page.
pub async fn subscribe(
    Extension(state): Extension<Arc<AppState>>,
    user: SessionUser,
    Form(form): Form<SubscribeForm>,
) -> Redirect {
    let raw = if form.amount == "custom" {
        form.custom_amount.as_deref().unwrap_or("")
    } else {
        form.amount.as_str()
    };

    let Some(amount) = parse_amount_dollars(raw, MINIMUM_SUBSCRIPTION_CENTS / 100) else {
        info!(email = %safe_email_log(&user.email), raw, "Rejected unparseable donation amount");
        return manage_error(SubscriptionErrorCode::InvalidAmount);
    };

    match state.subscriptions.subscribe(&user.email, amount).await {
        Ok(SubscribeOutcome::Checkout { url, .. }) => Redirect::to(&url),
        Ok(SubscribeOutcome::Updated { .. }) => Redirect::to("/manage?info=subscription_updated"),
        Err(SubscriptionError::Code(code)) => manage_error(code),
        Err(SubscriptionError::Fault(e)) => manage_fault(&user.email, "Subscribe failed", &e),
    }
}

/// GET /subscribe/portal
///
/// Redirect to the billing portal for payment-method management.
pub async fn portal(
    Extension(state): Extension<Arc<AppState>>,
    user: SessionUser,
) -> Redirect {
    match state.subscriptions.create_portal_session(&user.email).await {
        Ok(url) => Redirect::to(&url),
        Err(SubscriptionError::Code(code)) => manage_error(code),
        Err(SubscriptionError::Fault(e)) => {
            manage_fault(&user.email, "Portal session failed", &e)
        }
    }
}

/// POST /cancel
pub async fn cancel(
    Extension(state): Extension<Arc<AppState>>,
    user: SessionUser,
) -> Redirect {
    match state.subscriptions.cancel(&user.email).await {
        Ok(outcome) => {
            info!(
                email = %safe_email_log(&user.email),
                subscription_id = %outcome.subscription_id,
                customer_id = %outcome.customer_id,
                "Donation canceled from manage page"
            );
            Redirect::to("/manage?info=subscription_canceled")
        }
        Err(SubscriptionError::Code(code)) => manage_error(code),
        Err(SubscriptionError::Fault(e)) => manage_fault(&user.email, "Cancel failed", &e),
    }
}

/// POST /webhook
///
/// Raw body is required: the signature covers the exact bytes sent. A bad
/// signature is the only 400; processing failures are logged and acknowledged
/// with 200, since the provider's retries cannot fix a malformed payload.
pub async fn webhook(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let signature = headers
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    let event = match state.stripe.construct_event(&body, signature) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "Rejected webhook delivery");
            return StatusCode::BAD_REQUEST;
        }
    };

    info!(event_id = %event.id, event_type = %event.event_type, "Webhook event verified");

    if let Err(e) = state.subscriptions.process_webhook(event).await {
        error!(error = %e, "Webhook processing failed");
    }
    StatusCode::OK
}
