//! Subscription data models and error taxonomy

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::common::Cents;
use crate::services::stripe::{Customer, Subscription, SubscriptionStatus};

/// Expected subscription failures, returned as values and rendered as
/// human-readable redirect messages by the route layer. Unexpected conditions
/// (multiple customers, malformed subscription shapes) are faults and
/// propagate as errors instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionErrorCode {
    InvalidAmount,
    SameAmount,
    NoCustomer,
    NoSubscription,
    NoLineItem,
    CreateError,
    CancelError,
    UpdateError,
}

impl SubscriptionErrorCode {
    /// Stable slug used in redirect query parameters
    pub fn slug(self) -> &'static str {
        match self {
            SubscriptionErrorCode::InvalidAmount => "invalid_amount",
            SubscriptionErrorCode::SameAmount => "same_amount",
            SubscriptionErrorCode::NoCustomer => "no_customer",
            SubscriptionErrorCode::NoSubscription => "no_subscription",
            SubscriptionErrorCode::NoLineItem => "no_line_item",
            SubscriptionErrorCode::CreateError => "create_error",
            SubscriptionErrorCode::CancelError => "cancel_error",
            SubscriptionErrorCode::UpdateError => "update_error",
        }
    }
}

impl fmt::Display for SubscriptionErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            SubscriptionErrorCode::InvalidAmount => "Please select a valid donation amount",
            SubscriptionErrorCode::SameAmount => "Select a different donation amount",
            SubscriptionErrorCode::NoCustomer => "No billing customer found",
            SubscriptionErrorCode::NoSubscription => "No active monthly donation found",
            SubscriptionErrorCode::NoLineItem => "No line items in your active subscription",
            SubscriptionErrorCode::CreateError => {
                "Unable to create monthly donation. Please try again."
            }
            SubscriptionErrorCode::CancelError => {
                "Unable to cancel monthly donation. Please try again."
            }
            SubscriptionErrorCode::UpdateError => {
                "Unable to update monthly donation. Please try again."
            }
        };
        write!(f, "{}", message)
    }
}

/// Outcome of a subscribe call: either the visitor must complete a hosted
/// checkout, or an existing subscription was updated in place with no
/// redirect needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Checkout { url: String, session_id: String },
    Updated { old_amount: Cents, new_amount: Cents },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelOutcome {
    pub subscription_id: String,
    pub customer_id: String,
    pub amount: Option<Cents>,
}

/// Fresh provider state for one email address
#[derive(Debug, Clone, Default)]
pub struct CustomerSubscriptionInfo {
    pub customer: Option<Customer>,
    pub subscription: Option<Subscription>,
}

/// Logical subscription state, derived from fresh provider queries on every
/// call. Never cached: the billing provider is the system of record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalState {
    NoCustomer,
    NoSubscription,
    Active,
    PastDue,
}

/// Derive the logical state from a customer/subscription pair.
pub fn derive_state(
    customer: Option<&Customer>,
    subscription: Option<&Subscription>,
) -> LogicalState {
    match (customer, subscription) {
        (None, _) => LogicalState::NoCustomer,
        (Some(_), None) => LogicalState::NoSubscription,
        (Some(_), Some(sub)) => match sub.status {
            SubscriptionStatus::PastDue => LogicalState::PastDue,
            _ => LogicalState::Active,
        },
    }
}

/// The unit amount on a subscription's single line item, if present
pub fn subscription_amount(subscription: &Subscription) -> Option<Cents> {
    subscription
        .items
        .data
        .first()
        .and_then(|item| item.price.as_ref())
        .and_then(|price| price.unit_amount)
}

/// Form body for POST /subscribe. The tier selector posts a dollar amount or
/// the literal "custom" plus a free-form amount field.
#[derive(Debug, Deserialize)]
pub struct SubscribeForm {
    pub amount: String,
    pub custom_amount: Option<String>,
}
