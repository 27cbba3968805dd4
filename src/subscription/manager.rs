//! Subscription reconciliation manager
//!
//! The single source of truth for turning "donate $N/month" into correct
//! billing-provider state, and for translating provider webhook events into
//! notification emails. Provider state is re-queried fresh on every call;
//! there is no local cache and no lock. Two tabs racing the same submit are
//! resolved by the SameAmount guard rather than by coordination.

use anyhow::{anyhow, bail, Context};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::common::{safe_email_log, Cents};
use crate::emails::EmailService;
use crate::services::stripe::{
    BillingApi, Event, Invoice, List, Subscription, SubscriptionItem, SubscriptionStatus,
};
use serde::Deserialize;

use super::models::{
    subscription_amount, CancelOutcome, CustomerSubscriptionInfo, SubscribeOutcome,
    SubscriptionErrorCode,
};

/// Recurring donations below this are rejected; processing fees make small
/// monthly charges not worth collecting. Deliberately higher than the
/// one-time donation floor.
pub const MINIMUM_SUBSCRIPTION_CENTS: Cents = 1000;

/// A subscription operation failure: either an expected, user-presentable
/// code from the taxonomy, or a fault (data inconsistency, malformed shape)
/// that should surface as a generic error.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("{0}")]
    Code(SubscriptionErrorCode),

    #[error(transparent)]
    Fault(#[from] anyhow::Error),
}

impl From<SubscriptionErrorCode> for SubscriptionError {
    fn from(code: SubscriptionErrorCode) -> Self {
        SubscriptionError::Code(code)
    }
}

/// Previous attribute values carried on a subscription-updated event
#[derive(Debug, Deserialize)]
struct PreviousAttributes {
    status: Option<SubscriptionStatus>,
    items: Option<List<SubscriptionItem>>,
}

/// Key for deduplicating checkout-session creation, derived from the donor,
/// the amount, and a 5-minute time bucket.
pub(super) fn checkout_idempotency_key(donor: &str, amount: Cents, timestamp_secs: i64) -> String {
    let bucket = timestamp_secs.div_euclid(300);
    let seed = format!("checkout:{}:{}:{}", donor, amount, bucket);
    hex::encode(Sha256::digest(seed.as_bytes()))
}

pub struct SubscriptionManager {
    billing: Arc<dyn BillingApi>,
    emails: Arc<EmailService>,
    product_id: String,
    portal_config: String,
    base_url: String,
}

impl SubscriptionManager {
    pub fn new(
        billing: Arc<dyn BillingApi>,
        emails: Arc<EmailService>,
        product_id: impl Into<String>,
        portal_config: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            billing,
            emails,
            product_id: product_id.into(),
            portal_config: portal_config.into(),
            base_url: base_url.into(),
        }
    }

    /// Look up the customer and their one active-or-past-due subscription.
    ///
    /// More than one customer for an email, or more than one qualifying
    /// subscription, is a data-consistency fault and fails loudly; so does a
    /// subscription whose line items do not match the donation product.
    pub async fn get_subscription(
        &self,
        email: &str,
    ) -> anyhow::Result<CustomerSubscriptionInfo> {
        let customers = self
            .billing
            .list_customers_by_email(email, 2)
            .await
            .context("listing customers")?;

        if customers.len() > 1 {
            bail!(
                "multiple billing customers found for {}",
                safe_email_log(email)
            );
        }

        let Some(customer) = customers.into_iter().next() else {
            return Ok(CustomerSubscriptionInfo::default());
        };

        // A past-due subscription is still "the" subscription for management
        // purposes, so both statuses must be queried.
        let mut subscriptions = self
            .billing
            .list_subscriptions(&customer.id, SubscriptionStatus::Active, 2)
            .await
            .context("listing active subscriptions")?;
        subscriptions.extend(
            self.billing
                .list_subscriptions(&customer.id, SubscriptionStatus::PastDue, 2)
                .await
                .context("listing past-due subscriptions")?,
        );

        if subscriptions.len() > 1 {
            bail!(
                "multiple qualifying subscriptions for customer {}",
                customer.id
            );
        }

        let subscription = subscriptions.into_iter().next();
        if let Some(sub) = &subscription {
            self.validate_shape(sub)?;
        }

        Ok(CustomerSubscriptionInfo {
            customer: Some(customer),
            subscription,
        })
    }

    fn validate_shape(&self, subscription: &Subscription) -> anyhow::Result<()> {
        if subscription.items.data.len() != 1 {
            bail!(
                "subscription {} has {} line items, expected exactly 1",
                subscription.id,
                subscription.items.data.len()
            );
        }
        let item = &subscription.items.data[0];
        let product = item.price.as_ref().and_then(|p| p.product.as_deref());
        if let Some(product) = product {
            if product != self.product_id {
                bail!(
                    "subscription {} line item belongs to product {}, expected {}",
                    subscription.id,
                    product,
                    self.product_id
                );
            }
        }
        Ok(())
    }

    /// Create a new monthly donation, or change the amount of an existing one.
    ///
    /// With no qualifying subscription this returns a hosted checkout URL to
    /// redirect to. With an existing subscription the price is replaced in
    /// place with no proration (the change applies next cycle) and no
    /// checkout session is created; an identical amount is rejected with
    /// `SameAmount` as a guard against duplicate submits.
    pub async fn subscribe(
        &self,
        email: &str,
        amount: Cents,
    ) -> Result<SubscribeOutcome, SubscriptionError> {
        if amount < MINIMUM_SUBSCRIPTION_CENTS {
            return Err(SubscriptionErrorCode::InvalidAmount.into());
        }

        let info = self.get_subscription(email).await?;

        if let Some(existing) = info.subscription {
            let Some(current) = subscription_amount(&existing) else {
                return Err(SubscriptionErrorCode::NoLineItem.into());
            };
            if current == amount {
                debug!(
                    email = %safe_email_log(email),
                    amount,
                    "Subscribe rejected: amount unchanged"
                );
                return Err(SubscriptionErrorCode::SameAmount.into());
            }

            // Shape is validated in get_subscription, so the item exists.
            let item_id = existing.items.data[0].id.clone();
            self.billing
                .update_subscription_amount(&existing.id, &item_id, &self.product_id, amount)
                .await
                .map_err(|e| {
                    error!(error = %e, subscription_id = %existing.id, "Subscription update failed");
                    SubscriptionError::from(SubscriptionErrorCode::UpdateError)
                })?;

            info!(
                email = %safe_email_log(email),
                old_amount = current,
                new_amount = amount,
                "Subscription amount updated in place"
            );
            return Ok(SubscribeOutcome::Updated {
                old_amount: current,
                new_amount: amount,
            });
        }

        let success_url = format!("{}/manage?info=subscription_created", self.base_url);
        let cancel_url = format!("{}/manage", self.base_url);
        let customer_id = info.customer.as_ref().map(|c| c.id.as_str());

        // Two near-simultaneous submits for the same donor, amount, and time
        // bucket share a key, so the provider collapses them into one session.
        let idempotency_key = checkout_idempotency_key(
            customer_id.unwrap_or(email),
            amount,
            Utc::now().timestamp(),
        );

        let session = self
            .billing
            .create_subscription_checkout(
                customer_id,
                customer_id.is_none().then_some(email),
                &self.product_id,
                amount,
                &success_url,
                &cancel_url,
                &idempotency_key,
            )
            .await
            .map_err(|e| {
                error!(error = %e, email = %safe_email_log(email), "Checkout session creation failed");
                SubscriptionError::from(SubscriptionErrorCode::CreateError)
            })?;

        let Some(url) = session.url else {
            error!(session_id = %session.id, "Checkout session created without a URL");
            return Err(SubscriptionErrorCode::CreateError.into());
        };

        info!(
            email = %safe_email_log(email),
            amount,
            session_id = %session.id,
            "Subscription checkout session created"
        );
        Ok(SubscribeOutcome::Checkout {
            url,
            session_id: session.id,
        })
    }

    /// Cancel the monthly donation for an email.
    ///
    /// The current amount is captured before the provider call so that the
    /// cancellation email can reference it; provider state changes underneath
    /// us once the cancel lands.
    pub async fn cancel(&self, email: &str) -> Result<CancelOutcome, SubscriptionError> {
        let info = self.get_subscription(email).await?;

        let Some(customer) = info.customer else {
            return Err(SubscriptionErrorCode::NoCustomer.into());
        };
        let Some(subscription) = info.subscription else {
            return Err(SubscriptionErrorCode::NoSubscription.into());
        };

        let amount = subscription_amount(&subscription);

        self.billing
            .cancel_subscription(&subscription.id)
            .await
            .map_err(|e| {
                error!(error = %e, subscription_id = %subscription.id, "Subscription cancel failed");
                SubscriptionError::from(SubscriptionErrorCode::CancelError)
            })?;

        if let Err(e) = self
            .emails
            .send_subscription_canceled_email(email, amount)
            .await
        {
            // The cancellation already happened; a failed email must not
            // make the operation look failed.
            warn!(error = %e, email = %safe_email_log(email), "Cancellation email failed");
        }

        info!(
            email = %safe_email_log(email),
            subscription_id = %subscription.id,
            "Subscription canceled"
        );
        Ok(CancelOutcome {
            subscription_id: subscription.id,
            customer_id: customer.id,
            amount,
        })
    }

    /// Create a billing-portal session for self-managing payment methods.
    /// Requires an existing customer and subscription; a portal with nothing
    /// to manage is meaningless.
    pub async fn create_portal_session(&self, email: &str) -> Result<String, SubscriptionError> {
        let info = self.get_subscription(email).await?;

        let Some(customer) = info.customer else {
            return Err(SubscriptionErrorCode::NoCustomer.into());
        };
        if info.subscription.is_none() {
            return Err(SubscriptionErrorCode::NoSubscription.into());
        }

        let return_url = format!("{}/manage", self.base_url);
        let session = self
            .billing
            .create_portal_session(&self.portal_config, &customer.id, &return_url)
            .await
            .map_err(|e| {
                error!(error = %e, customer_id = %customer.id, "Portal session creation failed");
                SubscriptionError::from(SubscriptionErrorCode::CreateError)
            })?;

        Ok(session.url)
    }

    /// Process a verified webhook event into notification side effects.
    ///
    /// Delivery may be duplicated or out of order; each branch keys off the
    /// event's own payload rather than assuming any prior event arrived.
    /// Errors are for the caller to log; the webhook endpoint acknowledges
    /// regardless.
    pub async fn process_webhook(&self, event: Event) -> anyhow::Result<()> {
        match event.event_type.as_str() {
            "invoice.paid" => self.handle_invoice_paid(&event).await,
            "customer.subscription.updated" => self.handle_subscription_updated(&event).await,
            other => {
                debug!(event_type = other, event_id = %event.id, "Ignoring webhook event");
                Ok(())
            }
        }
    }

    /// A paid invoice triggers the welcome email only when it is the one that
    /// created the subscription. Renewal invoices share the event type and
    /// must not re-send it.
    async fn handle_invoice_paid(&self, event: &Event) -> anyhow::Result<()> {
        let invoice: Invoice = serde_json::from_value(event.data.object.clone())
            .context("parsing invoice from webhook")?;

        if invoice.billing_reason.as_deref() != Some("subscription_create") {
            debug!(
                event_id = %event.id,
                billing_reason = ?invoice.billing_reason,
                "Skipping invoice.paid with non-creation billing reason"
            );
            return Ok(());
        }

        let email = invoice
            .customer_email
            .ok_or_else(|| anyhow!("invoice {} has no customer email", event.id))?;
        let amount = invoice
            .amount_paid
            .ok_or_else(|| anyhow!("invoice {} has no paid amount", event.id))?;

        self.emails
            .send_subscription_welcome_email(&email, amount)
            .await
            .context("sending welcome email")?;
        Ok(())
    }

    async fn handle_subscription_updated(&self, event: &Event) -> anyhow::Result<()> {
        let subscription: Subscription = serde_json::from_value(event.data.object.clone())
            .context("parsing subscription from webhook")?;
        let previous: Option<PreviousAttributes> = event
            .data
            .previous_attributes
            .clone()
            .map(serde_json::from_value)
            .transpose()
            .context("parsing previous attributes from webhook")?;

        let email = self.customer_email(&subscription).await?;

        // A transition INTO past_due requires a previous status that was
        // something else. An update event with no previous status is the
        // creation surfacing as an update and must not false-positive.
        let entered_past_due = subscription.status == SubscriptionStatus::PastDue
            && matches!(
                previous.as_ref().and_then(|p| p.status),
                Some(status) if status != SubscriptionStatus::PastDue
            );

        if entered_past_due {
            let amount = subscription_amount(&subscription);
            self.emails
                .send_subscription_past_due_email(&email, amount)
                .await
                .context("sending past-due email")?;
            // Not also processed as an amount change, even when line-item
            // data happens to be present on the same event.
            return Ok(());
        }

        let previous_amount = previous
            .as_ref()
            .and_then(|p| p.items.as_ref())
            .and_then(|items| items.data.first())
            .and_then(|item| item.price.as_ref())
            .and_then(|price| price.unit_amount);
        let current_amount = subscription_amount(&subscription);

        if let (Some(old_amount), Some(new_amount)) = (previous_amount, current_amount) {
            if old_amount != new_amount {
                self.emails
                    .send_subscription_updated_email(&email, old_amount, new_amount)
                    .await
                    .context("sending amount-updated email")?;
            }
        }

        Ok(())
    }

    async fn customer_email(&self, subscription: &Subscription) -> anyhow::Result<String> {
        let customer_id = subscription
            .customer
            .as_deref()
            .ok_or_else(|| anyhow!("subscription {} has no customer", subscription.id))?;
        let customer = self
            .billing
            .get_customer(customer_id)
            .await
            .context("fetching customer for webhook notification")?;
        customer
            .email
            .ok_or_else(|| anyhow!("customer {} has no email", customer_id))
    }
}
