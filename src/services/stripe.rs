// src/services/stripe.rs
//
// Billing provider REST client. The provider is the system of record for
// customers and subscriptions; nothing here is cached. Requests use the
// provider's form-encoded parameter style; webhook payloads are verified
// against the signing secret before any event is parsed.

use async_trait::async_trait;
use chrono::Utc;
use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, warn};

use crate::common::Cents;

type HmacSha256 = Hmac<Sha256>;

const API_BASE: &str = "https://api.stripe.com/v1";

/// Tolerance for webhook signature timestamps
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error)]
pub enum StripeError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("webhook signing secret is not configured")]
    MissingSecret,

    #[error("malformed signature header")]
    BadHeader,

    #[error("signature verification failed")]
    BadSignature,

    #[error("signature timestamp outside tolerance")]
    StaleTimestamp,

    #[error("failed to parse event payload: {0}")]
    Parse(String),
}

// ---- Wire types ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    PastDue,
    Canceled,
    Incomplete,
    IncompleteExpired,
    Trialing,
    Unpaid,
    Paused,
    #[serde(other)]
    Unknown,
}

impl SubscriptionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Incomplete => "incomplete",
            SubscriptionStatus::IncompleteExpired => "incomplete_expired",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Unpaid => "unpaid",
            SubscriptionStatus::Paused => "paused",
            SubscriptionStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Price {
    pub id: Option<String>,
    pub unit_amount: Option<Cents>,
    pub product: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionItem {
    pub id: String,
    pub price: Option<Price>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct List<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self { data: Vec::new() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub status: SubscriptionStatus,
    pub customer: Option<String>,
    #[serde(default)]
    pub items: List<SubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortalSession {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Invoice {
    pub customer_email: Option<String>,
    pub amount_paid: Option<Cents>,
    pub billing_reason: Option<String>,
}

/// A webhook event. `data.object` stays untyped until the dispatcher knows
/// which shape to expect for the event type.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
    pub previous_attributes: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

// ---- Capability interface ----

/// The billing-provider capability consumed by the managers. Implemented by
/// [`StripeService`] in production and by in-memory fakes in tests.
#[async_trait]
pub trait BillingApi: Send + Sync {
    async fn list_customers_by_email(
        &self,
        email: &str,
        limit: u8,
    ) -> Result<Vec<Customer>, StripeError>;

    async fn get_customer(&self, customer_id: &str) -> Result<Customer, StripeError>;

    async fn list_subscriptions(
        &self,
        customer_id: &str,
        status: SubscriptionStatus,
        limit: u8,
    ) -> Result<Vec<Subscription>, StripeError>;

    async fn cancel_subscription(&self, subscription_id: &str)
        -> Result<Subscription, StripeError>;

    /// Replace the price on an existing line item with a new monthly amount,
    /// without proration: the change takes effect next cycle.
    async fn update_subscription_amount(
        &self,
        subscription_id: &str,
        item_id: &str,
        product_id: &str,
        amount: Cents,
    ) -> Result<Subscription, StripeError>;

    /// Hosted checkout for a new monthly subscription. Exactly one of
    /// `customer_id` / `customer_email` should be set. The idempotency key
    /// collapses rapid duplicate submissions into one session at the provider.
    async fn create_subscription_checkout(
        &self,
        customer_id: Option<&str>,
        customer_email: Option<&str>,
        product_id: &str,
        amount: Cents,
        success_url: &str,
        cancel_url: &str,
        idempotency_key: &str,
    ) -> Result<CheckoutSession, StripeError>;

    /// Hosted checkout for a one-time payment
    async fn create_payment_checkout(
        &self,
        amount: Cents,
        name: &str,
        description: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, StripeError>;

    async fn create_portal_session(
        &self,
        configuration: &str,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, StripeError>;
}

// ---- REST implementation ----

pub struct StripeService {
    http: Client,
    secret_key: String,
    webhook_secret: Option<String>,
}

impl StripeService {
    pub fn new(http: Client, secret_key: String, webhook_secret: Option<String>) -> Self {
        Self {
            http,
            secret_key,
            webhook_secret,
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, StripeError> {
        let response = self
            .http
            .get(format!("{}{}", API_BASE, path))
            .bearer_auth(&self.secret_key)
            .query(query)
            .send()
            .await
            .map_err(|e| StripeError::RequestFailed(e.to_string()))?;

        Self::decode(response).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T, StripeError> {
        let response = self
            .http
            .post(format!("{}{}", API_BASE, path))
            .bearer_auth(&self.secret_key)
            .form(form)
            .send()
            .await
            .map_err(|e| StripeError::RequestFailed(e.to_string()))?;

        Self::decode(response).await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, StripeError> {
        let response = self
            .http
            .delete(format!("{}{}", API_BASE, path))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| StripeError::RequestFailed(e.to_string()))?;

        Self::decode(response).await
    }

    /// POST with an `Idempotency-Key`: the provider replays the original
    /// response for a repeated key instead of creating a second object.
    async fn post_idempotent<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(String, String)],
        idempotency_key: &str,
    ) -> Result<T, StripeError> {
        let response = self
            .http
            .post(format!("{}{}", API_BASE, path))
            .bearer_auth(&self.secret_key)
            .header("Idempotency-Key", idempotency_key)
            .form(form)
            .send()
            .await
            .map_err(|e| StripeError::RequestFailed(e.to_string()))?;

        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, StripeError> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ApiErrorEnvelope>()
                .await
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(StripeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| StripeError::Decode(e.to_string()))
    }

    /// Form parameters for an inline monthly price on the donation product
    fn monthly_price_params(prefix: &str, product_id: &str, amount: Cents) -> Vec<(String, String)> {
        vec![
            (format!("{}[currency]", prefix), "usd".to_string()),
            (format!("{}[product]", prefix), product_id.to_string()),
            (format!("{}[unit_amount]", prefix), amount.to_string()),
            (
                format!("{}[recurring][interval]", prefix),
                "month".to_string(),
            ),
        ]
    }

    /// Verify the webhook signature header and parse the event.
    ///
    /// The header carries a timestamp and one or more `v1` signatures over
    /// `"{timestamp}.{payload}"`. Verification is constant-time and bounded
    /// by a timestamp tolerance; only a verified payload is parsed.
    pub fn construct_event(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<Event, WebhookError> {
        let secret = self
            .webhook_secret
            .as_deref()
            .ok_or(WebhookError::MissingSecret)?;

        let mut timestamp: Option<i64> = None;
        let mut signatures: Vec<String> = Vec::new();
        for part in signature_header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = value.parse().ok(),
                Some(("v1", value)) => signatures.push(value.to_string()),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(WebhookError::BadHeader)?;
        if signatures.is_empty() {
            return Err(WebhookError::BadHeader);
        }

        if (Utc::now().timestamp() - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
            return Err(WebhookError::StaleTimestamp);
        }

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .expect("HMAC accepts keys of any size");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        let expected = hex::encode(mac.finalize().into_bytes());

        let verified = signatures
            .iter()
            .any(|sig| constant_time_eq(sig.as_bytes(), expected.as_bytes()));
        if !verified {
            return Err(WebhookError::BadSignature);
        }

        serde_json::from_slice(payload).map_err(|e| WebhookError::Parse(e.to_string()))
    }
}

#[async_trait]
impl BillingApi for StripeService {
    async fn list_customers_by_email(
        &self,
        email: &str,
        limit: u8,
    ) -> Result<Vec<Customer>, StripeError> {
        let limit = limit.to_string();
        let list: List<Customer> = self
            .get("/customers", &[("email", email), ("limit", &limit)])
            .await?;
        Ok(list.data)
    }

    async fn get_customer(&self, customer_id: &str) -> Result<Customer, StripeError> {
        self.get(&format!("/customers/{}", customer_id), &[]).await
    }

    async fn list_subscriptions(
        &self,
        customer_id: &str,
        status: SubscriptionStatus,
        limit: u8,
    ) -> Result<Vec<Subscription>, StripeError> {
        let limit = limit.to_string();
        let list: List<Subscription> = self
            .get(
                "/subscriptions",
                &[
                    ("customer", customer_id),
                    ("status", status.as_str()),
                    ("limit", &limit),
                ],
            )
            .await?;
        Ok(list.data)
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Subscription, StripeError> {
        debug!(subscription_id, "Cancelling subscription");
        // POST to /subscriptions/{id} is an update; cancellation is DELETE
        self.delete(&format!("/subscriptions/{}", subscription_id))
            .await
    }

    async fn update_subscription_amount(
        &self,
        subscription_id: &str,
        item_id: &str,
        product_id: &str,
        amount: Cents,
    ) -> Result<Subscription, StripeError> {
        debug!(subscription_id, item_id, amount, "Updating subscription amount in place");
        let mut form = vec![
            ("items[0][id]".to_string(), item_id.to_string()),
            ("proration_behavior".to_string(), "none".to_string()),
        ];
        form.extend(Self::monthly_price_params(
            "items[0][price_data]",
            product_id,
            amount,
        ));
        self.post(&format!("/subscriptions/{}", subscription_id), &form)
            .await
    }

    async fn create_subscription_checkout(
        &self,
        customer_id: Option<&str>,
        customer_email: Option<&str>,
        product_id: &str,
        amount: Cents,
        success_url: &str,
        cancel_url: &str,
        idempotency_key: &str,
    ) -> Result<CheckoutSession, StripeError> {
        let mut form = vec![
            ("mode".to_string(), "subscription".to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), success_url.to_string()),
            ("cancel_url".to_string(), cancel_url.to_string()),
        ];
        form.extend(Self::monthly_price_params(
            "line_items[0][price_data]",
            product_id,
            amount,
        ));
        match (customer_id, customer_email) {
            (Some(id), _) => form.push(("customer".to_string(), id.to_string())),
            (None, Some(email)) => form.push(("customer_email".to_string(), email.to_string())),
            (None, None) => {
                warn!("Creating subscription checkout with neither customer nor email")
            }
        }
        self.post_idempotent("/checkout/sessions", &form, idempotency_key)
            .await
    }

    async fn create_payment_checkout(
        &self,
        amount: Cents,
        name: &str,
        description: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, StripeError> {
        let form = vec![
            ("mode".to_string(), "payment".to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            (
                "line_items[0][price_data][currency]".to_string(),
                "usd".to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".to_string(),
                name.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][description]".to_string(),
                description.to_string(),
            ),
            (
                "line_items[0][price_data][unit_amount]".to_string(),
                amount.to_string(),
            ),
            ("success_url".to_string(), success_url.to_string()),
            ("cancel_url".to_string(), cancel_url.to_string()),
        ];
        self.post("/checkout/sessions", &form).await
    }

    async fn create_portal_session(
        &self,
        configuration: &str,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, StripeError> {
        let form = vec![
            ("configuration".to_string(), configuration.to_string()),
            ("customer".to_string(), customer_id.to_string()),
            ("return_url".to_string(), return_url.to_string()),
        ];
        self.post("/billing_portal/sessions", &form).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> StripeService {
        StripeService::new(
            Client::new(),
            "sk_test_xxx".to_string(),
            Some("whsec_test123secret456".to_string()),
        )
    }

    fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}.", timestamp).as_bytes());
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    const PAYLOAD: &[u8] = br#"{"id":"evt_1","type":"invoice.paid","data":{"object":{"billing_reason":"subscription_create","customer_email":"a@b.com","amount_paid":5000}}}"#;

    #[test]
    fn valid_signature_is_accepted_and_parsed() {
        let svc = service();
        let t = Utc::now().timestamp();
        let header = format!("t={},v1={}", t, sign(PAYLOAD, "whsec_test123secret456", t));

        let event = svc.construct_event(PAYLOAD, &header).unwrap();
        assert_eq!(event.event_type, "invoice.paid");
        assert_eq!(event.id, "evt_1");
    }

    #[test]
    fn wrong_secret_signature_is_rejected() {
        let svc = service();
        let t = Utc::now().timestamp();
        let header = format!("t={},v1={}", t, sign(PAYLOAD, "whsec_wrong", t));

        assert_eq!(
            svc.construct_event(PAYLOAD, &header),
            Err(WebhookError::BadSignature)
        );
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let svc = service();
        let t = Utc::now().timestamp();
        let header = format!("t={},v1={}", t, sign(PAYLOAD, "whsec_test123secret456", t));

        let tampered = br#"{"id":"evt_2","type":"invoice.paid","data":{"object":{}}}"#;
        assert_eq!(
            svc.construct_event(tampered, &header),
            Err(WebhookError::BadSignature)
        );
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let svc = service();
        let t = Utc::now().timestamp() - 600;
        let header = format!("t={},v1={}", t, sign(PAYLOAD, "whsec_test123secret456", t));

        assert_eq!(
            svc.construct_event(PAYLOAD, &header),
            Err(WebhookError::StaleTimestamp)
        );
    }

    #[test]
    fn malformed_header_is_rejected() {
        let svc = service();
        assert_eq!(
            svc.construct_event(PAYLOAD, "nonsense"),
            Err(WebhookError::BadHeader)
        );
        assert_eq!(
            svc.construct_event(PAYLOAD, "t=123"),
            Err(WebhookError::BadHeader)
        );
    }

    #[test]
    fn missing_secret_is_rejected() {
        let svc = StripeService::new(Client::new(), "sk_test_xxx".to_string(), None);
        assert_eq!(
            svc.construct_event(PAYLOAD, "t=1,v1=abc"),
            Err(WebhookError::MissingSecret)
        );
    }

    #[test]
    fn subscription_status_deserializes_snake_case() {
        let sub: Subscription = serde_json::from_str(
            r#"{"id":"sub_1","status":"past_due","customer":"cus_1","items":{"data":[]}}"#,
        )
        .unwrap();
        assert_eq!(sub.status, SubscriptionStatus::PastDue);

        let sub: Subscription = serde_json::from_str(
            r#"{"id":"sub_2","status":"something_new","customer":null}"#,
        )
        .unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Unknown);
        assert!(sub.items.data.is_empty());
    }
}
