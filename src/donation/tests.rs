//! Donation manager tests

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::common::Cents;
use crate::services::stripe::{
    BillingApi, CheckoutSession, Customer, PortalSession, StripeError, Subscription,
    SubscriptionStatus,
};

use super::manager::DonationManager;
use super::models::DonationErrorCode;

/// Minimal fake: only the payment-checkout call matters here.
#[derive(Default)]
struct FakeBilling {
    checkouts: Mutex<Vec<(Cents, String, String, String)>>,
    fail: bool,
}

#[async_trait]
impl BillingApi for FakeBilling {
    async fn list_customers_by_email(
        &self,
        _email: &str,
        _limit: u8,
    ) -> Result<Vec<Customer>, StripeError> {
        unimplemented!("not exercised by donation tests")
    }

    async fn get_customer(&self, _customer_id: &str) -> Result<Customer, StripeError> {
        unimplemented!("not exercised by donation tests")
    }

    async fn list_subscriptions(
        &self,
        _customer_id: &str,
        _status: SubscriptionStatus,
        _limit: u8,
    ) -> Result<Vec<Subscription>, StripeError> {
        unimplemented!("not exercised by donation tests")
    }

    async fn cancel_subscription(
        &self,
        _subscription_id: &str,
    ) -> Result<Subscription, StripeError> {
        unimplemented!("not exercised by donation tests")
    }

    async fn update_subscription_amount(
        &self,
        _subscription_id: &str,
        _item_id: &str,
        _product_id: &str,
        _amount: Cents,
    ) -> Result<Subscription, StripeError> {
        unimplemented!("not exercised by donation tests")
    }

    async fn create_subscription_checkout(
        &self,
        _customer_id: Option<&str>,
        _customer_email: Option<&str>,
        _product_id: &str,
        _amount: Cents,
        _success_url: &str,
        _cancel_url: &str,
        _idempotency_key: &str,
    ) -> Result<CheckoutSession, StripeError> {
        unimplemented!("not exercised by donation tests")
    }

    async fn create_payment_checkout(
        &self,
        amount: Cents,
        name: &str,
        _description: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, StripeError> {
        if self.fail {
            return Err(StripeError::Api {
                status: 500,
                message: "boom".to_string(),
            });
        }
        self.checkouts.lock().unwrap().push((
            amount,
            name.to_string(),
            success_url.to_string(),
            cancel_url.to_string(),
        ));
        Ok(CheckoutSession {
            id: "cs_test_1".to_string(),
            url: Some("https://checkout.example/cs_test_1".to_string()),
        })
    }

    async fn create_portal_session(
        &self,
        _configuration: &str,
        _customer_id: &str,
        _return_url: &str,
    ) -> Result<PortalSession, StripeError> {
        unimplemented!("not exercised by donation tests")
    }
}

#[tokio::test]
async fn donate_creates_payment_checkout() {
    let billing: Arc<FakeBilling> = Arc::default();
    let manager = DonationManager::new(billing.clone(), "http://localhost:3000");

    let result = manager.donate(1337).await.unwrap();
    assert_eq!(result.url, "https://checkout.example/cs_test_1");

    let checkouts = billing.checkouts.lock().unwrap();
    assert_eq!(checkouts.len(), 1);
    let (amount, _, success_url, cancel_url) = &checkouts[0];
    assert_eq!(*amount, 1337);
    assert_eq!(success_url, "http://localhost:3000/thank-you");
    assert_eq!(cancel_url, "http://localhost:3000/");
}

#[tokio::test]
async fn donate_rejects_amount_below_minimum() {
    let billing: Arc<FakeBilling> = Arc::default();
    let manager = DonationManager::new(billing.clone(), "http://localhost:3000");

    assert_eq!(
        manager.donate(199).await,
        Err(DonationErrorCode::InvalidAmount)
    );
    assert!(billing.checkouts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn donate_provider_failure_maps_to_session_error() {
    let billing = Arc::new(FakeBilling {
        fail: true,
        ..Default::default()
    });
    let manager = DonationManager::new(billing, "http://localhost:3000");

    assert_eq!(
        manager.donate(5000).await,
        Err(DonationErrorCode::SessionError)
    );
}
