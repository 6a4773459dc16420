//! Payment intents
//!
//! The platform never handles card data. It only asks the payment processor
//! for a charge intent and hands the client secret back to the browser, which
//! completes the payment directly with the processor.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_PAYMENT_API_BASE: &str = "https://api.stripe.com";
pub const DEFAULT_CURRENCY: &str = "usd";

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment processor is not configured")]
    NotConfigured,

    #[error("payment request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("payment processor rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Creates charge intents with the external processor
#[async_trait]
pub trait ChargeIntentCreator: Send + Sync {
    /// Returns the client secret for an intent of `amount` minor units
    async fn create(&self, amount: i64, currency: &str) -> Result<String, PaymentError>;
}

/// Convert a price in major units to minor units.
///
/// `None` means the amount is below one minor unit (or not a number) and no
/// intent should be created.
pub fn minor_units(price: f64) -> Option<i64> {
    let amount = price * 100.0;
    if !amount.is_finite() || amount < 1.0 {
        return None;
    }
    Some(amount.round() as i64)
}

// ============================================================================
// STRIPE
// ============================================================================

#[derive(Debug, Deserialize)]
struct PaymentIntentResponse {
    client_secret: String,
}

/// Stripe `payment_intents` client
pub struct StripeCharges {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl StripeCharges {
    pub fn new(base_url: &str, secret_key: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        }
    }
}

#[async_trait]
impl ChargeIntentCreator for StripeCharges {
    async fn create(&self, amount: i64, currency: &str) -> Result<String, PaymentError> {
        let url = format!("{}/v1/payment_intents", self.base_url);
        let amount = amount.to_string();
        let form = [
            ("amount", amount.as_str()),
            ("currency", currency),
            ("payment_method_types[]", "card"),
        ];

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let intent: PaymentIntentResponse = response.json().await?;
        info!("Created payment intent for {} {}", amount, currency);
        Ok(intent.client_secret)
    }
}

/// Stand-in used when no processor key is configured
pub struct UnconfiguredCharges;

#[async_trait]
impl ChargeIntentCreator for UnconfiguredCharges {
    async fn create(&self, _amount: i64, _currency: &str) -> Result<String, PaymentError> {
        debug!("Payment intent requested without a configured processor");
        Err(PaymentError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn test_minor_units() {
        assert_eq!(minor_units(10.0), Some(1000));
        assert_eq!(minor_units(19.99), Some(1999));
        assert_eq!(minor_units(0.01), Some(1));
        assert_eq!(minor_units(0.005), None);
        assert_eq!(minor_units(0.0), None);
        assert_eq!(minor_units(-5.0), None);
        assert_eq!(minor_units(f64::NAN), None);
    }

    #[tokio::test]
    async fn test_stripe_create_intent() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/payment_intents")
                    .header("authorization", "Bearer sk_test_123")
                    .body_contains("amount=1000")
                    .body_contains("currency=usd");
                then.status(200)
                    .json_body(serde_json::json!({ "id": "pi_1", "client_secret": "pi_1_secret" }));
            })
            .await;

        let charges = StripeCharges::new(&server.base_url(), "sk_test_123");
        let secret = charges.create(1000, "usd").await.unwrap();

        assert_eq!(secret, "pi_1_secret");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_stripe_error_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/payment_intents");
                then.status(402)
                    .json_body(serde_json::json!({ "error": { "message": "card declined" } }));
            })
            .await;

        let charges = StripeCharges::new(&server.base_url(), "sk_test_123");
        let err = charges.create(1000, "usd").await.unwrap_err();
        assert!(matches!(err, PaymentError::Rejected { status: 402, .. }));
    }
}
