//! Payment endpoints.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::api::AppState;
use crate::auth::Identity;
use crate::error::ApiError;
use crate::payments::minor_units;

#[derive(Debug, Deserialize)]
pub struct PaymentIntentRequest {
    pub price: f64,
}

#[derive(Debug, Serialize)]
pub struct PaymentIntentResponse {
    #[serde(rename = "clientSecret")]
    pub client_secret: String,
}

/// POST /create-payment-intent - Charge intent for a contest entry fee
///
/// Amounts below one minor unit yield an empty secret without contacting
/// the processor.
pub async fn create_payment_intent(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(req): Json<PaymentIntentRequest>,
) -> Result<Json<PaymentIntentResponse>, ApiError> {
    let Some(amount) = minor_units(req.price) else {
        debug!(
            "Skipping payment intent for {}: price {} is below one minor unit",
            identity.email, req.price
        );
        return Ok(Json(PaymentIntentResponse {
            client_secret: String::new(),
        }));
    };

    let client_secret = state.charges.create(amount, &state.currency).await?;
    Ok(Json(PaymentIntentResponse { client_secret }))
}
