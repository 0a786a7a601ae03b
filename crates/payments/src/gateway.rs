use chrono::{DateTime, Utc};
use domain::entities::billing_params::BillingParamsEntity;
use thiserror::Error;

use crate::braintree::BraintreeGateway;
use crate::stripe::StripeGateway;

/// One off-session charge against a stored payment method.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub customer_ref: String,
    pub payment_method_ref: String,
    pub amount_cents: i64,
    pub currency: String,
    pub idempotency_key: String,
    pub descriptor_suffix: String,
    pub return_url: String,
}

#[derive(Debug, Clone)]
pub struct ChargeOutcome {
    pub provider_id: String,
    pub status: String,
    pub card_brand: String,
    pub card_last_4: String,
    pub created_at: i64,
}

#[derive(Debug, Error)]
pub enum ChargeError {
    #[error("no primary payment method on file")]
    NoPaymentMethod,
    #[error("charge declined: {reason}")]
    Declined { reason: String },
    #[error(transparent)]
    Provider(#[from] anyhow::Error),
}

/// The active payment provider, chosen once per task from the loaded billing
/// parameters.
pub enum PaymentGateway {
    Stripe(StripeGateway),
    Braintree(BraintreeGateway),
}

impl PaymentGateway {
    pub fn from_params(
        params: &BillingParamsEntity,
        deployment_domain: &str,
    ) -> Result<Self, ChargeError> {
        match params.provider.as_str() {
            "stripe" => Ok(PaymentGateway::Stripe(StripeGateway::new(
                params.stripe_private_key.clone(),
                deployment_domain.to_string(),
            ))),
            "braintree" => Ok(PaymentGateway::Braintree(BraintreeGateway::new(
                params.braintree_api_key.clone().unwrap_or_default(),
            ))),
            other => Err(ChargeError::Provider(anyhow::anyhow!(
                "unknown payment provider: {other}"
            ))),
        }
    }

    pub async fn charge(&self, request: &ChargeRequest) -> Result<ChargeOutcome, ChargeError> {
        match self {
            PaymentGateway::Stripe(stripe) => stripe.charge(request).await,
            PaymentGateway::Braintree(braintree) => braintree.charge(request).await,
        }
    }
}

/// Deterministic provider idempotency key: identical retried requests for the
/// same workspace, day and amount collapse into a single charge.
pub fn create_idempotency_key(workspace_id: i64, now: DateTime<Utc>, amount_cents: i64) -> String {
    format!("{}_{}_{}", workspace_id, now.format("%Y%m%d"), amount_cents)
}
