use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use tracing::{error, info};

use crate::gateway::{ChargeError, ChargeOutcome, ChargeRequest};

/// Minimal Stripe PaymentIntents client built on reqwest.
pub struct StripeGateway {
    http: reqwest::Client,
    secret_key: String,
    deployment_domain: String,
}

#[derive(Debug, Deserialize)]
struct PaymentIntentResp {
    id: String,
    status: String,
    created: Option<i64>,
    latest_charge: Option<StripeCharge>,
}

#[derive(Debug, Deserialize)]
struct StripeCharge {
    payment_method_details: Option<StripePaymentMethodDetails>,
}

#[derive(Debug, Deserialize)]
struct StripePaymentMethodDetails {
    card: Option<StripeCardDetails>,
}

#[derive(Debug, Deserialize)]
struct StripeCardDetails {
    brand: Option<String>,
    last4: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    #[serde(rename = "type")]
    type_: Option<String>,
    code: Option<String>,
    message: Option<String>,
    decline_code: Option<String>,
}

impl StripeGateway {
    pub fn new(secret_key: String, deployment_domain: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key,
            deployment_domain,
        }
    }

    /// Creates and confirms an off-session PaymentIntent against a stored
    /// payment method. https://stripe.com/docs/api/payment_intents/create
    pub async fn charge(&self, request: &ChargeRequest) -> Result<ChargeOutcome, ChargeError> {
        let return_url = if request.return_url.is_empty() {
            format!("https://app.{}/confirm-payment-intent", self.deployment_domain)
        } else {
            request.return_url.clone()
        };

        let body: Vec<(String, String)> = vec![
            ("amount".to_string(), request.amount_cents.to_string()),
            ("currency".to_string(), request.currency.clone()),
            ("customer".to_string(), request.customer_ref.clone()),
            (
                "payment_method".to_string(),
                request.payment_method_ref.clone(),
            ),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
            ("off_session".to_string(), "true".to_string()),
            ("confirm".to_string(), "true".to_string()),
            ("return_url".to_string(), return_url),
            (
                "statement_descriptor_suffix".to_string(),
                request.descriptor_suffix.clone(),
            ),
            ("expand[]".to_string(), "latest_charge".to_string()),
        ];

        info!(
            idempotency_key = %request.idempotency_key,
            amount_cents = request.amount_cents,
            "creating stripe payment intent"
        );

        let resp = self
            .http
            .post("https://api.stripe.com/v1/payment_intents")
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header("Idempotency-Key", &request.idempotency_key)
            .form(&body)
            .send()
            .await
            .map_err(|err| ChargeError::Provider(err.into()))?;

        if !resp.status().is_success() {
            return Err(Self::decode_failure(resp).await);
        }

        let intent: PaymentIntentResp = resp
            .json()
            .await
            .map_err(|err| ChargeError::Provider(err.into()))?;

        info!(
            payment_intent = %intent.id,
            status = %intent.status,
            "stripe payment intent processed"
        );

        let card = intent
            .latest_charge
            .and_then(|charge| charge.payment_method_details)
            .and_then(|details| details.card);

        Ok(ChargeOutcome {
            provider_id: intent.id,
            status: intent.status,
            card_brand: card
                .as_ref()
                .and_then(|card| card.brand.clone())
                .unwrap_or_default(),
            card_last_4: card
                .as_ref()
                .and_then(|card| card.last4.clone())
                .unwrap_or_default(),
            created_at: intent.created.unwrap_or_default(),
        })
    }

    async fn decode_failure(resp: reqwest::Response) -> ChargeError {
        let status = resp.status();
        let request_id = resp
            .headers()
            .get("request-id")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let details = serde_json::from_str::<StripeErrorEnvelope>(&body)
            .ok()
            .map(|envelope| envelope.error);

        error!(
            status = %status,
            stripe_request_id = ?request_id,
            stripe_error_type = ?details.as_ref().and_then(|d| d.type_.clone()),
            stripe_error_code = ?details.as_ref().and_then(|d| d.code.clone()),
            stripe_decline_code = ?details.as_ref().and_then(|d| d.decline_code.clone()),
            response_body = %body,
            "stripe charge failed"
        );

        match details {
            Some(details) if details.type_.as_deref() == Some("card_error") => {
                let reason = details
                    .decline_code
                    .or(details.code)
                    .or(details.message)
                    .unwrap_or_else(|| "card declined".to_string());
                ChargeError::Declined { reason }
            }
            _ => ChargeError::Provider(anyhow::anyhow!(
                "stripe charge failed (status {status}, request_id={request_id:?})"
            )),
        }
    }
}
