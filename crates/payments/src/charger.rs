use async_trait::async_trait;
use mockall::automock;

use domain::entities::billing_params::BillingParamsEntity;

use crate::gateway::{ChargeError, ChargeOutcome, ChargeRequest, PaymentGateway};

/// Seam between billing flows and the payment provider. The production
/// implementation builds the configured gateway per charge; tests mock it.
#[async_trait]
#[automock]
pub trait CardCharger: Send + Sync {
    async fn charge(
        &self,
        params: &BillingParamsEntity,
        request: &ChargeRequest,
    ) -> Result<ChargeOutcome, ChargeError>;
}

pub struct GatewayCharger {
    deployment_domain: String,
}

impl GatewayCharger {
    pub fn new(deployment_domain: String) -> Self {
        Self { deployment_domain }
    }
}

#[async_trait]
impl CardCharger for GatewayCharger {
    async fn charge(
        &self,
        params: &BillingParamsEntity,
        request: &ChargeRequest,
    ) -> Result<ChargeOutcome, ChargeError> {
        let gateway = PaymentGateway::from_params(params, &self.deployment_domain)?;
        let request = ChargeRequest {
            descriptor_suffix: format!("{} invoice", self.deployment_domain),
            return_url: format!(
                "https://app.{}/confirm-payment-intent",
                self.deployment_domain
            ),
            ..request.clone()
        };
        gateway.charge(&request).await
    }
}
