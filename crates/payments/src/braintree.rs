use tracing::warn;

use crate::gateway::{ChargeError, ChargeOutcome, ChargeRequest};

/// Braintree variant of the gateway. The deployment can be configured for it,
/// but recurring charges through Braintree are not supported yet; callers get
/// a typed provider error rather than a silent no-op.
pub struct BraintreeGateway {
    api_key: String,
}

impl BraintreeGateway {
    pub fn new(api_key: String) -> Self {
        Self { api_key }
    }

    pub async fn charge(&self, request: &ChargeRequest) -> Result<ChargeOutcome, ChargeError> {
        warn!(
            idempotency_key = %request.idempotency_key,
            configured = !self.api_key.is_empty(),
            "braintree charge requested but the provider is not supported yet"
        );
        Err(ChargeError::Provider(anyhow::anyhow!(
            "braintree provider is not supported yet"
        )))
    }
}
