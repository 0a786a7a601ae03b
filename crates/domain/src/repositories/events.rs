use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::value_objects::billing_events::{FailedPaymentEvent, PaymentReceiptEvent};

/// Outbound event stream for downstream email and ledger consumers.
#[async_trait]
#[automock]
pub trait BillingEventPublisher {
    async fn publish_receipt(&self, event: &PaymentReceiptEvent) -> Result<()>;

    async fn publish_failure(&self, event: &FailedPaymentEvent) -> Result<()>;
}
