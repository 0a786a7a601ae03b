use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::value_objects::billing_tasks::BillingTask;

/// Broker verdict on a confirmed publish. A task counts as queued only on
/// `Confirmed`; anything else rolls back the tenant's dedup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Confirmed,
    Rejected,
    TimedOut,
}

#[async_trait]
#[automock]
pub trait BillingTaskPublisher {
    async fn publish(&self, task: &BillingTask) -> Result<PublishOutcome>;
}
