use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::entities::subscriptions::SubscriptionEntity;
use crate::value_objects::enums::billing_cycles::BillingCycle;
use crate::value_objects::subscriptions::BillingCandidate;

#[async_trait]
#[automock]
pub trait SubscriptionRepository {
    /// Active subscriptions on the given billing cycle, joined to the
    /// workspace creator, in subscription-id order.
    async fn list_active_by_cycle(&self, cycle: BillingCycle) -> Result<Vec<BillingCandidate>>;

    async fn find_by_id(&self, subscription_id: i64) -> Result<Option<SubscriptionEntity>>;
}
