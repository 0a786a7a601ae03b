use crate::entities::subscriptions::SubscriptionEntity;

/// One row of the distributor's cycle population: an active subscription
/// joined to its workspace's creator.
#[derive(Debug, Clone)]
pub struct BillingCandidate {
    pub subscription: SubscriptionEntity,
    pub creator_id: i64,
}
