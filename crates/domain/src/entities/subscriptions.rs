use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::schema::subscriptions;
use crate::value_objects::enums::billing_actions::BillingAction;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = subscriptions)]
pub struct SubscriptionEntity {
    pub id: i64,
    pub workspace_id: i64,
    pub current_plan_id: i64,
    pub scheduled_plan_id: Option<i64>,
    pub scheduled_effective_at: Option<DateTime<Utc>>,
    pub provider_subscription_id: Option<String>,
    pub billing_cycle: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionEntity {
    /// Resolves the plan the cycle should bill: a scheduled plan change whose
    /// effective date has passed wins over the current plan.
    pub fn effective_plan(&self, now: DateTime<Utc>) -> (BillingAction, i64) {
        match (self.scheduled_plan_id, self.scheduled_effective_at) {
            (Some(plan_id), Some(effective_at)) if effective_at <= now => {
                (BillingAction::Upgrade, plan_id)
            }
            _ => (BillingAction::Renewal, self.current_plan_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_subscription() -> SubscriptionEntity {
        let now = Utc::now();
        SubscriptionEntity {
            id: 1,
            workspace_id: 10,
            current_plan_id: 3,
            scheduled_plan_id: None,
            scheduled_effective_at: None,
            provider_subscription_id: None,
            billing_cycle: "MONTHLY".to_string(),
            status: "active".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn renewal_when_nothing_scheduled() {
        let subscription = sample_subscription();
        let (action, plan_id) = subscription.effective_plan(Utc::now());
        assert_eq!(action, BillingAction::Renewal);
        assert_eq!(plan_id, 3);
    }

    #[test]
    fn upgrade_when_scheduled_date_has_passed() {
        let mut subscription = sample_subscription();
        subscription.scheduled_plan_id = Some(7);
        subscription.scheduled_effective_at = Some(Utc::now() - Duration::days(1));

        let (action, plan_id) = subscription.effective_plan(Utc::now());
        assert_eq!(action, BillingAction::Upgrade);
        assert_eq!(plan_id, 7);
    }

    #[test]
    fn renewal_when_scheduled_date_is_in_the_future() {
        let mut subscription = sample_subscription();
        subscription.scheduled_plan_id = Some(7);
        subscription.scheduled_effective_at = Some(Utc::now() + Duration::days(5));

        let (action, plan_id) = subscription.effective_plan(Utc::now());
        assert_eq!(action, BillingAction::Renewal);
        assert_eq!(plan_id, 3);
    }

    #[test]
    fn renewal_when_scheduled_plan_has_no_date() {
        let mut subscription = sample_subscription();
        subscription.scheduled_plan_id = Some(7);

        let (action, plan_id) = subscription.effective_plan(Utc::now());
        assert_eq!(action, BillingAction::Renewal);
        assert_eq!(plan_id, 3);
    }
}
