use anyhow::Result;
use async_trait::async_trait;
use diesel::{OptionalExtension, RunQueryDsl, prelude::*};
use std::sync::Arc;

use crate::db::postgres_connection::PgPoolSquad;
use domain::{
    entities::subscriptions::SubscriptionEntity,
    repositories::subscriptions::SubscriptionRepository,
    schema::{subscriptions, workspaces},
    value_objects::{
        enums::{billing_cycles::BillingCycle, subscription_statuses::SubscriptionStatus},
        subscriptions::BillingCandidate,
    },
};

pub struct SubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SubscriptionRepository for SubscriptionPostgres {
    async fn list_active_by_cycle(&self, cycle: BillingCycle) -> Result<Vec<BillingCandidate>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = subscriptions::table
            .inner_join(workspaces::table)
            .filter(subscriptions::status.eq(SubscriptionStatus::Active.to_string()))
            .filter(subscriptions::billing_cycle.eq(cycle.query_cycle().to_string()))
            .order(subscriptions::id.asc())
            .select((SubscriptionEntity::as_select(), workspaces::creator_id))
            .load::<(SubscriptionEntity, i64)>(&mut conn)?;

        Ok(rows
            .into_iter()
            .map(|(subscription, creator_id)| BillingCandidate {
                subscription,
                creator_id,
            })
            .collect())
    }

    async fn find_by_id(&self, subscription_id: i64) -> Result<Option<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let subscription = subscriptions::table
            .filter(subscriptions::id.eq(subscription_id))
            .select(SubscriptionEntity::as_select())
            .first::<SubscriptionEntity>(&mut conn)
            .optional()?;

        Ok(subscription)
    }
}
