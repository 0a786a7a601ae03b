use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use domain::{
    repositories::{
        kv::KeyValueStore,
        subscriptions::SubscriptionRepository,
        tasks::{BillingTaskPublisher, PublishOutcome},
    },
    value_objects::{
        billing_tasks::BillingTask, enums::billing_cycles::BillingCycle,
        subscriptions::BillingCandidate,
    },
};

use crate::cycle::CycleKeys;

/// Upper bound on one full enumeration, cascaded into every suspension point
/// inside it.
const CYCLE_DEADLINE: Duration = Duration::from_secs(2 * 60 * 60);

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub published: usize,
    pub skipped_dedup: usize,
    pub failed_publishes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// Another replica owns this window; this run did nothing.
    LockHeld,
}

/// Emits exactly one billing task per eligible subscription per cycle, across
/// any number of replicas. The cycle lock elects one enumerator per window;
/// per-tenant dedup keys keep a re-trigger from double-publishing; publisher
/// confirms gate when a dedup key is allowed to stay.
pub struct Distributor<S, K>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    K: KeyValueStore + Send + Sync + 'static,
{
    subscription_repo: Arc<S>,
    kv: Arc<K>,
}

impl<S, K> Distributor<S, K>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    K: KeyValueStore + Send + Sync + 'static,
{
    pub fn new(subscription_repo: Arc<S>, kv: Arc<K>) -> Self {
        Self {
            subscription_repo,
            kv,
        }
    }

    /// One fire of the cron trigger. `open_publisher` is only invoked after
    /// the lock is won, so losing replicas never touch the broker.
    pub async fn run_cycle<P, F, Fut>(
        &self,
        cycle: BillingCycle,
        now: DateTime<Utc>,
        open_publisher: F,
    ) -> Result<CycleOutcome>
    where
        P: BillingTaskPublisher + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<P>>,
    {
        let keys = CycleKeys::at(cycle, now);
        let lock_key = keys.lock_key();

        let locked = self
            .kv
            .set_if_absent(&lock_key, "running", keys.lock_ttl())
            .await
            .context("cycle lock service unreachable")?;
        if !locked {
            info!(cycle = %cycle, lock_key = %lock_key, "skip: lock held by another instance");
            return Ok(CycleOutcome::LockHeld);
        }
        info!(cycle = %cycle, lock_key = %lock_key, "lock acquired; distributing");

        // The lock is deliberately never released: its TTL bounds the window
        // and keeps crash-mid-enumeration semantics simple.
        let publisher = open_publisher()
            .await
            .context("could not open task publisher")?;

        let report = tokio::time::timeout(
            CYCLE_DEADLINE,
            self.distribute(&keys, now, &publisher, &lock_key),
        )
        .await
        .context("cycle deadline exceeded")??;

        info!(
            cycle = %cycle,
            published = report.published,
            skipped_dedup = report.skipped_dedup,
            failed_publishes = report.failed_publishes,
            "distribution finished"
        );

        Ok(CycleOutcome::Completed(report))
    }

    async fn distribute<P>(
        &self,
        keys: &CycleKeys,
        now: DateTime<Utc>,
        publisher: &P,
        run_id: &str,
    ) -> Result<CycleReport>
    where
        P: BillingTaskPublisher + Send + Sync,
    {
        let candidates = self
            .subscription_repo
            .list_active_by_cycle(keys.cycle())
            .await
            .context("could not enumerate cycle population")?;

        let mut report = CycleReport::default();

        for candidate in candidates {
            let workspace_id = candidate.subscription.workspace_id;
            let dedup_key = keys.dedup_key(workspace_id);

            match self
                .kv
                .set_if_absent(&dedup_key, "true", keys.dedup_ttl())
                .await
            {
                Ok(true) => {}
                Ok(false) => {
                    report.skipped_dedup += 1;
                    continue;
                }
                Err(err) => {
                    error!(workspace_id, error = %err, "dedup check failed; skipping row");
                    continue;
                }
            }

            let task = Self::build_task(keys.cycle(), run_id, &candidate, now);

            match publisher.publish(&task).await {
                Ok(PublishOutcome::Confirmed) => {
                    report.published += 1;
                }
                Ok(PublishOutcome::Rejected) => {
                    warn!(workspace_id, "broker rejected billing task; rolling back dedup key");
                    self.rollback_dedup(&dedup_key).await;
                    report.failed_publishes += 1;
                }
                Ok(PublishOutcome::TimedOut) => {
                    warn!(workspace_id, "timed out waiting for broker confirm; rolling back dedup key");
                    self.rollback_dedup(&dedup_key).await;
                    report.failed_publishes += 1;
                }
                Err(err) => {
                    error!(workspace_id, error = %err, "publish error; rolling back dedup key");
                    self.rollback_dedup(&dedup_key).await;
                    report.failed_publishes += 1;
                }
            }
        }

        Ok(report)
    }

    fn build_task(
        cycle: BillingCycle,
        run_id: &str,
        candidate: &BillingCandidate,
        now: DateTime<Utc>,
    ) -> BillingTask {
        let (action, plan_to_bill) = candidate.subscription.effective_plan(now);

        BillingTask {
            run_id: run_id.to_string(),
            billing_type: cycle,
            workspace_id: candidate.subscription.workspace_id,
            creator_id: candidate.creator_id,
            subscription_id: candidate.subscription.id,
            action,
            plan_to_bill,
            provider_subscription_id: candidate.subscription.provider_subscription_id.clone(),
        }
    }

    async fn rollback_dedup(&self, dedup_key: &str) {
        if let Err(err) = self.kv.delete(dedup_key).await {
            // A later cycle within the dedup TTL will skip this tenant.
            error!(dedup_key, error = %err, "failed to roll back dedup key");
        }
    }
}
