use std::time::Duration;

use chrono::{DateTime, Utc};

use domain::value_objects::enums::billing_cycles::BillingCycle;

/// Dedup keys outlive the cycle so a late re-trigger cannot re-queue a tenant.
const DEDUP_TTL: Duration = Duration::from_secs(31 * 24 * 60 * 60);

/// Production lock TTL: shorter than the smallest gap between two fires of
/// the same cycle, long enough to cover any realistic enumeration.
const PRODUCTION_LOCK_TTL: Duration = Duration::from_secs(23 * 60 * 60);

/// Debug lock TTL expires just before the next per-minute trigger.
const DEBUG_LOCK_TTL: Duration = Duration::from_secs(50);

/// The key material for one fire of one cycle: the suffix identifies the
/// window, the lock key elects a single distributor, and the dedup keys mark
/// tenants already queued within it.
#[derive(Debug, Clone)]
pub struct CycleKeys {
    cycle: BillingCycle,
    suffix: String,
}

impl CycleKeys {
    pub fn at(cycle: BillingCycle, now: DateTime<Utc>) -> Self {
        let suffix = match cycle {
            BillingCycle::Annual => now.format("%Y").to_string(),
            BillingCycle::Monthly => now.format("%Y-%m").to_string(),
            BillingCycle::MonthlyDebug => now.format("%Y-%m-%d-%H:%M").to_string(),
        };
        Self { cycle, suffix }
    }

    pub fn cycle(&self) -> BillingCycle {
        self.cycle
    }

    pub fn lock_key(&self) -> String {
        format!("billing_run_lock:{}:{}", self.cycle, self.suffix)
    }

    pub fn lock_ttl(&self) -> Duration {
        match self.cycle {
            BillingCycle::MonthlyDebug => DEBUG_LOCK_TTL,
            BillingCycle::Monthly | BillingCycle::Annual => PRODUCTION_LOCK_TTL,
        }
    }

    pub fn dedup_key(&self, workspace_id: i64) -> String {
        format!("queued:{}:{}:{}", self.cycle, workspace_id, self.suffix)
    }

    pub fn dedup_ttl(&self) -> Duration {
        DEDUP_TTL
    }
}
