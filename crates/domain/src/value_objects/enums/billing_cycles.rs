use std::fmt::Display;

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

/// One scheduled billing window. The debug cycle fires every minute and
/// simulates monthly data; production cycles are monthly and annual.
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingCycle {
    #[default]
    Monthly,
    Annual,
    MonthlyDebug,
}

impl Display for BillingCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cycle = match self {
            BillingCycle::Monthly => "MONTHLY",
            BillingCycle::Annual => "ANNUAL",
            BillingCycle::MonthlyDebug => "MONTHLY_DEBUG",
        };
        write!(f, "{}", cycle)
    }
}

impl BillingCycle {
    pub fn from_str(value: &str) -> Self {
        match value {
            "ANNUAL" => BillingCycle::Annual,
            "MONTHLY_DEBUG" => BillingCycle::MonthlyDebug,
            _ => BillingCycle::Monthly,
        }
    }

    /// The cycle whose subscription population this cycle enumerates. Debug
    /// runs bill the monthly population.
    pub fn query_cycle(&self) -> BillingCycle {
        match self {
            BillingCycle::MonthlyDebug => BillingCycle::Monthly,
            other => *other,
        }
    }

    /// Start of the billing window that closes at `now`.
    pub fn period_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let months = match self {
            BillingCycle::Annual => 12,
            BillingCycle::Monthly | BillingCycle::MonthlyDebug => 1,
        };
        now.checked_sub_months(Months::new(months)).unwrap_or(now)
    }

    /// Allowances and membership are granted per month; annual invoices carry
    /// twelve grants.
    pub fn months_billed(&self) -> i64 {
        match self {
            BillingCycle::Annual => 12,
            BillingCycle::Monthly | BillingCycle::MonthlyDebug => 1,
        }
    }
}
