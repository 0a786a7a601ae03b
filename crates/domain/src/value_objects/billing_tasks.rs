use serde::{Deserialize, Serialize};

use crate::value_objects::enums::{
    billing_actions::BillingAction, billing_cycles::BillingCycle,
};

/// Queue payload published by the distributor and consumed by the billing
/// workers. Immutable once published; `run_id` is the cycle lock key the
/// emitting run held.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BillingTask {
    pub run_id: String,
    pub billing_type: BillingCycle,
    pub workspace_id: i64,
    pub creator_id: i64,
    pub subscription_id: i64,
    pub action: BillingAction,
    pub plan_to_bill: i64,
    pub provider_subscription_id: Option<String>,
}
