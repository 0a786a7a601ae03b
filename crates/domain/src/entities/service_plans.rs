use diesel::prelude::*;

use crate::schema::service_plans;

/// Plan catalog entry. Costs are integer cents per user; allowances are the
/// monthly grants (minutes, recording bytes, fax units) before overage billing.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = service_plans)]
pub struct ServicePlanEntity {
    pub id: i64,
    pub key_name: String,
    pub base_cost_cents: i64,
    pub minutes_per_month: f64,
    pub recording_space_bytes: f64,
    pub fax_units: f64,
    pub pay_as_you_go: bool,
    pub annual_cost_cents: i64,
}
