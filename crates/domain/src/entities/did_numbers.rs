use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::schema::did_numbers;

/// A rented direct-inward-dial number. The monthly cost is debited at the
/// start of every billing cycle.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = did_numbers)]
pub struct DidEntity {
    pub id: i64,
    pub workspace_id: i64,
    pub monthly_cost_cents: i64,
    pub created_at: DateTime<Utc>,
}
