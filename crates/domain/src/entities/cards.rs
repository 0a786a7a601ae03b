use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::schema::users_cards;

/// A stored payment method reference at the provider. At most one card per
/// workspace is flagged primary; that card takes recurring charges.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = users_cards)]
pub struct CardEntity {
    pub id: i64,
    pub workspace_id: i64,
    pub provider_payment_method_id: String,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}
