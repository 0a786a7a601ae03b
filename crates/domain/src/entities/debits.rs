use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::schema::users_debits;

/// A recorded consumption event to reconcile against plan allowances at cycle
/// close. `module_id` points into the table named by `source` (calls for
/// CALL, did_numbers for NUMBER_RENTAL).
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = users_debits)]
pub struct DebitEntity {
    pub id: i64,
    pub source: String,
    pub status: String,
    pub cents: i64,
    pub module_id: i64,
    pub user_id: i64,
    pub workspace_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users_debits)]
pub struct InsertDebitEntity {
    pub source: String,
    pub status: String,
    pub cents: i64,
    pub module_id: i64,
    pub user_id: i64,
    pub workspace_id: i64,
    pub created_at: DateTime<Utc>,
}
