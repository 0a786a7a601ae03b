use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::schema::recordings;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = recordings)]
pub struct RecordingEntity {
    pub id: i64,
    pub user_id: i64,
    pub size_bytes: f64,
    pub created_at: DateTime<Utc>,
}
