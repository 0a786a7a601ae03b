use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::schema::calls;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = calls)]
pub struct CallEntity {
    pub id: i64,
    pub workspace_id: i64,
    pub duration_seconds: i64,
    pub created_at: DateTime<Utc>,
}
