use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::schema::faxes;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = faxes)]
pub struct FaxEntity {
    pub id: i64,
    pub workspace_id: i64,
    pub created_at: DateTime<Utc>,
}
