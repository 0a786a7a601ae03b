use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::schema::users;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = users)]
pub struct UserEntity {
    pub id: i64,
    pub email: String,
    pub provider_customer_id: String,
    pub created_at: DateTime<Utc>,
}
