use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::schema::users_invoices;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = users_invoices)]
pub struct InvoiceEntity {
    pub id: i64,
    pub cents: i64,
    pub cents_including_taxes: i64,
    pub call_costs: i64,
    pub recording_costs: i64,
    pub fax_costs: i64,
    pub membership_costs: i64,
    pub number_costs: i64,
    pub status: String,
    pub source: String,
    pub cents_collected: i64,
    pub confirmation_number: Option<String>,
    pub num_attempts: i32,
    pub last_attempted: Option<DateTime<Utc>>,
    pub tax_metadata: serde_json::Value,
    pub user_id: i64,
    pub workspace_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users_invoices)]
pub struct InsertInvoiceEntity {
    pub cents: i64,
    pub cents_including_taxes: i64,
    pub call_costs: i64,
    pub recording_costs: i64,
    pub fax_costs: i64,
    pub membership_costs: i64,
    pub number_costs: i64,
    pub status: String,
    pub source: String,
    pub cents_collected: i64,
    pub num_attempts: i32,
    pub tax_metadata: serde_json::Value,
    pub user_id: i64,
    pub workspace_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Projection used by the failed-billing retry job: an unsettled invoice
/// joined to its workspace's creator.
#[derive(Debug, Clone, Queryable)]
pub struct IncompleteInvoice {
    pub id: i64,
    pub workspace_id: i64,
    pub creator_id: i64,
    pub cents: i64,
}
