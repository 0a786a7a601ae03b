use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::schema::workspaces;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = workspaces)]
pub struct WorkspaceEntity {
    pub id: i64,
    pub creator_id: i64,
    pub plan: String,
    pub remaining_balance_cents: i64,
    pub invoice_due: String,
    pub created_at: DateTime<Utc>,
}

/// Workspace-scoped billing view: the prepaid balance and the human-readable
/// marker printed on invoices for the current cycle.
#[derive(Debug, Clone)]
pub struct WorkspaceBillingInfo {
    pub remaining_balance_cents: i64,
    pub invoice_due: String,
}

impl WorkspaceEntity {
    pub fn billing_info(&self) -> WorkspaceBillingInfo {
        WorkspaceBillingInfo {
            remaining_balance_cents: self.remaining_balance_cents,
            invoice_due: self.invoice_due.clone(),
        }
    }
}
