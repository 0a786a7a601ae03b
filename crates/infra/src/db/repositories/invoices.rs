use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;

use crate::db::postgres_connection::PgPoolSquad;
use domain::{
    entities::invoices::{IncompleteInvoice, InsertInvoiceEntity},
    repositories::invoices::InvoiceRepository,
    schema::{users_invoices, workspaces},
    value_objects::enums::{
        invoice_sources::InvoiceSource, invoice_statuses::InvoiceStatus,
    },
};

pub struct InvoicePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl InvoicePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl InvoiceRepository for InvoicePostgres {
    async fn create_invoice(&self, invoice: InsertInvoiceEntity) -> Result<i64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let invoice_id = insert_into(users_invoices::table)
            .values(&invoice)
            .returning(users_invoices::id)
            .get_result::<i64>(&mut conn)?;

        Ok(invoice_id)
    }

    async fn settle_invoice(
        &self,
        invoice_id: i64,
        source: InvoiceSource,
        cents_collected: i64,
        confirmation_number: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(users_invoices::table.filter(users_invoices::id.eq(invoice_id)))
            .set((
                users_invoices::status.eq(InvoiceStatus::Complete.to_string()),
                users_invoices::source.eq(source.to_string()),
                users_invoices::cents_collected.eq(cents_collected),
                users_invoices::confirmation_number.eq(Some(confirmation_number.to_string())),
                users_invoices::num_attempts.eq(1),
                users_invoices::last_attempted.eq(Some(now)),
                users_invoices::updated_at.eq(now),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn mark_charge_failed(&self, invoice_id: i64, now: DateTime<Utc>) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(users_invoices::table.filter(users_invoices::id.eq(invoice_id)))
            .set((
                users_invoices::status.eq(InvoiceStatus::Incomplete.to_string()),
                users_invoices::source.eq(InvoiceSource::Card.to_string()),
                users_invoices::cents_collected.eq(0_i64),
                users_invoices::num_attempts.eq(1),
                users_invoices::last_attempted.eq(Some(now)),
                users_invoices::updated_at.eq(now),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn record_partial_credits(&self, invoice_id: i64, cents_collected: i64) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(users_invoices::table.filter(users_invoices::id.eq(invoice_id)))
            .set((
                users_invoices::status.eq(InvoiceStatus::Incomplete.to_string()),
                users_invoices::source.eq(InvoiceSource::Credits.to_string()),
                users_invoices::cents_collected.eq(cents_collected),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn list_incomplete(&self) -> Result<Vec<IncompleteInvoice>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = users_invoices::table
            .inner_join(workspaces::table)
            .filter(users_invoices::status.eq(InvoiceStatus::Incomplete.to_string()))
            .order(users_invoices::id.asc())
            .select((
                users_invoices::id,
                users_invoices::workspace_id,
                workspaces::creator_id,
                users_invoices::cents,
            ))
            .load::<IncompleteInvoice>(&mut conn)?;

        Ok(rows)
    }

    async fn record_retry_success(
        &self,
        invoice_id: i64,
        cents_collected: i64,
        confirmation_number: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(users_invoices::table.filter(users_invoices::id.eq(invoice_id)))
            .set((
                users_invoices::status.eq(InvoiceStatus::Complete.to_string()),
                users_invoices::source.eq(InvoiceSource::Card.to_string()),
                users_invoices::cents_collected.eq(cents_collected),
                users_invoices::confirmation_number.eq(Some(confirmation_number.to_string())),
                users_invoices::num_attempts.eq(users_invoices::num_attempts + 1),
                users_invoices::last_attempted.eq(Some(now)),
                users_invoices::updated_at.eq(now),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn record_retry_failure(&self, invoice_id: i64, now: DateTime<Utc>) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(users_invoices::table.filter(users_invoices::id.eq(invoice_id)))
            .set((
                users_invoices::status.eq(InvoiceStatus::Incomplete.to_string()),
                users_invoices::source.eq(InvoiceSource::Card.to_string()),
                users_invoices::last_attempted.eq(Some(now)),
                users_invoices::updated_at.eq(now),
            ))
            .execute(&mut conn)?;

        Ok(())
    }
}
