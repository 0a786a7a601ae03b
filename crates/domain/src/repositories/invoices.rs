use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;

use crate::entities::invoices::{IncompleteInvoice, InsertInvoiceEntity};
use crate::value_objects::enums::invoice_sources::InvoiceSource;

#[async_trait]
#[automock]
pub trait InvoiceRepository {
    async fn create_invoice(&self, invoice: InsertInvoiceEntity) -> Result<i64>;

    /// Terminal success: COMPLETE with the settling source, collected amount
    /// and confirmation number; stamps the attempt.
    async fn settle_invoice(
        &self,
        invoice_id: i64,
        source: InvoiceSource,
        cents_collected: i64,
        confirmation_number: &str,
        now: DateTime<Utc>,
    ) -> Result<()>;

    /// Terminal failure of the charge attempt: stays INCOMPLETE with CARD
    /// source, zero collected, attempt stamped.
    async fn mark_charge_failed(&self, invoice_id: i64, now: DateTime<Utc>) -> Result<()>;

    /// Credits covered part of the total; records the partial collection
    /// before the card is tried for the shortfall.
    async fn record_partial_credits(&self, invoice_id: i64, cents_collected: i64) -> Result<()>;

    /// Unsettled invoices joined to their workspace creator, for the retry
    /// job.
    async fn list_incomplete(&self) -> Result<Vec<IncompleteInvoice>>;

    async fn record_retry_success(
        &self,
        invoice_id: i64,
        cents_collected: i64,
        confirmation_number: &str,
        now: DateTime<Utc>,
    ) -> Result<()>;

    async fn record_retry_failure(&self, invoice_id: i64, now: DateTime<Utc>) -> Result<()>;
}
