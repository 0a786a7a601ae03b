use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;

use crate::entities::{
    calls::CallEntity, debits::DebitEntity, did_numbers::DidEntity, faxes::FaxEntity,
    recordings::RecordingEntity,
};

/// Usage recorded during a billing window plus the detail rows the debit log
/// points into.
#[async_trait]
#[automock]
pub trait UsageRepository {
    async fn debits_in_window(
        &self,
        user_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DebitEntity>>;

    async fn find_call(&self, call_id: i64) -> Result<Option<CallEntity>>;

    async fn find_did(&self, did_id: i64) -> Result<Option<DidEntity>>;

    async fn recordings_in_window(
        &self,
        user_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RecordingEntity>>;

    async fn faxes_in_window(
        &self,
        workspace_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<FaxEntity>>;

    /// Inserts one NUMBER_RENTAL debit per DID the workspace owns, stamped at
    /// the start of the cycle. Returns how many debits were written.
    async fn create_number_rental_debits(
        &self,
        workspace_id: i64,
        user_id: i64,
        period_start: DateTime<Utc>,
    ) -> Result<usize>;
}
