use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{OptionalExtension, RunQueryDsl, insert_into, prelude::*};
use std::sync::Arc;
use tracing::error;

use crate::db::postgres_connection::PgPoolSquad;
use domain::{
    entities::{
        calls::CallEntity,
        debits::{DebitEntity, InsertDebitEntity},
        did_numbers::DidEntity,
        faxes::FaxEntity,
        recordings::RecordingEntity,
    },
    repositories::usage::UsageRepository,
    schema::{calls, did_numbers, faxes, recordings, users_debits},
    value_objects::enums::{debit_sources::DebitSource, invoice_statuses::InvoiceStatus},
};

pub struct UsagePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl UsagePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl UsageRepository for UsagePostgres {
    async fn debits_in_window(
        &self,
        user_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DebitEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let debits = users_debits::table
            .filter(users_debits::user_id.eq(user_id))
            .filter(users_debits::created_at.ge(start))
            .filter(users_debits::created_at.lt(end))
            .order(users_debits::id.asc())
            .select(DebitEntity::as_select())
            .load::<DebitEntity>(&mut conn)?;

        Ok(debits)
    }

    async fn find_call(&self, call_id: i64) -> Result<Option<CallEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let call = calls::table
            .filter(calls::id.eq(call_id))
            .select(CallEntity::as_select())
            .first::<CallEntity>(&mut conn)
            .optional()?;

        Ok(call)
    }

    async fn find_did(&self, did_id: i64) -> Result<Option<DidEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let did = did_numbers::table
            .filter(did_numbers::id.eq(did_id))
            .select(DidEntity::as_select())
            .first::<DidEntity>(&mut conn)
            .optional()?;

        Ok(did)
    }

    async fn recordings_in_window(
        &self,
        user_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RecordingEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = recordings::table
            .filter(recordings::user_id.eq(user_id))
            .filter(recordings::created_at.ge(start))
            .filter(recordings::created_at.lt(end))
            .order(recordings::id.asc())
            .select(RecordingEntity::as_select())
            .load::<RecordingEntity>(&mut conn)?;

        Ok(rows)
    }

    async fn faxes_in_window(
        &self,
        workspace_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<FaxEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = faxes::table
            .filter(faxes::workspace_id.eq(workspace_id))
            .filter(faxes::created_at.ge(start))
            .filter(faxes::created_at.lt(end))
            .order(faxes::id.asc())
            .select(FaxEntity::as_select())
            .load::<FaxEntity>(&mut conn)?;

        Ok(rows)
    }

    async fn create_number_rental_debits(
        &self,
        workspace_id: i64,
        user_id: i64,
        period_start: DateTime<Utc>,
    ) -> Result<usize> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let dids = did_numbers::table
            .filter(did_numbers::workspace_id.eq(workspace_id))
            .select(DidEntity::as_select())
            .load::<DidEntity>(&mut conn)?;

        let mut inserted = 0;
        for did in dids {
            let debit = InsertDebitEntity {
                source: DebitSource::NumberRental.to_string(),
                status: InvoiceStatus::Incomplete.to_string(),
                cents: did.monthly_cost_cents,
                module_id: did.id,
                user_id,
                workspace_id,
                created_at: period_start,
            };

            match insert_into(users_debits::table)
                .values(&debit)
                .execute(&mut conn)
            {
                Ok(_) => inserted += 1,
                Err(err) => {
                    error!(
                        workspace_id,
                        did_id = did.id,
                        error = %err,
                        "failed to insert number rental debit"
                    );
                }
            }
        }

        Ok(inserted)
    }
}
