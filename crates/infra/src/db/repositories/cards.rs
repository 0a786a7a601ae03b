use anyhow::Result;
use async_trait::async_trait;
use diesel::{OptionalExtension, RunQueryDsl, prelude::*};
use std::sync::Arc;

use crate::db::postgres_connection::PgPoolSquad;
use domain::{
    entities::cards::CardEntity, repositories::cards::CardRepository, schema::users_cards,
};

pub struct CardPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl CardPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl CardRepository for CardPostgres {
    async fn find_primary_card(&self, workspace_id: i64) -> Result<Option<CardEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let card = users_cards::table
            .filter(users_cards::workspace_id.eq(workspace_id))
            .filter(users_cards::is_primary.eq(true))
            .select(CardEntity::as_select())
            .first::<CardEntity>(&mut conn)
            .optional()?;

        Ok(card)
    }
}
