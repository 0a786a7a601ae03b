use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::entities::cards::CardEntity;

#[async_trait]
#[automock]
pub trait CardRepository {
    /// The workspace's primary stored payment method, if any.
    async fn find_primary_card(&self, workspace_id: i64) -> Result<Option<CardEntity>>;
}
