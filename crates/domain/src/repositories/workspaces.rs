use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::entities::{users::UserEntity, workspaces::WorkspaceEntity};

#[async_trait]
#[automock]
pub trait WorkspaceRepository {
    async fn find_workspace(&self, workspace_id: i64) -> Result<Option<WorkspaceEntity>>;

    async fn find_user(&self, user_id: i64) -> Result<Option<UserEntity>>;

    /// Number of active members in the workspace; drives membership costs.
    async fn workspace_user_count(&self, workspace_id: i64) -> Result<i64>;
}
