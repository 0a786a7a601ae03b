use anyhow::Result;
use async_trait::async_trait;
use diesel::{OptionalExtension, RunQueryDsl, dsl::count_star, prelude::*};
use std::sync::Arc;

use crate::db::postgres_connection::PgPoolSquad;
use domain::{
    entities::{users::UserEntity, workspaces::WorkspaceEntity},
    repositories::workspaces::WorkspaceRepository,
    schema::{users, workspaces, workspaces_users},
};

pub struct WorkspacePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl WorkspacePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl WorkspaceRepository for WorkspacePostgres {
    async fn find_workspace(&self, workspace_id: i64) -> Result<Option<WorkspaceEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let workspace = workspaces::table
            .filter(workspaces::id.eq(workspace_id))
            .select(WorkspaceEntity::as_select())
            .first::<WorkspaceEntity>(&mut conn)
            .optional()?;

        Ok(workspace)
    }

    async fn find_user(&self, user_id: i64) -> Result<Option<UserEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let user = users::table
            .filter(users::id.eq(user_id))
            .select(UserEntity::as_select())
            .first::<UserEntity>(&mut conn)
            .optional()?;

        Ok(user)
    }

    async fn workspace_user_count(&self, workspace_id: i64) -> Result<i64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let count = workspaces_users::table
            .filter(workspaces_users::workspace_id.eq(workspace_id))
            .select(count_star())
            .first::<i64>(&mut conn)?;

        Ok(count)
    }
}
