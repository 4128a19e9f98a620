use serde::Serialize;
use tracing::info;

use crate::db::migrations::MigrationInfo;
use crate::db::DbPool;
use crate::error::AppResult;

use super::{run_blocking, AppState, CommandResult};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseStatus {
    pub path: String,
    pub migrations: Vec<MigrationInfo>,
}

impl DatabaseStatus {
    fn new(pool: &DbPool, migrations: Vec<MigrationInfo>) -> Self {
        Self {
            path: pool.path().display().to_string(),
            migrations,
        }
    }
}

pub async fn db_history(state: &AppState) -> CommandResult<DatabaseStatus> {
    let pool = state.db();
    run_blocking(move || -> AppResult<DatabaseStatus> {
        let migrations = pool.migration_history()?;
        Ok(DatabaseStatus::new(&pool, migrations))
    })
    .await
}

pub async fn db_rollback(state: &AppState, target_version: i32) -> CommandResult<DatabaseStatus> {
    let pool = state.db();
    run_blocking(move || -> AppResult<DatabaseStatus> {
        let migrations = pool.rollback_to(target_version)?;
        info!(target: "app::command", target_version, "schema rolled back");
        Ok(DatabaseStatus::new(&pool, migrations))
    })
    .await
}
