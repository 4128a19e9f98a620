pub mod commands;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use std::path::{Path, PathBuf};

use tracing::info;

use crate::commands::AppState;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};

const APP_DIR: &str = "dayfill";
const DB_FILE: &str = "dayfill.sqlite";
const LOG_DIR: &str = "logs";

/// `<data dir>/dayfill/dayfill.sqlite`, or a relative path when the platform has no data dir.
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(DB_FILE)
}

fn log_dir_for(db_path: &Path) -> PathBuf {
    db_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(LOG_DIR)
}

/// Installs logging next to the database, opens it and wires the services.
pub fn run(db_path: Option<PathBuf>) -> AppResult<AppState> {
    let db_path = db_path.unwrap_or_else(default_db_path);
    if db_path.as_os_str().is_empty() {
        return Err(AppError::validation("database path must not be empty"));
    }

    crate::utils::logger::init_logging(&log_dir_for(&db_path))?;

    let pool = DbPool::new(&db_path)?;
    let state = AppState::new(pool)?;
    info!(target: "app::command", db_path = %db_path.display(), "dayfill ready");
    Ok(state)
}
