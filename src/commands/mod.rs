pub mod db;
pub mod planning;
pub mod settings;
pub mod task;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{error, warn};

use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::services::planning_service::PlanningService;
use crate::services::schedule_optimizer::SchedulerConfig;
use crate::services::settings_service::SettingsService;
use crate::services::task_service::TaskService;

#[derive(Clone)]
pub struct AppState {
    db_pool: DbPool,
    task_service: Arc<TaskService>,
    planning_service: Arc<PlanningService>,
    settings_service: Arc<SettingsService>,
}

impl AppState {
    pub fn new(db_pool: DbPool) -> AppResult<Self> {
        Self::with_config(db_pool, SchedulerConfig::default())
    }

    pub fn with_config(db_pool: DbPool, config: SchedulerConfig) -> AppResult<Self> {
        let task_service = Arc::new(TaskService::new(db_pool.clone()));
        let settings_service = Arc::new(SettingsService::new(db_pool.clone()));
        let planning_service = Arc::new(PlanningService::new(
            db_pool.clone(),
            Arc::clone(&task_service),
            Arc::clone(&settings_service),
            config,
        ));

        // surface unreadable settings at startup rather than on first plan
        settings_service.get()?;

        Ok(Self {
            db_pool,
            task_service,
            planning_service,
            settings_service,
        })
    }

    pub fn tasks(&self) -> Arc<TaskService> {
        Arc::clone(&self.task_service)
    }

    pub fn planning(&self) -> Arc<PlanningService> {
        Arc::clone(&self.planning_service)
    }

    pub fn settings(&self) -> Arc<SettingsService> {
        Arc::clone(&self.settings_service)
    }

    pub fn db(&self) -> DbPool {
        self.db_pool.clone()
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl CommandError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<JsonValue>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details,
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CommandError {}

impl From<AppError> for CommandError {
    fn from(error: AppError) -> Self {
        match error {
            AppError::Validation {
                message, details, ..
            } => CommandError::new("VALIDATION_ERROR", message, details),
            AppError::NotFound => {
                CommandError::new("NOT_FOUND", "the requested record does not exist", None)
            }
            AppError::Conflict { message } => CommandError::new("CONFLICT", message, None),
            AppError::Database { message } => {
                error!(target: "app::command", %message, "database failure in command");
                CommandError::new("UNKNOWN", message, None)
            }
            AppError::Serialization(err) => {
                warn!(target: "app::command", error = %err, "serialization failure in command");
                CommandError::new("UNKNOWN", err.to_string(), None)
            }
            AppError::Io(err) => {
                error!(target: "app::command", error = %err, "io failure in command");
                CommandError::new("UNKNOWN", err.to_string(), None)
            }
            AppError::Other(message) => {
                error!(target: "app::command", %message, "unexpected error in command");
                CommandError::new("UNKNOWN", message, None)
            }
        }
    }
}

/// Moves a blocking service call onto tokio's blocking pool.
pub(crate) async fn run_blocking<T: Send + 'static>(
    task: impl FnOnce() -> Result<T, AppError> + Send + 'static,
) -> CommandResult<T> {
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| CommandError::new("UNKNOWN", format!("background task failed: {err}"), None))?
        .map_err(CommandError::from)
}
