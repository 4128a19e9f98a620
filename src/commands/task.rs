use chrono::NaiveDateTime;
use tracing::debug;

use crate::models::task::{TaskCreateInput, TaskRecord, TaskUpdateInput};
use crate::services::task_service::TaskListFilter;

use super::{run_blocking, AppState, CommandResult};

pub async fn tasks_list(
    state: &AppState,
    filters: Option<TaskListFilter>,
) -> CommandResult<Vec<TaskRecord>> {
    let service = state.tasks();
    let filters = filters.unwrap_or_default();

    let records = run_blocking(move || service.list_filtered(&filters)).await?;
    debug!(target: "app::command", count = records.len(), "tasks_list");
    Ok(records)
}

pub async fn tasks_create(
    state: &AppState,
    payload: TaskCreateInput,
) -> CommandResult<TaskRecord> {
    let service = state.tasks();
    run_blocking(move || service.create_task(payload)).await
}

pub async fn tasks_update(
    state: &AppState,
    id: String,
    payload: TaskUpdateInput,
) -> CommandResult<TaskRecord> {
    let service = state.tasks();
    run_blocking(move || service.update_task(&id, payload)).await
}

pub async fn tasks_delete(state: &AppState, id: String) -> CommandResult<()> {
    let service = state.tasks();
    run_blocking(move || service.delete_task(&id)).await
}

pub async fn tasks_upcoming(
    state: &AppState,
    now: NaiveDateTime,
    lead_minutes: i64,
) -> CommandResult<Vec<TaskRecord>> {
    let service = state.tasks();
    run_blocking(move || service.list_upcoming_reminders(now, lead_minutes)).await
}
