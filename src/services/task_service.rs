use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::db::repositories::task_repository::{self, TaskRepository, TaskRow};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::task::{Priority, TaskCreateInput, TaskRecord, TaskType, TaskUpdateInput};
use crate::services::schedule_utils::{self, MINUTES_PER_DAY};

const MAX_TITLE_CHARS: usize = 255;
const MAX_DESCRIPTION_CHARS: usize = 500;

/// Optional filters for listing tasks. Unset fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskListFilter {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub is_fixed: Option<bool>,
}

impl TaskListFilter {
    fn matches(&self, task: &TaskRecord) -> bool {
        self.date.map_or(true, |date| task.date == date)
            && self.completed.map_or(true, |completed| task.completed == completed)
            && self.is_fixed.map_or(true, |fixed| task.is_fixed == fixed)
    }
}

#[derive(Clone)]
pub struct TaskService {
    db: DbPool,
}

impl TaskService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn create_task(&self, input: TaskCreateInput) -> AppResult<TaskRecord> {
        let mut record = build_record_from_create(input)?;
        let now = Utc::now().to_rfc3339();
        record.id = uuid::Uuid::new_v4().to_string();
        record.created_at = now.clone();
        record.updated_at = now;

        validate_record(&record)?;

        let row = TaskRow::from_record(&record);
        self.db
            .with_connection(|conn| TaskRepository::insert(conn, &row))?;
        info!(target: "app::tasks", task_id = %record.id, date = %record.date, "task created");
        Ok(record)
    }

    pub fn update_task(&self, id: &str, update: TaskUpdateInput) -> AppResult<TaskRecord> {
        let mut existing = self.get_task(id)?;
        apply_update(&mut existing, update)?;
        existing.updated_at = Utc::now().to_rfc3339();
        validate_record(&existing)?;

        let row = TaskRow::from_record(&existing);
        self.db
            .with_connection(|conn| TaskRepository::update(conn, &row))?;
        info!(target: "app::tasks", task_id = %existing.id, "task updated");
        Ok(existing)
    }

    pub fn delete_task(&self, id: &str) -> AppResult<()> {
        self.db
            .with_connection(|conn| TaskRepository::delete(conn, id))?;
        info!(target: "app::tasks", task_id = %id, "task deleted");
        Ok(())
    }

    pub fn get_task(&self, id: &str) -> AppResult<TaskRecord> {
        let row = self
            .db
            .with_connection(|conn| TaskRepository::find_by_id(conn, id))?
            .ok_or_else(AppError::not_found)?;
        let record = row.into_record()?;
        debug!(target: "app::tasks", task_id = %record.id, "task fetched");
        Ok(record)
    }

    pub fn list_tasks(&self) -> AppResult<Vec<TaskRecord>> {
        let rows = self
            .db
            .with_connection(|conn| TaskRepository::list_all(conn))?;
        let tasks = rows
            .into_iter()
            .map(TaskRow::into_record)
            .collect::<AppResult<Vec<_>>>()?;
        debug!(target: "app::tasks", count = tasks.len(), "tasks listed");
        Ok(tasks)
    }

    pub fn list_filtered(&self, filter: &TaskListFilter) -> AppResult<Vec<TaskRecord>> {
        let mut tasks = self.list_tasks()?;
        tasks.retain(|task| filter.matches(task));
        Ok(tasks)
    }

    /// Incomplete tasks on `date`, the input set for a scheduling run.
    pub fn list_pending_for_date(&self, date: NaiveDate) -> AppResult<Vec<TaskRecord>> {
        let rows = self
            .db
            .with_connection(|conn| TaskRepository::list_pending_for_date(conn, date))?;
        rows.into_iter().map(TaskRow::into_record).collect()
    }

    /// Pending tasks with reminders on that start within `lead_minutes` of `now`, soonest first.
    /// A task starting exactly at `now` is still due; one that already started is not.
    pub fn list_upcoming_reminders(
        &self,
        now: NaiveDateTime,
        lead_minutes: i64,
    ) -> AppResult<Vec<TaskRecord>> {
        if !(0..=MINUTES_PER_DAY).contains(&lead_minutes) {
            return Err(AppError::validation(format!(
                "reminder lead must be between 0 and {MINUTES_PER_DAY} minutes"
            )));
        }

        // a lead that crosses midnight reaches into tomorrow's tasks
        let dates = [Some(now.date()), now.date().succ_opt()];
        let lead_seconds = lead_minutes * 60;

        let mut due = Vec::new();
        for date in dates.into_iter().flatten() {
            for task in self.list_pending_for_date(date)? {
                let until_start = (task.date.and_time(task.start_time) - now).num_seconds();
                if task.email_reminder && (0..=lead_seconds).contains(&until_start) {
                    due.push(task);
                }
            }
        }
        due.sort_by_key(|task| task.date.and_time(task.start_time));
        debug!(target: "app::tasks", count = due.len(), lead_minutes, "reminders due");
        Ok(due)
    }
}

fn build_record_from_create(mut input: TaskCreateInput) -> AppResult<TaskRecord> {
    let title = normalize_title(&input.title)?;
    let description = normalize_description(input.description.take())?;
    let task_type = normalize_task_type(input.task_type.take())?;
    let priority = normalize_priority(input.priority.take())?;
    let date = normalize_date(&input.date)?;
    let start_time = normalize_time_opt(input.start_time.take())?.unwrap_or(NaiveTime::MIN);
    let duration = normalize_duration(input.duration.take())?;
    let end_time = match normalize_time_opt(input.end_time.take())? {
        Some(end) => end,
        None => default_end(start_time, duration),
    };
    let duration = duration.unwrap_or_else(|| span_minutes(start_time, end_time).max(0));

    Ok(TaskRecord {
        id: String::new(),
        title,
        description,
        task_type,
        priority,
        date,
        start_time,
        end_time,
        duration,
        is_fixed: input.is_fixed.unwrap_or(false),
        email_reminder: input.email_reminder.unwrap_or(true),
        repeat_weekly: input.repeat_weekly.unwrap_or(false),
        completed: input.completed.unwrap_or(false),
        created_at: String::new(),
        updated_at: String::new(),
    })
}

fn apply_update(record: &mut TaskRecord, update: TaskUpdateInput) -> AppResult<()> {
    if let Some(title) = update.title {
        record.title = normalize_title(&title)?;
    }
    if let Some(description) = update.description {
        record.description = normalize_description(description)?;
    }
    if let Some(task_type) = update.task_type {
        record.task_type = normalize_task_type(Some(task_type))?;
    }
    if let Some(priority) = update.priority {
        record.priority = normalize_priority(Some(priority))?;
    }
    if let Some(date) = update.date {
        record.date = normalize_date(&date)?;
    }
    if let Some(start) = normalize_time_opt(update.start_time)? {
        record.start_time = start;
    }
    if let Some(end) = normalize_time_opt(update.end_time)? {
        record.end_time = end;
    }
    if let Some(duration) = normalize_duration(update.duration)? {
        record.duration = duration;
    }
    if let Some(is_fixed) = update.is_fixed {
        record.is_fixed = is_fixed;
    }
    if let Some(email_reminder) = update.email_reminder {
        record.email_reminder = email_reminder;
    }
    if let Some(repeat_weekly) = update.repeat_weekly {
        record.repeat_weekly = repeat_weekly;
    }
    if let Some(completed) = update.completed {
        record.completed = completed;
    }
    Ok(())
}

fn validate_record(record: &TaskRecord) -> AppResult<()> {
    if record.is_fixed && record.end_time <= record.start_time {
        return Err(AppError::validation(
            "fixed tasks need an end time after their start time",
        ));
    }
    Ok(())
}

fn normalize_title(title: &str) -> AppResult<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("title must not be empty"));
    }
    if trimmed.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::validation(format!(
            "title must be at most {MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn normalize_description(value: Option<String>) -> AppResult<Option<String>> {
    let Some(trimmed) = normalize_optional_string(value) else {
        return Ok(None);
    };
    if trimmed.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(AppError::validation(format!(
            "description must be at most {MAX_DESCRIPTION_CHARS} characters"
        )));
    }
    Ok(Some(trimmed))
}

fn normalize_task_type(value: Option<String>) -> AppResult<TaskType> {
    match normalize_optional_string(value) {
        None => Ok(TaskType::default()),
        Some(raw) => TaskType::parse(&raw)
            .ok_or_else(|| AppError::validation(format!("unknown task type {raw:?}"))),
    }
}

fn normalize_priority(value: Option<String>) -> AppResult<Priority> {
    match normalize_optional_string(value) {
        None => Ok(Priority::default()),
        Some(raw) => Priority::parse(&raw)
            .ok_or_else(|| AppError::validation(format!("unknown priority {raw:?}"))),
    }
}

fn normalize_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), task_repository::DATE_FORMAT)
        .map_err(|_| AppError::validation(format!("date must be YYYY-MM-DD, got {value:?}")))
}

fn normalize_time_opt(value: Option<String>) -> AppResult<Option<NaiveTime>> {
    match normalize_optional_string(value) {
        None => Ok(None),
        Some(raw) => Ok(Some(schedule_utils::parse_clock_time(&raw)?)),
    }
}

fn normalize_duration(value: Option<i64>) -> AppResult<Option<i64>> {
    match value {
        Some(minutes) if !(0..=MINUTES_PER_DAY).contains(&minutes) => Err(AppError::validation(
            format!("duration must be between 0 and {MINUTES_PER_DAY} minutes"),
        )),
        other => Ok(other),
    }
}

fn normalize_optional_string(value: Option<String>) -> Option<String> {
    value.and_then(|val| {
        let trimmed = val.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

fn span_minutes(start: NaiveTime, end: NaiveTime) -> i64 {
    schedule_utils::minutes_from_midnight(end) - schedule_utils::minutes_from_midnight(start)
}

fn default_end(start: NaiveTime, duration: Option<i64>) -> NaiveTime {
    let start_minute = schedule_utils::minutes_from_midnight(start);
    schedule_utils::to_naive_time(start_minute + duration.unwrap_or(0))
}
