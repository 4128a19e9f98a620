use std::convert::TryFrom;

use chrono::{NaiveDate, NaiveTime};
use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::task::{Priority, TaskRecord, TaskType};
use crate::services::schedule_utils;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";

const BASE_SELECT: &str = r#"
    SELECT
        id,
        title,
        description,
        task_type,
        priority,
        date,
        start_time,
        end_time,
        duration,
        is_fixed,
        email_reminder,
        repeat_weekly,
        completed,
        created_at,
        updated_at
    FROM tasks
"#;

#[derive(Debug, Clone)]
pub struct TaskRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub task_type: String,
    pub priority: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub duration: i64,
    pub is_fixed: bool,
    pub email_reminder: bool,
    pub repeat_weekly: bool,
    pub completed: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl TaskRow {
    pub fn from_record(record: &TaskRecord) -> Self {
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            description: record.description.clone(),
            task_type: record.task_type.as_str().to_string(),
            priority: record.priority.as_str().to_string(),
            date: format_date(record.date),
            start_time: format_time(record.start_time),
            end_time: format_time(record.end_time),
            duration: record.duration,
            is_fixed: record.is_fixed,
            email_reminder: record.email_reminder,
            repeat_weekly: record.repeat_weekly,
            completed: record.completed,
            created_at: record.created_at.clone(),
            updated_at: record.updated_at.clone(),
        }
    }

    pub fn into_record(self) -> AppResult<TaskRecord> {
        let date = NaiveDate::parse_from_str(&self.date, DATE_FORMAT).map_err(|err| {
            AppError::database(format!("task {} has unreadable date {:?}: {err}", self.id, self.date))
        })?;
        let start_time = read_time(&self.id, &self.start_time)?;
        let end_time = read_time(&self.id, &self.end_time)?;

        Ok(TaskRecord {
            task_type: TaskType::parse(&self.task_type).unwrap_or_default(),
            priority: Priority::from_str_lossy(&self.priority),
            id: self.id,
            title: self.title,
            description: self.description,
            date,
            start_time,
            end_time,
            duration: self.duration,
            is_fixed: self.is_fixed,
            email_reminder: self.email_reminder,
            repeat_weekly: self.repeat_weekly,
            completed: self.completed,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl TryFrom<&Row<'_>> for TaskRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(TaskRow {
            id: row.get("id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            task_type: row.get("task_type")?,
            priority: row.get("priority")?,
            date: row.get("date")?,
            start_time: row.get("start_time")?,
            end_time: row.get("end_time")?,
            duration: row.get("duration")?,
            is_fixed: row.get::<_, i64>("is_fixed")? != 0,
            email_reminder: row.get::<_, i64>("email_reminder")? != 0,
            repeat_weekly: row.get::<_, i64>("repeat_weekly")? != 0,
            completed: row.get::<_, i64>("completed")? != 0,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct TaskRepository;

impl TaskRepository {
    pub fn insert(conn: &Connection, row: &TaskRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO tasks (
                    id,
                    title,
                    description,
                    task_type,
                    priority,
                    date,
                    start_time,
                    end_time,
                    duration,
                    is_fixed,
                    email_reminder,
                    repeat_weekly,
                    completed,
                    created_at,
                    updated_at
                ) VALUES (
                    :id,
                    :title,
                    :description,
                    :task_type,
                    :priority,
                    :date,
                    :start_time,
                    :end_time,
                    :duration,
                    :is_fixed,
                    :email_reminder,
                    :repeat_weekly,
                    :completed,
                    :created_at,
                    :updated_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":title": &row.title,
                ":description": &row.description,
                ":task_type": &row.task_type,
                ":priority": &row.priority,
                ":date": &row.date,
                ":start_time": &row.start_time,
                ":end_time": &row.end_time,
                ":duration": row.duration,
                ":is_fixed": row.is_fixed as i64,
                ":email_reminder": row.email_reminder as i64,
                ":repeat_weekly": row.repeat_weekly as i64,
                ":completed": row.completed as i64,
                ":created_at": &row.created_at,
                ":updated_at": &row.updated_at,
            },
        )?;

        Ok(())
    }

    pub fn update(conn: &Connection, row: &TaskRow) -> AppResult<()> {
        let affected = conn.execute(
            r#"
                UPDATE tasks SET
                    title = :title,
                    description = :description,
                    task_type = :task_type,
                    priority = :priority,
                    date = :date,
                    start_time = :start_time,
                    end_time = :end_time,
                    duration = :duration,
                    is_fixed = :is_fixed,
                    email_reminder = :email_reminder,
                    repeat_weekly = :repeat_weekly,
                    completed = :completed,
                    updated_at = :updated_at
                WHERE id = :id
            "#,
            named_params! {
                ":id": &row.id,
                ":title": &row.title,
                ":description": &row.description,
                ":task_type": &row.task_type,
                ":priority": &row.priority,
                ":date": &row.date,
                ":start_time": &row.start_time,
                ":end_time": &row.end_time,
                ":duration": row.duration,
                ":is_fixed": row.is_fixed as i64,
                ":email_reminder": row.email_reminder as i64,
                ":repeat_weekly": row.repeat_weekly as i64,
                ":completed": row.completed as i64,
                ":updated_at": &row.updated_at,
            },
        )?;

        if affected == 0 {
            return Err(AppError::not_found());
        }

        Ok(())
    }

    /// Writes new start/end times for one task. Returns `false` when no row has `id`.
    pub fn update_schedule(
        conn: &Connection,
        id: &str,
        start_time: NaiveTime,
        end_time: NaiveTime,
        updated_at: &str,
    ) -> AppResult<bool> {
        let affected = conn.execute(
            r#"
                UPDATE tasks SET
                    start_time = :start_time,
                    end_time = :end_time,
                    updated_at = :updated_at
                WHERE id = :id
            "#,
            named_params! {
                ":id": id,
                ":start_time": format_time(start_time),
                ":end_time": format_time(end_time),
                ":updated_at": updated_at,
            },
        )?;
        Ok(affected > 0)
    }

    pub fn delete(conn: &Connection, id: &str) -> AppResult<()> {
        let affected = conn.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<TaskRow>> {
        let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", BASE_SELECT))?;
        let row = stmt
            .query_row([id], |row| TaskRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    pub fn list_all(conn: &Connection) -> AppResult<Vec<TaskRow>> {
        let mut stmt = conn.prepare(&format!(
            "{} ORDER BY date ASC, start_time ASC, created_at ASC",
            BASE_SELECT
        ))?;
        let rows = stmt
            .query_map([], |row| TaskRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Tasks on `date` that are not completed, in insertion order.
    pub fn list_pending_for_date(conn: &Connection, date: NaiveDate) -> AppResult<Vec<TaskRow>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE date = ?1 AND completed = 0 ORDER BY created_at ASC, rowid ASC",
            BASE_SELECT
        ))?;
        let rows = stmt
            .query_map([format_date(date)], |row| TaskRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

fn read_time(id: &str, raw: &str) -> AppResult<NaiveTime> {
    schedule_utils::parse_clock_time(raw).map_err(|err| {
        AppError::database(format!("task {id} has unreadable time {raw:?}: {err}"))
    })
}
