use chrono::NaiveDate;
use dayfill_lib::db::DbPool;
use dayfill_lib::error::AppError;
use dayfill_lib::models::task::{Priority, TaskCreateInput, TaskType, TaskUpdateInput};
use dayfill_lib::services::task_service::{TaskListFilter, TaskService};
use tempfile::tempdir;

#[test]
fn task_crud_flow() {
    let dir = tempdir().expect("temp dir");
    let db_path = dir.path().join("integration.sqlite");
    let pool = DbPool::new(db_path).expect("db pool");
    let service = TaskService::new(pool.clone());

    // create
    let created = service
        .create_task(TaskCreateInput {
            title: "Integration Task".into(),
            date: "2025-05-01".into(),
            priority: Some("high".into()),
            task_type: Some("personal".into()),
            duration: Some(40),
            ..Default::default()
        })
        .expect("create task");

    assert!(!created.id.is_empty());
    assert_eq!(created.priority, Priority::High);
    assert_eq!(created.task_type, TaskType::Personal);
    assert!(!created.completed);

    // list
    let tasks = service.list_tasks().expect("list tasks");
    assert_eq!(tasks.len(), 1);

    // update
    let update = TaskUpdateInput {
        completed: Some(true),
        ..Default::default()
    };
    let updated = service
        .update_task(&created.id, update)
        .expect("update task");
    assert!(updated.completed);
    assert_eq!(updated.duration, 40);

    // delete
    service.delete_task(&created.id).expect("delete task");

    let result = service.get_task(&created.id);
    assert!(matches!(result, Err(AppError::NotFound)));
}

#[test]
fn missing_ids_are_not_found() {
    let dir = tempdir().expect("temp dir");
    let service = TaskService::new(DbPool::new(dir.path().join("missing.sqlite")).expect("db pool"));

    assert!(matches!(
        service.update_task("nope", TaskUpdateInput::default()),
        Err(AppError::NotFound)
    ));
    assert!(matches!(service.delete_task("nope"), Err(AppError::NotFound)));
}

#[test]
fn invalid_input_never_reaches_storage() {
    let dir = tempdir().expect("temp dir");
    let service = TaskService::new(DbPool::new(dir.path().join("invalid.sqlite")).expect("db pool"));

    let bad_time = service.create_task(TaskCreateInput {
        title: "Bad time".into(),
        date: "2025-05-01".into(),
        start_time: Some("25:00".into()),
        ..Default::default()
    });
    assert!(matches!(bad_time, Err(AppError::Validation { .. })));

    let inverted_fixed = service.create_task(TaskCreateInput {
        title: "Inverted".into(),
        date: "2025-05-01".into(),
        start_time: Some("12:00".into()),
        end_time: Some("11:00".into()),
        is_fixed: Some(true),
        ..Default::default()
    });
    assert!(matches!(inverted_fixed, Err(AppError::Validation { .. })));

    assert!(service.list_tasks().expect("list").is_empty());
}

#[test]
fn filters_and_pending_listing() {
    let dir = tempdir().expect("temp dir");
    let service = TaskService::new(DbPool::new(dir.path().join("filters.sqlite")).expect("db pool"));

    let make = |title: &str, date: &str, fixed: bool, completed: bool| TaskCreateInput {
        title: title.into(),
        date: date.into(),
        start_time: Some("09:00".into()),
        end_time: Some("10:00".into()),
        is_fixed: Some(fixed),
        completed: Some(completed),
        ..Default::default()
    };
    service.create_task(make("fixed", "2025-05-01", true, false)).expect("fixed");
    service.create_task(make("flex", "2025-05-01", false, false)).expect("flex");
    service.create_task(make("finished", "2025-05-01", false, true)).expect("finished");
    service.create_task(make("later", "2025-05-03", false, false)).expect("later");

    let date = NaiveDate::from_ymd_opt(2025, 5, 1).expect("date");
    let pending = service.list_pending_for_date(date).expect("pending");
    let titles: Vec<&str> = pending.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["fixed", "flex"]);

    let fixed_only = service
        .list_filtered(&TaskListFilter {
            is_fixed: Some(true),
            ..Default::default()
        })
        .expect("fixed filter");
    assert_eq!(fixed_only.len(), 1);

    let on_day = service
        .list_filtered(&TaskListFilter {
            date: Some(date),
            completed: Some(true),
            ..Default::default()
        })
        .expect("day filter");
    assert_eq!(on_day.len(), 1);
    assert_eq!(on_day[0].title, "finished");
}

#[test]
fn upcoming_reminders_honour_flag_and_lead() {
    let dir = tempdir().expect("temp dir");
    let service = TaskService::new(DbPool::new(dir.path().join("reminders.sqlite")).expect("db pool"));

    let at = |title: &str, date: &str, start: &str| TaskCreateInput {
        title: title.into(),
        date: date.into(),
        start_time: Some(start.into()),
        duration: Some(30),
        ..Default::default()
    };
    service.create_task(at("soon", "2025-05-01", "10:00")).expect("soon");
    service.create_task(at("sooner", "2025-05-01", "09:45")).expect("sooner");
    service
        .create_task(TaskCreateInput {
            email_reminder: Some(false),
            ..at("quiet", "2025-05-01", "09:50")
        })
        .expect("quiet");
    service
        .create_task(TaskCreateInput {
            completed: Some(true),
            ..at("finished", "2025-05-01", "09:40")
        })
        .expect("finished");
    service.create_task(at("started", "2025-05-01", "09:00")).expect("started");
    service.create_task(at("later", "2025-05-01", "11:00")).expect("later");
    service.create_task(at("overnight", "2025-05-02", "00:10")).expect("overnight");

    let day = NaiveDate::from_ymd_opt(2025, 5, 1).expect("date");
    let morning = day.and_hms_opt(9, 30, 0).expect("time");
    let due = service.list_upcoming_reminders(morning, 30).expect("due");
    let titles: Vec<&str> = due.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["sooner", "soon"]);

    let late = day.and_hms_opt(23, 50, 0).expect("time");
    let due = service.list_upcoming_reminders(late, 30).expect("due");
    let titles: Vec<&str> = due.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["overnight"]);
}
