use std::sync::Arc;

use chrono::NaiveDate;
use dayfill_lib::db::DbPool;
use dayfill_lib::models::schedule::{
    BreakInterval, ConflictSeverity, DayPlanRequest, DayWindow, ProposalApplyInput,
};
use dayfill_lib::models::task::{TaskCreateInput, TaskRecord};
use dayfill_lib::services::planning_service::PlanningService;
use dayfill_lib::services::schedule_optimizer::SchedulerConfig;
use dayfill_lib::services::settings_service::{SettingsService, SettingsUpdateInput};
use dayfill_lib::services::task_service::TaskService;
use tempfile::{tempdir, TempDir};

struct Harness {
    _dir: TempDir,
    tasks: Arc<TaskService>,
    settings: Arc<SettingsService>,
    planning: PlanningService,
}

fn harness() -> Harness {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("planning.sqlite")).expect("db pool");
    let tasks = Arc::new(TaskService::new(pool.clone()));
    let settings = Arc::new(SettingsService::new(pool.clone()));
    let planning = PlanningService::new(
        pool,
        Arc::clone(&tasks),
        Arc::clone(&settings),
        SchedulerConfig::default(),
    );
    Harness {
        _dir: dir,
        tasks,
        settings,
        planning,
    }
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 5, 1).expect("date")
}

fn fixed(title: &str, start: &str, end: &str) -> TaskCreateInput {
    TaskCreateInput {
        title: title.into(),
        date: "2025-05-01".into(),
        start_time: Some(start.into()),
        end_time: Some(end.into()),
        is_fixed: Some(true),
        task_type: Some("class".into()),
        ..Default::default()
    }
}

fn flexible(title: &str, duration: i64, priority: &str) -> TaskCreateInput {
    TaskCreateInput {
        title: title.into(),
        date: "2025-05-01".into(),
        duration: Some(duration),
        priority: Some(priority.into()),
        ..Default::default()
    }
}

fn no_meals() -> DayPlanRequest {
    DayPlanRequest {
        include_meal_breaks: Some(false),
        ..Default::default()
    }
}

fn clock(record: &TaskRecord) -> (String, String) {
    (
        record.start_time.format("%H:%M").to_string(),
        record.end_time.format("%H:%M").to_string(),
    )
}

#[test]
fn optimize_fills_gap_before_fixed_task_and_persists() {
    let h = harness();
    let lecture = h.tasks.create_task(fixed("Lecture", "10:00", "11:00")).expect("fixed");
    let a = h.tasks.create_task(flexible("A", 60, "high")).expect("a");
    let b = h.tasks.create_task(flexible("B", 30, "medium")).expect("b");

    let summary = h.planning.optimize_day(day(), no_meals()).expect("optimize");
    assert_eq!(summary.message, "optimized");
    assert_eq!(summary.updated, 2);

    let a = h.tasks.get_task(&a.id).expect("a stored");
    let b = h.tasks.get_task(&b.id).expect("b stored");
    let lecture_after = h.tasks.get_task(&lecture.id).expect("lecture stored");
    assert_eq!(clock(&a), ("08:00".into(), "09:00".into()));
    assert_eq!(clock(&b), ("09:00".into(), "09:30".into()));
    assert_eq!(clock(&lecture_after), clock(&lecture));
}

#[test]
fn optimize_is_stable_when_run_twice() {
    let h = harness();
    h.tasks.create_task(fixed("Lab", "09:00", "12:00")).expect("fixed");
    let essay = h.tasks.create_task(flexible("Essay", 90, "medium")).expect("essay");
    let reading = h.tasks.create_task(flexible("Reading", 45, "low")).expect("reading");

    h.planning.optimize_day(day(), no_meals()).expect("first run");
    let first = (
        clock(&h.tasks.get_task(&essay.id).expect("essay")),
        clock(&h.tasks.get_task(&reading.id).expect("reading")),
    );

    h.planning.optimize_day(day(), no_meals()).expect("second run");
    let second = (
        clock(&h.tasks.get_task(&essay.id).expect("essay")),
        clock(&h.tasks.get_task(&reading.id).expect("reading")),
    );
    assert_eq!(first, second);
    // essay skips the 60 minute morning gap, reading takes it
    assert_eq!(first.1 .0, "08:00");
    assert_eq!(first.0 .0, "12:00");
}

#[test]
fn completed_tasks_and_other_days_are_left_alone() {
    let h = harness();
    let done = h
        .tasks
        .create_task(TaskCreateInput {
            completed: Some(true),
            start_time: Some("18:00".into()),
            ..flexible("Done already", 30, "high")
        })
        .expect("done");
    let tomorrow = h
        .tasks
        .create_task(TaskCreateInput {
            date: "2025-05-02".into(),
            start_time: Some("18:00".into()),
            ..flexible("Tomorrow", 30, "high")
        })
        .expect("tomorrow");

    let summary = h.planning.optimize_day(day(), no_meals()).expect("optimize");
    assert_eq!(summary.message, "no tasks");
    assert_eq!(summary.updated, 0);

    assert_eq!(clock(&h.tasks.get_task(&done.id).expect("done")).0, "18:00");
    assert_eq!(clock(&h.tasks.get_task(&tomorrow.id).expect("tomorrow")).0, "18:00");
}

#[test]
fn break_pushes_task_into_later_gap() {
    let h = harness();
    let task = h.tasks.create_task(flexible("Problem set", 90, "medium")).expect("task");

    let preview = h
        .planning
        .calculate(
            day(),
            DayPlanRequest {
                day_start: Some("08:00".into()),
                day_end: Some("12:00".into()),
                breaks: vec![BreakInterval::new("09:00", "10:00")],
                include_meal_breaks: Some(false),
            },
        )
        .expect("calculate");

    assert_eq!(preview.window, DayWindow::new(480, 720));
    assert_eq!(preview.proposals.len(), 1);
    assert_eq!(preview.proposals[0].task_id, task.id);
    assert_eq!(preview.proposals[0].new_start.format("%H:%M").to_string(), "10:00");
    assert_eq!(preview.proposals[0].new_end.format("%H:%M").to_string(), "11:30");
}

#[test]
fn oversized_task_is_reported_unplaced() {
    let h = harness();
    let task = h.tasks.create_task(flexible("Marathon", 90, "high")).expect("task");

    let preview = h
        .planning
        .calculate(
            day(),
            DayPlanRequest {
                day_start: Some("08:00".into()),
                day_end: Some("09:00".into()),
                ..no_meals()
            },
        )
        .expect("calculate");

    assert!(preview.proposals.is_empty());
    assert_eq!(preview.unplaced_task_ids, vec![task.id]);
}

#[test]
fn inverted_request_window_falls_back_to_default_day() {
    let h = harness();
    h.tasks.create_task(flexible("Anything", 30, "low")).expect("task");

    let preview = h
        .planning
        .calculate(
            day(),
            DayPlanRequest {
                day_start: Some("23:00".into()),
                day_end: Some("08:00".into()),
                ..no_meals()
            },
        )
        .expect("calculate");

    assert_eq!(preview.window, DayWindow::DEFAULT);
    assert_eq!(preview.proposals[0].new_start.format("%H:%M").to_string(), "08:00");
}

#[test]
fn meal_breaks_from_settings_are_routed_around() {
    let h = harness();
    h.settings
        .update(SettingsUpdateInput {
            day_start_minute: Some(13 * 60),
            day_end_minute: Some(16 * 60),
            lunch_start_minute: Some(14 * 60),
            lunch_end_minute: Some(15 * 60),
            dinner_start_minute: Some(15 * 60 + 30),
            dinner_end_minute: Some(16 * 60),
            ..Default::default()
        })
        .expect("settings");
    h.tasks.create_task(flexible("Long read", 90, "high")).expect("long");
    h.tasks.create_task(flexible("Short call", 30, "high")).expect("short");

    let preview = h
        .planning
        .calculate(day(), DayPlanRequest::default())
        .expect("calculate");

    let starts: Vec<String> = preview
        .proposals
        .iter()
        .map(|p| p.new_start.format("%H:%M").to_string())
        .collect();
    // 13:00-14:00 and 15:00-15:30 are free; the 90 minute task fits neither
    assert_eq!(starts, vec!["13:00"]);
    assert_eq!(preview.unplaced_task_ids.len(), 1);
}

#[test]
fn overlapping_fixed_tasks_are_reported_not_rejected() {
    let h = harness();
    h.tasks.create_task(fixed("Seminar", "09:00", "11:00")).expect("seminar");
    h.tasks.create_task(fixed("Office hours", "10:00", "10:30")).expect("office");
    h.tasks.create_task(flexible("Notes", 30, "medium")).expect("notes");

    let preview = h
        .planning
        .calculate(
            day(),
            DayPlanRequest {
                day_start: Some("09:00".into()),
                day_end: Some("12:00".into()),
                ..no_meals()
            },
        )
        .expect("calculate");

    assert_eq!(preview.conflicts.len(), 1);
    assert_eq!(preview.conflicts[0].conflict_type, "fixed-overlap");
    assert_eq!(preview.conflicts[0].severity, ConflictSeverity::High);
    assert_eq!(preview.proposals[0].new_start.format("%H:%M").to_string(), "11:00");
}

#[test]
fn proposals_are_written_only_after_confirmation() {
    let h = harness();
    let task = h
        .tasks
        .create_task(TaskCreateInput {
            start_time: Some("20:00".into()),
            ..flexible("Flashcards", 20, "high")
        })
        .expect("task");

    let preview = h.planning.calculate(day(), no_meals()).expect("calculate");
    assert_eq!(
        preview.proposals[0].previous_start.map(|t| t.format("%H:%M").to_string()),
        Some("20:00".to_string())
    );
    assert_eq!(clock(&h.tasks.get_task(&task.id).expect("task")).0, "20:00");

    let inputs: Vec<ProposalApplyInput> =
        preview.proposals.iter().map(ProposalApplyInput::from).collect();
    let outcome = h.planning.apply_proposals(inputs).expect("apply");
    assert_eq!(outcome.updated, 1);
    assert_eq!(outcome.skipped, 0);
    assert_eq!(
        clock(&h.tasks.get_task(&task.id).expect("task")),
        ("08:00".into(), "08:20".into())
    );
}
