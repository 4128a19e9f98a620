use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::db::repositories::task_repository::{TaskRepository, TaskRow};
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::schedule::{
    ApplyOutcome, BreakInterval, DayPlanRequest, DayWindow, OptimizeSummary, PlanPreview,
    ProposalApplyInput,
};
use crate::models::task::TaskRecord;
use crate::services::schedule_optimizer::{
    Placement, PlacementSink, SchedulableTask, ScheduleOptimizer, SchedulerConfig,
};
use crate::services::schedule_utils;
use crate::services::settings_service::SettingsService;
use crate::services::task_service::TaskService;

pub const NO_TASKS_MESSAGE: &str = "no tasks";
pub const OPTIMIZED_MESSAGE: &str = "optimized";

/// Writes each placement into the open transaction as soon as it is made.
struct TransactionSink<'c> {
    conn: &'c Connection,
    updated_at: String,
    written: usize,
}

impl PlacementSink for TransactionSink<'_> {
    fn place(&mut self, placement: &Placement) -> AppResult<()> {
        let found = TaskRepository::update_schedule(
            self.conn,
            &placement.task_id,
            schedule_utils::to_naive_time(placement.new_start),
            schedule_utils::to_naive_time(placement.new_end),
            &self.updated_at,
        )?;
        if found {
            self.written += 1;
        } else {
            warn!(
                target: "app::planning",
                task_id = %placement.task_id,
                "placed task vanished before it could be written"
            );
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct PlanningService {
    db: DbPool,
    task_service: Arc<TaskService>,
    settings: Arc<SettingsService>,
    optimizer: ScheduleOptimizer,
}

/// Inputs for one core run after settings have been merged in.
#[derive(Debug, Clone)]
struct ResolvedRequest {
    window: DayWindow,
    breaks: Vec<BreakInterval>,
}

impl PlanningService {
    pub fn new(
        db: DbPool,
        task_service: Arc<TaskService>,
        settings: Arc<SettingsService>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            db,
            task_service,
            settings,
            optimizer: ScheduleOptimizer::new(config),
        }
    }

    pub fn get_task_service(&self) -> &Arc<TaskService> {
        &self.task_service
    }

    /// Schedules the day and writes new times straight away, in one transaction.
    pub fn optimize_day(&self, date: NaiveDate, request: DayPlanRequest) -> AppResult<OptimizeSummary> {
        let resolved = self.resolve_request(&request)?;

        let summary = self.db.with_transaction(|conn| {
            let tasks = load_pending(conn, date)?;
            if tasks.is_empty() {
                return Ok(OptimizeSummary {
                    message: NO_TASKS_MESSAGE.to_string(),
                    updated: 0,
                });
            }

            let mut sink = TransactionSink {
                conn,
                updated_at: Utc::now().to_rfc3339(),
                written: 0,
            };
            let outcome =
                self.optimizer
                    .run_day(&tasks, &resolved.breaks, resolved.window, &mut sink)?;
            debug!(
                target: "app::planning",
                placed = outcome.placed,
                unplaced = outcome.unplaced.len(),
                "day optimized inside transaction"
            );

            Ok(OptimizeSummary {
                message: OPTIMIZED_MESSAGE.to_string(),
                updated: sink.written,
            })
        })?;

        info!(
            target: "app::planning",
            %date,
            updated = summary.updated,
            message = %summary.message,
            "optimize finished"
        );
        Ok(summary)
    }

    /// Runs the core without touching storage.
    pub fn calculate(&self, date: NaiveDate, request: DayPlanRequest) -> AppResult<PlanPreview> {
        let resolved = self.resolve_request(&request)?;
        let records = self.task_service.list_pending_for_date(date)?;
        let tasks: Vec<SchedulableTask> = records.iter().map(SchedulableTask::from).collect();

        let plan = self
            .optimizer
            .plan_day(&tasks, &resolved.breaks, resolved.window)?;
        let proposals = plan.proposals();

        info!(
            target: "app::planning",
            %date,
            proposals = proposals.len(),
            unplaced = plan.outcome.unplaced.len(),
            conflicts = plan.outcome.conflicts.len(),
            "plan calculated"
        );

        Ok(PlanPreview {
            date,
            window: plan.outcome.window,
            proposals,
            unplaced_task_ids: plan.outcome.unplaced.into_iter().map(|task| task.id).collect(),
            conflicts: plan.outcome.conflicts,
        })
    }

    /// Writes confirmed proposals. Unknown task ids are skipped, not fatal.
    pub fn apply_proposals(&self, proposals: Vec<ProposalApplyInput>) -> AppResult<ApplyOutcome> {
        let updated_at = Utc::now().to_rfc3339();
        let outcome = self.db.with_transaction(|conn| {
            let mut outcome = ApplyOutcome::default();
            for proposal in &proposals {
                let found = TaskRepository::update_schedule(
                    conn,
                    &proposal.task_id,
                    proposal.new_start,
                    proposal.new_end,
                    &updated_at,
                )?;
                if found {
                    outcome.updated += 1;
                } else {
                    warn!(
                        target: "app::planning",
                        task_id = %proposal.task_id,
                        "skipping proposal because task was not found"
                    );
                    outcome.skipped += 1;
                }
            }
            Ok(outcome)
        })?;

        info!(
            target: "app::planning",
            updated = outcome.updated,
            skipped = outcome.skipped,
            "proposals applied"
        );
        Ok(outcome)
    }

    fn resolve_request(&self, request: &DayPlanRequest) -> AppResult<ResolvedRequest> {
        let settings = self.settings.get()?;
        let day_start = request
            .day_start
            .clone()
            .unwrap_or_else(|| schedule_utils::format_clock(settings.day_start_minute));
        let day_end = request
            .day_end
            .clone()
            .unwrap_or_else(|| schedule_utils::format_clock(settings.day_end_minute));
        let window = self.optimizer.resolve_window(&day_start, &day_end);

        let mut breaks = request.breaks.clone();
        if request
            .include_meal_breaks
            .unwrap_or(settings.meal_breaks_enabled)
        {
            breaks.extend(settings.meal_breaks());
        }

        Ok(ResolvedRequest { window, breaks })
    }
}

fn load_pending(conn: &Connection, date: NaiveDate) -> AppResult<Vec<SchedulableTask>> {
    let records = TaskRepository::list_pending_for_date(conn, date)?
        .into_iter()
        .map(TaskRow::into_record)
        .collect::<AppResult<Vec<TaskRecord>>>()?;
    Ok(records.iter().map(SchedulableTask::from).collect())
}
