use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::AppResult;
use crate::models::schedule::{
    BlockKind, BreakInterval, ConflictSeverity, DayWindow, FixedBlock, ScheduleConflict,
    ScheduleProposal,
};
use crate::models::task::{Priority, TaskRecord};
use crate::services::schedule_utils;

/// The slice of a task the scheduler reads. Times are minutes since midnight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SchedulableTask {
    pub id: String,
    pub title: String,
    pub is_fixed: bool,
    pub start_minute: i64,
    pub end_minute: i64,
    pub duration: i64,
    pub priority: Priority,
}

impl SchedulableTask {
    pub fn fixed(id: impl Into<String>, start_minute: i64, end_minute: i64) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            is_fixed: true,
            start_minute,
            end_minute,
            duration: end_minute - start_minute,
            priority: Priority::Medium,
        }
    }

    pub fn flexible(id: impl Into<String>, duration: i64, priority: Priority) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            is_fixed: false,
            start_minute: 0,
            end_minute: duration.max(0),
            duration,
            priority,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

impl From<&TaskRecord> for SchedulableTask {
    fn from(task: &TaskRecord) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            is_fixed: task.is_fixed,
            start_minute: schedule_utils::minutes_from_midnight(task.start_time),
            end_minute: schedule_utils::minutes_from_midnight(task.end_time),
            duration: task.duration,
            priority: task.priority,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub task_id: String,
    pub title: String,
    pub previous_start: i64,
    pub new_start: i64,
    pub new_end: i64,
}

impl Placement {
    pub fn to_proposal(&self) -> ScheduleProposal {
        ScheduleProposal {
            task_id: self.task_id.clone(),
            title: self.title.clone(),
            previous_start: Some(schedule_utils::to_naive_time(self.previous_start)),
            new_start: schedule_utils::to_naive_time(self.new_start),
            new_end: schedule_utils::to_naive_time(self.new_end),
        }
    }
}

/// Receives placements in the order the gap-fill pass makes them.
pub trait PlacementSink {
    fn place(&mut self, placement: &Placement) -> AppResult<()>;
}

impl PlacementSink for Vec<Placement> {
    fn place(&mut self, placement: &Placement) -> AppResult<()> {
        self.push(placement.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerConfig {
    pub default_window: DayWindow,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayOutcome {
    pub window: DayWindow,
    pub blocks: Vec<FixedBlock>,
    pub placed: usize,
    pub unplaced: Vec<SchedulableTask>,
    pub conflicts: Vec<ScheduleConflict>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayPlan {
    pub outcome: DayOutcome,
    pub placements: Vec<Placement>,
}

impl DayPlan {
    pub fn proposals(&self) -> Vec<ScheduleProposal> {
        self.placements.iter().map(Placement::to_proposal).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScheduleOptimizer {
    config: SchedulerConfig,
}

impl ScheduleOptimizer {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    pub fn resolve_window(&self, day_start: &str, day_end: &str) -> DayWindow {
        schedule_utils::resolve_window(day_start, day_end, self.config.default_window)
    }

    /// Propose-only run: placements are collected and returned, nothing else is touched.
    pub fn plan_day(
        &self,
        tasks: &[SchedulableTask],
        breaks: &[BreakInterval],
        window: DayWindow,
    ) -> AppResult<DayPlan> {
        let mut placements = Vec::new();
        let outcome = self.run_day(tasks, breaks, window, &mut placements)?;
        Ok(DayPlan {
            outcome,
            placements,
        })
    }

    /// Runs the full pipeline for one day, streaming every placement into `sink`.
    pub fn run_day<S: PlacementSink>(
        &self,
        tasks: &[SchedulableTask],
        breaks: &[BreakInterval],
        window: DayWindow,
        sink: &mut S,
    ) -> AppResult<DayOutcome> {
        let blocks = assemble_blocks(tasks, breaks, window);
        let conflicts = detect_fixed_overlaps(&blocks);
        for conflict in &conflicts {
            warn!(
                target: "app::scheduler",
                conflict_type = %conflict.conflict_type,
                message = %conflict.message,
                "inconsistent fixed schedule"
            );
        }

        let mut pending = order_flexible(tasks);
        let flexible_count = pending.len();
        debug!(
            target: "app::scheduler",
            fixed = blocks.len() - 1 - breaks.len(),
            breaks = breaks.len(),
            flexible = flexible_count,
            "starting gap fill"
        );

        let placed = fill_gaps(&blocks, &mut pending, window, sink)?;

        info!(
            target: "app::scheduler",
            window_start = window.start,
            window_end = window.end,
            placed,
            unplaced = pending.len(),
            "gap fill finished"
        );

        Ok(DayOutcome {
            window,
            blocks,
            placed,
            unplaced: pending,
            conflicts,
        })
    }
}

/// Merges fixed tasks and breaks into one list ordered by start, then appends
/// the end-of-day sentinel. Overlaps pass through untouched.
pub fn assemble_blocks(
    tasks: &[SchedulableTask],
    breaks: &[BreakInterval],
    window: DayWindow,
) -> Vec<FixedBlock> {
    let mut blocks: Vec<FixedBlock> = tasks
        .iter()
        .filter(|task| task.is_fixed)
        .map(|task| FixedBlock {
            start: task.start_minute,
            end: task.end_minute,
            kind: BlockKind::FixedTask {
                task_id: task.id.clone(),
            },
        })
        .collect();

    blocks.extend(breaks.iter().map(|interval| FixedBlock {
        start: schedule_utils::parse_clock_or_midnight(&interval.start_time),
        end: schedule_utils::parse_clock_or_midnight(&interval.end_time),
        kind: BlockKind::UserBreak,
    }));

    // stable: equal starts keep encounter order
    blocks.sort_by_key(|block| block.start);
    blocks.push(FixedBlock::sentinel(window.end));
    blocks
}

/// Flexible tasks by priority rank, then duration, both descending. Ties keep input order.
pub fn order_flexible(tasks: &[SchedulableTask]) -> Vec<SchedulableTask> {
    let mut flexible: Vec<SchedulableTask> =
        tasks.iter().filter(|task| !task.is_fixed).cloned().collect();
    flexible.sort_by(compare_flexible);
    flexible
}

fn compare_flexible(a: &SchedulableTask, b: &SchedulableTask) -> Ordering {
    b.priority
        .rank()
        .cmp(&a.priority.rank())
        .then_with(|| b.duration.cmp(&a.duration))
}

/// Single pass over `blocks`, filling the gap before each one from `pending`
/// in its current order. Placed tasks are removed from `pending`; whatever is
/// left afterwards did not fit anywhere. Returns the number of placements.
pub fn fill_gaps<S: PlacementSink>(
    blocks: &[FixedBlock],
    pending: &mut Vec<SchedulableTask>,
    window: DayWindow,
    sink: &mut S,
) -> AppResult<usize> {
    let mut current_time = window.start;
    let mut placed = 0;

    for block in blocks {
        if current_time >= window.end {
            debug!(target: "app::scheduler", current_time, "working window exhausted");
            break;
        }

        let gap_end = block.start.min(window.end);
        if gap_end > current_time {
            let mut remaining_gap = gap_end - current_time;
            debug!(
                target: "app::scheduler",
                gap_start = %schedule_utils::format_clock(current_time),
                gap_end = %schedule_utils::format_clock(gap_end),
                minutes = remaining_gap,
                "free gap"
            );

            let mut index = 0;
            while index < pending.len() {
                let duration = pending[index].duration;
                if duration > 0 && duration <= remaining_gap {
                    let task = pending.remove(index);
                    let placement = Placement {
                        task_id: task.id,
                        title: task.title,
                        previous_start: task.start_minute,
                        new_start: current_time,
                        new_end: current_time + duration,
                    };
                    debug!(
                        target: "app::scheduler",
                        task_id = %placement.task_id,
                        start = %schedule_utils::format_clock(placement.new_start),
                        duration,
                        "placing task"
                    );
                    sink.place(&placement)?;

                    current_time += duration;
                    remaining_gap -= duration;
                    placed += 1;
                } else {
                    debug!(
                        target: "app::scheduler",
                        task_id = %pending[index].id,
                        duration,
                        remaining_gap,
                        "task does not fit this gap"
                    );
                    index += 1;
                }
            }
        } else {
            debug!(
                target: "app::scheduler",
                current = %schedule_utils::format_clock(current_time),
                block_start = block.start,
                "no usable gap before block"
            );
        }

        current_time = current_time.max(block.end).max(window.start);
    }

    Ok(placed)
}

/// Reports fixed blocks that start before an earlier block has ended, and blocks
/// whose end precedes their start. Placement is never affected by these.
pub fn detect_fixed_overlaps(blocks: &[FixedBlock]) -> Vec<ScheduleConflict> {
    let mut conflicts = Vec::new();
    let mut latest: Option<&FixedBlock> = None;

    for block in blocks.iter().filter(|block| !block.is_sentinel()) {
        if block.end < block.start {
            conflicts.push(ScheduleConflict {
                conflict_type: "inverted-block".to_string(),
                severity: ConflictSeverity::Low,
                message: format!(
                    "{} ends at {} before it starts at {}",
                    describe_block(block),
                    schedule_utils::format_clock(block.end),
                    schedule_utils::format_clock(block.start)
                ),
                first_start: block.start,
                second_start: block.start,
            });
        }

        if let Some(previous) = latest {
            if block.start < previous.end {
                let severity = match (&previous.kind, &block.kind) {
                    (BlockKind::FixedTask { .. }, BlockKind::FixedTask { .. }) => {
                        ConflictSeverity::High
                    }
                    _ => ConflictSeverity::Medium,
                };
                conflicts.push(ScheduleConflict {
                    conflict_type: "fixed-overlap".to_string(),
                    severity,
                    message: format!(
                        "{} [{} - {}] overlaps {} [{} - {}]",
                        describe_block(block),
                        schedule_utils::format_clock(block.start),
                        schedule_utils::format_clock(block.end),
                        describe_block(previous),
                        schedule_utils::format_clock(previous.start),
                        schedule_utils::format_clock(previous.end)
                    ),
                    first_start: previous.start,
                    second_start: block.start,
                });
            }
        }

        if latest.map_or(true, |previous| block.end > previous.end) {
            latest = Some(block);
        }
    }

    conflicts
}

fn describe_block(block: &FixedBlock) -> String {
    match &block.kind {
        BlockKind::FixedTask { task_id } => format!("fixed task {task_id}"),
        BlockKind::UserBreak => "break".to_string(),
        BlockKind::EndOfDay => "end of day".to_string(),
    }
}
