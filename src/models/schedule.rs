use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Working window in minutes since midnight, `[start, end)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DayWindow {
    pub start: i64,
    pub end: i64,
}

impl DayWindow {
    /// 08:00 to 22:00.
    pub const DEFAULT: DayWindow = DayWindow {
        start: 8 * 60,
        end: 22 * 60,
    };

    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> i64 {
        (self.end - self.start).max(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DayWindow {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BreakInterval {
    pub start_time: String,
    pub end_time: String,
}

impl BreakInterval {
    pub fn new(start_time: impl Into<String>, end_time: impl Into<String>) -> Self {
        Self {
            start_time: start_time.into(),
            end_time: end_time.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "kind")]
pub enum BlockKind {
    FixedTask { task_id: String },
    UserBreak,
    EndOfDay,
}

/// An interval the scheduler must route around.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FixedBlock {
    pub start: i64,
    pub end: i64,
    #[serde(flatten)]
    pub kind: BlockKind,
}

impl FixedBlock {
    pub fn sentinel(day_end: i64) -> Self {
        Self {
            start: day_end,
            end: day_end,
            kind: BlockKind::EndOfDay,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self.kind, BlockKind::EndOfDay)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleProposal {
    pub task_id: String,
    pub title: String,
    #[serde(default)]
    pub previous_start: Option<NaiveTime>,
    pub new_start: NaiveTime,
    pub new_end: NaiveTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ConflictSeverity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConflict {
    pub conflict_type: String,
    pub severity: ConflictSeverity,
    pub message: String,
    pub first_start: i64,
    pub second_start: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DayPlanRequest {
    #[serde(default)]
    pub day_start: Option<String>,
    #[serde(default)]
    pub day_end: Option<String>,
    #[serde(default)]
    pub breaks: Vec<BreakInterval>,
    #[serde(default)]
    pub include_meal_breaks: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanPreview {
    pub date: NaiveDate,
    pub window: DayWindow,
    pub proposals: Vec<ScheduleProposal>,
    pub unplaced_task_ids: Vec<String>,
    pub conflicts: Vec<ScheduleConflict>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProposalApplyInput {
    pub task_id: String,
    pub new_start: NaiveTime,
    pub new_end: NaiveTime,
}

impl From<&ScheduleProposal> for ProposalApplyInput {
    fn from(proposal: &ScheduleProposal) -> Self {
        Self {
            task_id: proposal.task_id.clone(),
            new_start: proposal.new_start,
            new_end: proposal.new_end,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ApplyOutcome {
    pub updated: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeSummary {
    pub message: String,
    pub updated: usize,
}
