use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::repositories::task_repository::DATE_FORMAT;
use crate::error::AppError;
use crate::models::schedule::{
    ApplyOutcome, DayPlanRequest, OptimizeSummary, PlanPreview, ProposalApplyInput,
};

use super::{run_blocking, AppState, CommandError, CommandResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDayPayload {
    pub date: String,
    #[serde(flatten)]
    pub request: DayPlanRequest,
}

impl PlanDayPayload {
    fn parse_date(&self) -> CommandResult<NaiveDate> {
        NaiveDate::parse_from_str(self.date.trim(), DATE_FORMAT).map_err(|_| {
            CommandError::from(AppError::validation(format!(
                "date must be YYYY-MM-DD, got {:?}",
                self.date
            )))
        })
    }
}

pub async fn planning_calculate(
    state: &AppState,
    payload: PlanDayPayload,
) -> CommandResult<PlanPreview> {
    let date = payload.parse_date()?;
    let service = state.planning();
    run_blocking(move || service.calculate(date, payload.request)).await
}

pub async fn planning_apply(
    state: &AppState,
    proposals: Vec<ProposalApplyInput>,
) -> CommandResult<ApplyOutcome> {
    let service = state.planning();
    let outcome = run_blocking(move || service.apply_proposals(proposals)).await?;
    info!(
        target: "app::command",
        updated = outcome.updated,
        skipped = outcome.skipped,
        "planning_apply"
    );
    Ok(outcome)
}

pub async fn planning_optimize(
    state: &AppState,
    payload: PlanDayPayload,
) -> CommandResult<OptimizeSummary> {
    let date = payload.parse_date()?;
    let service = state.planning();
    run_blocking(move || service.optimize_day(date, payload.request)).await
}
