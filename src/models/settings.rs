use serde::{Deserialize, Serialize};

use crate::models::schedule::{BreakInterval, DayWindow};
use crate::services::schedule_utils;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub day_start_minute: i64,
    pub day_end_minute: i64,
    pub lunch_start_minute: i64,
    pub lunch_end_minute: i64,
    pub dinner_start_minute: i64,
    pub dinner_end_minute: i64,
    pub meal_breaks_enabled: bool,
    pub updated_at: String,
}

impl AppSettings {
    pub fn day_window(&self) -> DayWindow {
        DayWindow::new(self.day_start_minute, self.day_end_minute)
    }

    /// Lunch and dinner as break intervals, in that order.
    pub fn meal_breaks(&self) -> Vec<BreakInterval> {
        [
            (self.lunch_start_minute, self.lunch_end_minute),
            (self.dinner_start_minute, self.dinner_end_minute),
        ]
        .into_iter()
        .map(|(start, end)| {
            BreakInterval::new(
                schedule_utils::format_clock(start),
                schedule_utils::format_clock(end),
            )
        })
        .collect()
    }
}
