use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::db::repositories::settings_repository::{SettingRow, SettingsRepository};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::settings::AppSettings;
use crate::services::schedule_utils::MINUTES_PER_DAY;

const KEY_DAY_START: &str = "day_start_minute";
const KEY_DAY_END: &str = "day_end_minute";
const KEY_LUNCH_START: &str = "lunch_start_minute";
const KEY_LUNCH_END: &str = "lunch_end_minute";
const KEY_DINNER_START: &str = "dinner_start_minute";
const KEY_DINNER_END: &str = "dinner_end_minute";
const KEY_MEAL_BREAKS: &str = "meal_breaks_enabled";

const DEFAULT_DAY_START: i64 = 8 * 60;
const DEFAULT_DAY_END: i64 = 22 * 60;
const DEFAULT_LUNCH_START: i64 = 14 * 60;
const DEFAULT_LUNCH_END: i64 = 15 * 60;
const DEFAULT_DINNER_START: i64 = 21 * 60;
const DEFAULT_DINNER_END: i64 = 22 * 60;

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdateInput {
    #[serde(default)]
    pub day_start_minute: Option<i64>,
    #[serde(default)]
    pub day_end_minute: Option<i64>,
    #[serde(default)]
    pub lunch_start_minute: Option<i64>,
    #[serde(default)]
    pub lunch_end_minute: Option<i64>,
    #[serde(default)]
    pub dinner_start_minute: Option<i64>,
    #[serde(default)]
    pub dinner_end_minute: Option<i64>,
    #[serde(default)]
    pub meal_breaks_enabled: Option<bool>,
}

impl SettingsUpdateInput {
    fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

pub fn default_settings() -> AppSettings {
    AppSettings {
        day_start_minute: DEFAULT_DAY_START,
        day_end_minute: DEFAULT_DAY_END,
        lunch_start_minute: DEFAULT_LUNCH_START,
        lunch_end_minute: DEFAULT_LUNCH_END,
        dinner_start_minute: DEFAULT_DINNER_START,
        dinner_end_minute: DEFAULT_DINNER_END,
        meal_breaks_enabled: true,
        updated_at: String::new(),
    }
}

pub struct SettingsService {
    db: DbPool,
    cache: RwLock<Option<AppSettings>>,
}

impl SettingsService {
    pub fn new(db: DbPool) -> Self {
        Self {
            db,
            cache: RwLock::new(None),
        }
    }

    pub fn get(&self) -> AppResult<AppSettings> {
        if let Ok(guard) = self.cache.read() {
            if let Some(settings) = guard.as_ref() {
                return Ok(settings.clone());
            }
        }

        let settings = self.load_settings_from_db()?;
        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(settings.clone());
        }
        Ok(settings)
    }

    pub fn update(&self, input: SettingsUpdateInput) -> AppResult<AppSettings> {
        let mut next = self.get()?;
        if input.is_empty() {
            return Ok(next);
        }

        let minute_fields = [
            (KEY_DAY_START, input.day_start_minute, &mut next.day_start_minute),
            (KEY_DAY_END, input.day_end_minute, &mut next.day_end_minute),
            (KEY_LUNCH_START, input.lunch_start_minute, &mut next.lunch_start_minute),
            (KEY_LUNCH_END, input.lunch_end_minute, &mut next.lunch_end_minute),
            (KEY_DINNER_START, input.dinner_start_minute, &mut next.dinner_start_minute),
            (KEY_DINNER_END, input.dinner_end_minute, &mut next.dinner_end_minute),
        ];
        let mut changes: Vec<(&str, String)> = Vec::new();
        for (key, value, slot) in minute_fields {
            if let Some(minute) = value {
                ensure_valid_minute(key, minute)?;
                *slot = minute;
                changes.push((key, minute.to_string()));
            }
        }
        if let Some(enabled) = input.meal_breaks_enabled {
            next.meal_breaks_enabled = enabled;
            changes.push((KEY_MEAL_BREAKS, enabled.to_string()));
        }

        validate_settings(&next)?;

        let now = Utc::now().to_rfc3339();
        self.db.with_transaction(|conn| {
            for (key, value) in &changes {
                SettingsRepository::upsert(conn, key, value, &now)?;
            }
            Ok(())
        })?;
        next.updated_at = now;

        info!(target: "app::settings", changed = changes.len(), "settings updated");
        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(next.clone());
        }
        Ok(next)
    }

    /// Drops every stored preference, returning to defaults.
    pub fn reset(&self) -> AppResult<AppSettings> {
        self.db.with_transaction(|conn| {
            for row in SettingsRepository::list(conn)? {
                SettingsRepository::delete(conn, &row.key)?;
            }
            Ok(())
        })?;
        if let Ok(mut guard) = self.cache.write() {
            *guard = None;
        }
        info!(target: "app::settings", "settings reset to defaults");
        self.get()
    }

    fn load_settings_from_db(&self) -> AppResult<AppSettings> {
        let map = self.db.with_connection(SettingsRepository::load_map)?;
        let defaults = default_settings();

        let minute = |key: &str, fallback: i64| read_minute(&map, key).unwrap_or(fallback);
        let loaded = AppSettings {
            day_start_minute: minute(KEY_DAY_START, defaults.day_start_minute),
            day_end_minute: minute(KEY_DAY_END, defaults.day_end_minute),
            lunch_start_minute: minute(KEY_LUNCH_START, defaults.lunch_start_minute),
            lunch_end_minute: minute(KEY_LUNCH_END, defaults.lunch_end_minute),
            dinner_start_minute: minute(KEY_DINNER_START, defaults.dinner_start_minute),
            dinner_end_minute: minute(KEY_DINNER_END, defaults.dinner_end_minute),
            meal_breaks_enabled: map
                .get(KEY_MEAL_BREAKS)
                .and_then(|row| row.value.parse::<bool>().ok())
                .unwrap_or(defaults.meal_breaks_enabled),
            updated_at: map
                .values()
                .map(|row| row.updated_at.as_str())
                .max()
                .map(str::to_string)
                .unwrap_or_else(|| Utc::now().to_rfc3339()),
        };

        if let Err(err) = validate_settings(&loaded) {
            warn!(
                target: "app::settings",
                error = %err,
                "stored settings inconsistent, falling back to defaults"
            );
            return Ok(AppSettings {
                updated_at: loaded.updated_at,
                ..defaults
            });
        }

        Ok(loaded)
    }
}

fn read_minute(map: &HashMap<String, SettingRow>, key: &str) -> Option<i64> {
    let row = map.get(key)?;
    match row.value.parse::<i64>() {
        Ok(value) if (0..MINUTES_PER_DAY).contains(&value) => Some(value),
        _ => {
            warn!(target: "app::settings", key, value = %row.value, "ignoring stored setting");
            None
        }
    }
}

fn ensure_valid_minute(key: &str, value: i64) -> AppResult<()> {
    if !(0..MINUTES_PER_DAY).contains(&value) {
        return Err(AppError::validation_with_details(
            format!("{key} must be between 0 and {}", MINUTES_PER_DAY - 1),
            json!({ "field": key, "value": value }),
        ));
    }
    Ok(())
}

fn validate_settings(settings: &AppSettings) -> AppResult<()> {
    let ordered = [
        ("day", settings.day_start_minute, settings.day_end_minute),
        ("lunch", settings.lunch_start_minute, settings.lunch_end_minute),
        ("dinner", settings.dinner_start_minute, settings.dinner_end_minute),
    ];
    for (name, start, end) in ordered {
        if start >= end {
            return Err(AppError::validation(format!(
                "{name} must start before it ends"
            )));
        }
    }

    let window = settings.day_window();
    for (name, start, end) in &ordered[1..] {
        if *start < window.start || *end > window.end {
            return Err(AppError::validation(format!(
                "{name} break must lie inside the working day"
            )));
        }
    }

    if settings.dinner_start_minute < settings.lunch_end_minute {
        return Err(AppError::validation(
            "dinner must not start before lunch ends",
        ));
    }
    Ok(())
}
