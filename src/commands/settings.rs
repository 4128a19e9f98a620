use crate::models::settings::AppSettings;
use crate::services::settings_service::SettingsUpdateInput;

use super::{run_blocking, AppState, CommandResult};

pub async fn settings_get(state: &AppState) -> CommandResult<AppSettings> {
    let service = state.settings();
    run_blocking(move || service.get()).await
}

pub async fn settings_update(
    state: &AppState,
    payload: SettingsUpdateInput,
) -> CommandResult<AppSettings> {
    let service = state.settings();
    run_blocking(move || service.update(payload)).await
}

pub async fn settings_reset(state: &AppState) -> CommandResult<AppSettings> {
    let service = state.settings();
    run_blocking(move || service.reset()).await
}
