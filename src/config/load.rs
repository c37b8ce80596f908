use super::{default_global_config_path, ConfigError, Settings};
use std::path::Path;

pub const API_URL_ENV_VAR: &str = "PIPELINE_BUILDER_API_URL";

pub fn load_global_settings() -> Result<Settings, ConfigError> {
    let path = default_global_config_path()?;
    load_settings_from(&path)
}

/// Reads settings from `path` (defaults when the file is absent), applies the
/// environment override for the api base, then validates.
pub fn load_settings_from(path: &Path) -> Result<Settings, ConfigError> {
    let mut settings = if path.exists() {
        Settings::from_path(path)?
    } else {
        Settings::default()
    };
    if let Some(api_base) = std::env::var(API_URL_ENV_VAR)
        .ok()
        .filter(|v| !v.trim().is_empty())
    {
        settings.api_base = api_base.trim().to_string();
    }
    settings.validate()?;
    Ok(settings)
}
