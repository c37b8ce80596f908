use crate::app::command_support::{load_settings, settings_path, state_root};

pub fn cmd_config(args: &[String]) -> Result<String, String> {
    if !args.is_empty() {
        return Err("usage: config".to_string());
    }
    let path = settings_path()?;
    let settings = load_settings()?;
    let log_file = settings
        .resolved_log_file(&state_root()?)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "stderr".to_string());
    let body = serde_yaml::to_string(&settings)
        .map_err(|e| format!("failed to encode settings: {e}"))?;
    Ok(format!(
        "config={}\nexists={}\nlog_output={log_file}\n{}",
        path.display(),
        path.exists(),
        body.trim_end()
    ))
}
