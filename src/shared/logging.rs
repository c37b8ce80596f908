use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "PIPELINE_BUILDER_LOG";

pub fn pipeline_log_path(state_root: &Path) -> PathBuf {
    state_root.join("logs/pipeline.log")
}

fn resolve_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Installs the process-wide subscriber. A `log_file` appends plain lines to that file,
/// otherwise events go to stderr.
pub fn init_logging(default_directive: &str, log_file: Option<&Path>) -> Result<(), String> {
    let filter = resolve_filter(default_directive);
    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| format!("failed to create {}: {e}", parent.display()))?;
            }
            let file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| format!("failed to open {}: {e}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|e| format!("failed to install logger: {e}"))
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| format!("failed to install logger: {e}")),
    }
}
