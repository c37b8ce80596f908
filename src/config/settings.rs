use super::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:5000";
pub const DEFAULT_PREVIEW_PAGE_SIZE: u32 = 10;
pub const DEFAULT_REPORT_PAGE_SIZE: u32 = 9;
pub const DEFAULT_LOG_LEVEL: &str = "info";

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_preview_page_size() -> u32 {
    DEFAULT_PREVIEW_PAGE_SIZE
}

fn default_report_page_size() -> u32 {
    DEFAULT_REPORT_PAGE_SIZE
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_preview_page_size")]
    pub preview_page_size: u32,
    #[serde(default = "default_report_page_size")]
    pub report_page_size: u32,
    /// Transport-level timeout for remote calls. Unset means calls wait indefinitely.
    #[serde(default)]
    pub request_timeout_seconds: Option<u64>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_to_file: bool,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            preview_page_size: DEFAULT_PREVIEW_PAGE_SIZE,
            report_page_size: DEFAULT_REPORT_PAGE_SIZE,
            request_timeout_seconds: None,
            log_level: default_log_level(),
            log_to_file: false,
            log_file: None,
        }
    }
}

impl Settings {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.api_base.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::Settings(format!(
                "`api_base` must be an http(s) url, got `{}`",
                self.api_base
            )));
        }
        if self.preview_page_size == 0 {
            return Err(ConfigError::Settings(
                "`preview_page_size` must be greater than zero".to_string(),
            ));
        }
        if self.report_page_size == 0 {
            return Err(ConfigError::Settings(
                "`report_page_size` must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout_seconds == Some(0) {
            return Err(ConfigError::Settings(
                "`request_timeout_seconds` must be greater than zero when set".to_string(),
            ));
        }
        if self.log_level.trim().is_empty() {
            return Err(ConfigError::Settings(
                "`log_level` must be non-empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Log destination: an explicit `log_file` wins, `log_to_file` falls back to the
    /// pipeline log under the state root.
    pub fn resolved_log_file(&self, state_root: &Path) -> Option<PathBuf> {
        if let Some(path) = self.log_file.as_ref() {
            return Some(path.clone());
        }
        self.log_to_file
            .then(|| crate::shared::logging::pipeline_log_path(state_root))
    }
}
