use super::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            _ => Err("theme must be one of: light, dark".to_string()),
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Process-wide UI preferences. Kept apart from pipeline run state.
pub trait PreferenceStore {
    fn theme(&self) -> Result<Option<Theme>, ConfigError>;
    fn set_theme(&self, theme: Theme) -> Result<(), ConfigError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PreferencesFile {
    #[serde(default)]
    theme: Option<Theme>,
}

#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<PreferencesFile, ConfigError> {
        if !self.path.exists() {
            return Ok(PreferencesFile::default());
        }
        let raw = fs::read_to_string(&self.path).map_err(|source| ConfigError::Read {
            path: self.path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: self.path.display().to_string(),
            source,
        })
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn theme(&self) -> Result<Option<Theme>, ConfigError> {
        Ok(self.load()?.theme)
    }

    fn set_theme(&self, theme: Theme) -> Result<(), ConfigError> {
        let mut prefs = self.load()?;
        prefs.theme = Some(theme);
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let body = serde_yaml::to_string(&prefs).map_err(|source| ConfigError::Encode {
            path: self.path.display().to_string(),
            source,
        })?;
        fs::write(&self.path, body).map_err(|source| ConfigError::Write {
            path: self.path.display().to_string(),
            source,
        })
    }
}

pub fn resolve_theme(store: &dyn PreferenceStore) -> Result<Theme, ConfigError> {
    Ok(store.theme()?.unwrap_or_default())
}
