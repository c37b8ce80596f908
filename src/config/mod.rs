pub mod error;
pub mod load;
pub mod paths;
pub mod preferences;
pub mod settings;

pub use error::ConfigError;
pub use load::{load_global_settings, load_settings_from, API_URL_ENV_VAR};
pub use paths::{
    default_global_config_path, default_preferences_path, default_state_root,
    GLOBAL_PREFERENCES_FILE_NAME, GLOBAL_SETTINGS_FILE_NAME, GLOBAL_STATE_DIR,
};
pub use preferences::{resolve_theme, FilePreferenceStore, PreferenceStore, Theme};
pub use settings::{
    Settings, DEFAULT_API_BASE, DEFAULT_LOG_LEVEL, DEFAULT_PREVIEW_PAGE_SIZE,
    DEFAULT_REPORT_PAGE_SIZE,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    struct EnvGuard {
        key: &'static str,
        previous: Option<std::ffi::OsString>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let previous = std::env::var_os(key);
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
            Self { key, previous }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match self.previous.take() {
                Some(value) => std::env::set_var(self.key, value),
                None => std::env::remove_var(self.key),
            }
        }
    }

    #[test]
    fn missing_settings_file_yields_defaults() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|err| err.into_inner());
        let _api = EnvGuard::set(API_URL_ENV_VAR, None);
        let dir = tempdir().expect("tempdir");

        let settings = load_settings_from(&dir.path().join("config.yaml")).expect("load");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.api_base, DEFAULT_API_BASE);
        assert_eq!(settings.preview_page_size, 10);
        assert_eq!(settings.report_page_size, 9);
        assert_eq!(settings.request_timeout_seconds, None);
    }

    #[test]
    fn partial_yaml_fills_remaining_defaults() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|err| err.into_inner());
        let _api = EnvGuard::set(API_URL_ENV_VAR, None);
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            r#"
api_base: https://pipelines.internal.example
preview_page_size: 25
request_timeout_seconds: 30
"#,
        )
        .expect("write config");

        let settings = load_settings_from(&path).expect("load");
        assert_eq!(settings.api_base, "https://pipelines.internal.example");
        assert_eq!(settings.preview_page_size, 25);
        assert_eq!(settings.report_page_size, DEFAULT_REPORT_PAGE_SIZE);
        assert_eq!(settings.request_timeout_seconds, Some(30));
        assert_eq!(settings.log_level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn env_override_replaces_api_base() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|err| err.into_inner());
        let _api = EnvGuard::set(API_URL_ENV_VAR, Some("http://10.0.0.5:8080/"));
        let dir = tempdir().expect("tempdir");

        let settings = load_settings_from(&dir.path().join("config.yaml")).expect("load");
        assert_eq!(settings.api_base, "http://10.0.0.5:8080/");
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut settings = Settings {
            api_base: "ftp://nope".to_string(),
            ..Settings::default()
        };
        let err = settings.validate().expect_err("scheme");
        assert!(err.to_string().contains("api_base"));

        settings.api_base = DEFAULT_API_BASE.to_string();
        settings.report_page_size = 0;
        assert!(settings.validate().is_err());

        settings.report_page_size = 9;
        settings.request_timeout_seconds = Some(0);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn invalid_yaml_reports_path() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|err| err.into_inner());
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.yaml");
        fs::write(&path, "preview_page_size: [not, a, number]\n").expect("write");

        let err = load_settings_from(&path).expect_err("parse error");
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.yaml"));
    }

    #[test]
    fn log_file_resolution_prefers_explicit_path() {
        let root = Path::new("/tmp/state");
        let mut settings = Settings::default();
        assert_eq!(settings.resolved_log_file(root), None);

        settings.log_to_file = true;
        assert_eq!(
            settings.resolved_log_file(root),
            Some(PathBuf::from("/tmp/state/logs/pipeline.log"))
        );

        settings.log_file = Some(PathBuf::from("/var/log/pipeline.log"));
        assert_eq!(
            settings.resolved_log_file(root),
            Some(PathBuf::from("/var/log/pipeline.log"))
        );
    }
}
