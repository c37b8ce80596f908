use crate::config::{
    default_global_config_path, default_preferences_path, default_state_root,
    load_global_settings, ConfigError, FilePreferenceStore, Settings,
};
use crate::pipeline::PipelineOrchestrator;
use crate::remote::HttpRunService;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::str::FromStr;

pub fn map_config_err(err: ConfigError) -> String {
    err.to_string()
}

pub fn load_settings() -> Result<Settings, String> {
    load_global_settings().map_err(map_config_err)
}

pub fn settings_path() -> Result<PathBuf, String> {
    default_global_config_path().map_err(map_config_err)
}

pub fn state_root() -> Result<PathBuf, String> {
    default_state_root().map_err(map_config_err)
}

pub fn preference_store() -> Result<FilePreferenceStore, String> {
    default_preferences_path()
        .map(FilePreferenceStore::new)
        .map_err(map_config_err)
}

pub fn http_orchestrator(settings: &Settings) -> PipelineOrchestrator<HttpRunService> {
    PipelineOrchestrator::from_settings(HttpRunService::from_settings(settings), settings)
}

/// `--name value` options and bare `--switch` flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagArgs {
    values: BTreeMap<String, String>,
    switches: BTreeSet<String>,
}

impl FlagArgs {
    pub fn parse(args: &[String], valued: &[&str], switches: &[&str]) -> Result<Self, String> {
        let mut parsed = Self::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            let name = arg.as_str();
            if valued.contains(&name) {
                let value = iter
                    .next()
                    .ok_or_else(|| format!("missing value for `{name}`"))?;
                parsed.values.insert(name.to_string(), value.clone());
            } else if switches.contains(&name) {
                parsed.switches.insert(name.to_string());
            } else {
                return Err(format!("unknown argument `{name}`"));
            }
        }
        Ok(parsed)
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn required(&self, name: &str) -> Result<&str, String> {
        self.value(name)
            .ok_or_else(|| format!("missing required `{name}`"))
    }

    pub fn has(&self, name: &str) -> bool {
        self.switches.contains(name)
    }

    pub fn parsed<T: FromStr>(&self, name: &str) -> Result<Option<T>, String> {
        self.value(name)
            .map(|raw| {
                raw.parse::<T>()
                    .map_err(|_| format!("invalid value `{raw}` for `{name}`"))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn flag_args_split_values_and_switches() {
        let parsed = FlagArgs::parse(
            &args(&["--file", "a.csv", "--normalize", "--page", "2"]),
            &["--file", "--page"],
            &["--normalize"],
        )
        .expect("parse");
        assert_eq!(parsed.value("--file"), Some("a.csv"));
        assert!(parsed.has("--normalize"));
        assert_eq!(parsed.parsed::<u32>("--page"), Ok(Some(2)));
        assert_eq!(parsed.parsed::<u32>("--missing"), Ok(None));
    }

    #[test]
    fn flag_args_reject_unknown_and_dangling_flags() {
        assert_eq!(
            FlagArgs::parse(&args(&["--bogus"]), &[], &[]),
            Err("unknown argument `--bogus`".to_string())
        );
        assert_eq!(
            FlagArgs::parse(&args(&["--file"]), &["--file"], &[]),
            Err("missing value for `--file`".to_string())
        );
    }

    #[test]
    fn invalid_values_name_the_flag() {
        let parsed =
            FlagArgs::parse(&args(&["--page", "two"]), &["--page"], &[]).expect("parse");
        assert_eq!(
            parsed.parsed::<u32>("--page"),
            Err("invalid value `two` for `--page`".to_string())
        );
    }
}
