// Run configuration.
//
// Every field has a default so a run with no config file works out of the
// box. Lookup order: $REEF_REPORT_CONFIG, then ./reef_report.json.
use crate::error::{Error, Result};
use crate::logging::LogFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "REEF_REPORT_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "reef_report.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub project_tag: String,
    /// Extra project-name rules, applied after the built-in ones.
    pub project_overrides: BTreeMap<String, String>,
    pub preview_rows: usize,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
            project_tag: "Coral Reef Rescue".to_string(),
            project_overrides: BTreeMap::new(),
            preview_rows: 5,
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Resolve the config file location and load it, falling back to
    /// defaults when no file is present.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::from_path(Path::new(&path));
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Self::from_path(local);
        }
        Ok(Self::default())
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg: Config = serde_json::from_str(
            r#"{"input_dir": "exports", "project_overrides": {"Reef Fund": "Fiji"}, "log_format": "json"}"#,
        )
        .unwrap();
        assert_eq!(cfg.input_dir, PathBuf::from("exports"));
        assert_eq!(cfg.output_dir, PathBuf::from("output"));
        assert_eq!(cfg.preview_rows, 5);
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.project_overrides.get("Reef Fund").map(String::as_str), Some("Fiji"));
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        match Config::from_path(&path) {
            Err(Error::Config { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected config error, got {:?}", other),
        }
    }
}
