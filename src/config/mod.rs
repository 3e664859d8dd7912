//! Prompt configuration loaded once at startup.
//!
//! The configuration is a plain JSON mapping. Every field has a default and
//! unrecognised keys are ignored, so a partial or newer config still loads.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::ConfigError;
use crate::layout::PromptTarget;
use crate::logging::{LogLevel, Logger, event_with_fields, json_kv};
use crate::style::MarkupDialect;

const LOG_TARGET: &str = "prompt::config";

/// Per-module settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    pub enabled: bool,
    /// Style tag replacing the one chosen by the module.
    pub style: Option<String>,
    /// Layout priority replacing the module's default.
    pub priority: Option<i32>,
    /// Module specific options.
    pub options: Map<String, Value>,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            style: None,
            priority: None,
            options: Map::new(),
        }
    }
}

impl ModuleConfig {
    pub fn option_u64(&self, key: &str) -> Option<u64> {
        self.options.get(key).and_then(Value::as_u64)
    }

    pub fn option_bool(&self, key: &str) -> Option<bool> {
        self.options.get(key).and_then(Value::as_bool)
    }

    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Modules rendered on the main prompt line, in order.
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub bottom: Vec<String>,
    pub separator: String,
    pub dialect: MarkupDialect,
    pub parallel: bool,
    pub module_timeout_ms: u64,
    /// Style tag overrides, e.g. `"error": "bold fg:#ff5555"`.
    pub styles: BTreeMap<String, String>,
    pub modules: BTreeMap<String, ModuleConfig>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            left: ["directory", "vcs", "duration", "jobs", "status", "character"]
                .into_iter()
                .map(String::from)
                .collect(),
            right: Vec::new(),
            bottom: Vec::new(),
            separator: " ".to_string(),
            dialect: MarkupDialect::Ansi,
            parallel: true,
            module_timeout_ms: 200,
            styles: BTreeMap::new(),
            modules: BTreeMap::new(),
        }
    }
}

impl PromptConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::MissingPath(path.to_path_buf()));
        }
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Load `path`, falling back to the defaults on any failure.
    ///
    /// The failure is reported once through `logger`; callers keep a usable
    /// prompt either way.
    pub fn load_or_default(path: Option<&Path>, logger: Option<&Logger>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                if let Some(logger) = logger {
                    let (level, message) = match &err {
                        ConfigError::MissingPath(_) => (LogLevel::Warn, "config_path_missing"),
                        _ => (LogLevel::Error, "config_parse_failed"),
                    };
                    let _ = logger.log_event(event_with_fields(
                        level,
                        LOG_TARGET,
                        message,
                        [
                            json_kv("path", json!(path.display().to_string())),
                            json_kv("error", json!(err.to_string())),
                        ],
                    ));
                }
                Self::default()
            }
        }
    }

    /// Module names configured for `target`, in render order.
    pub fn modules_for(&self, target: PromptTarget) -> &[String] {
        match target {
            PromptTarget::Left => &self.left,
            PromptTarget::Right => &self.right,
            PromptTarget::Bottom => &self.bottom,
        }
    }

    pub fn module(&self, name: &str) -> Option<&ModuleConfig> {
        self.modules.get(name)
    }

    pub fn module_timeout(&self) -> Duration {
        Duration::from_millis(self.module_timeout_ms)
    }

    /// Short blake3 fingerprint identifying this configuration in logs.
    pub fn digest(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        let hash = blake3::hash(&bytes);
        hash.to_hex()[..16].to_string()
    }
}

/// Expand a leading `~` against `home`, the way shells treat config paths.
pub fn expand_tilde(raw: &str, home: Option<&Path>) -> PathBuf {
    match (raw.strip_prefix('~'), home) {
        (Some(""), Some(home)) => home.to_path_buf(),
        (Some(rest), Some(home)) if rest.starts_with('/') => home.join(&rest[1..]),
        _ => PathBuf::from(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemorySink;

    #[test]
    fn partial_config_keeps_defaults_and_ignores_unknown_keys() {
        let config = PromptConfig::from_json_str(
            r#"{
                "right": ["duration"],
                "dialect": "xonsh",
                "format_version": 7,
                "modules": {
                    "directory": { "priority": 90, "options": { "truncation_length": 2 }, "colour": "x" }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.left, PromptConfig::default().left);
        assert_eq!(config.right, vec!["duration".to_string()]);
        assert_eq!(config.dialect, MarkupDialect::Xonsh);
        assert!(config.parallel);

        let directory = config.module("directory").unwrap();
        assert!(directory.enabled);
        assert_eq!(directory.priority, Some(90));
        assert_eq!(directory.option_u64("truncation_length"), Some(2));
    }

    #[test]
    fn malformed_config_is_a_parse_error() {
        let err = PromptConfig::from_json_str("{ left: ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_or_default_logs_missing_path() {
        let sink = MemorySink::new();
        let logger = Logger::new(sink.clone());
        let config = PromptConfig::load_or_default(
            Some(Path::new("/definitely/not/here.json")),
            Some(&logger),
        );

        assert_eq!(config, PromptConfig::default());
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "config_path_missing");
        assert_eq!(events[0].level, LogLevel::Warn);
    }

    #[test]
    fn load_or_default_logs_parse_failure_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.json");
        fs::write(&path, "not json").unwrap();

        let sink = MemorySink::new();
        let logger = Logger::new(sink.clone());
        let config = PromptConfig::load_or_default(Some(&path), Some(&logger));

        assert_eq!(config, PromptConfig::default());
        assert_eq!(sink.messages(), vec!["config_parse_failed".to_string()]);
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.json");
        fs::write(&path, r#"{ "separator": " | " }"#).unwrap();

        let config = PromptConfig::load(&path).unwrap();
        assert_eq!(config.separator, " | ");
    }

    #[test]
    fn digest_tracks_content() {
        let base = PromptConfig::default();
        let mut changed = PromptConfig::default();
        changed.separator = "|".to_string();

        assert_eq!(base.digest(), PromptConfig::default().digest());
        assert_ne!(base.digest(), changed.digest());
        assert_eq!(base.digest().len(), 16);
    }

    #[test]
    fn expands_tilde_against_home() {
        let home = Path::new("/home/dev");
        assert_eq!(
            expand_tilde("~/.config/prompt.json", Some(home)),
            PathBuf::from("/home/dev/.config/prompt.json")
        );
        assert_eq!(expand_tilde("~", Some(home)), PathBuf::from("/home/dev"));
        assert_eq!(expand_tilde("/etc/p.json", Some(home)), PathBuf::from("/etc/p.json"));
        assert_eq!(expand_tilde("~/x", None), PathBuf::from("~/x"));
    }
}
