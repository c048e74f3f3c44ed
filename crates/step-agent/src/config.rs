use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::language_model::ModelOptions;

pub const ENV_MAX_STEPS: &str = "AGENT_MAX_STEPS";
pub const ENV_HISTORY_WINDOW: &str = "AGENT_HISTORY_WINDOW";
pub const ENV_REPEAT_NOTICE_AFTER: &str = "AGENT_REPEAT_NOTICE_AFTER";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Step budget for a run.
    pub max_steps: usize,
    /// Number of most recent history entries rendered into each prompt.
    /// 0 is accepted and hides the history entirely.
    pub history_window: usize,
    /// Overrides the prompt generated from the registered effectors.
    pub system_prompt: Option<String>,
    pub model_options: ModelOptions,
    /// When set, a notice is added to the prompt once this many consecutive
    /// steps issued the same action with the same parameters.
    pub repeat_notice_after: Option<usize>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_steps: crate::DEFAULT_MAX_STEPS,
            history_window: crate::DEFAULT_HISTORY_WINDOW,
            system_prompt: None,
            model_options: ModelOptions::default(),
            repeat_notice_after: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("environment variable {name} must be a non-negative integer, got {value:?}")]
    InvalidEnv { name: &'static str, value: String },
}

impl ControllerConfig {
    /// Reads a JSON config file. Missing keys fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading controller config");
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies `AGENT_*` overrides from the process environment.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_env_with(|name| std::env::var(name).ok())
    }

    pub fn apply_env_with<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = parse_count(&lookup, ENV_MAX_STEPS)? {
            self.max_steps = value;
        }
        if let Some(value) = parse_count(&lookup, ENV_HISTORY_WINDOW)? {
            self.history_window = value;
        }
        if let Some(value) = parse_count(&lookup, ENV_REPEAT_NOTICE_AFTER)? {
            self.repeat_notice_after = (value > 0).then_some(value);
        }
        Ok(self)
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_repeat_notice_after(mut self, steps: usize) -> Self {
        self.repeat_notice_after = Some(steps);
        self
    }
}

fn parse_count<F>(lookup: &F, name: &'static str) -> Result<Option<usize>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn defaults_match_constants() {
        let config = ControllerConfig::default();
        assert_eq!(config.max_steps, crate::DEFAULT_MAX_STEPS);
        assert_eq!(config.history_window, 5);
        assert!(config.repeat_notice_after.is_none());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "max_steps": 50 }}"#).unwrap();
        let config = ControllerConfig::load(file.path()).unwrap();
        assert_eq!(config.max_steps, 50);
        assert_eq!(config.history_window, crate::DEFAULT_HISTORY_WINDOW);
    }

    #[test]
    fn bad_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "max_steps = 50").unwrap();
        let err = ControllerConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("failed to parse config"));
    }

    #[test]
    fn env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_MAX_STEPS, "12"),
            (ENV_REPEAT_NOTICE_AFTER, "3"),
        ]);
        let config = ControllerConfig::default()
            .apply_env_with(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.max_steps, 12);
        assert_eq!(config.repeat_notice_after, Some(3));
    }

    #[test]
    fn env_accepts_zero_history_window() {
        let config = ControllerConfig::default()
            .apply_env_with(|name| (name == ENV_HISTORY_WINDOW).then(|| "0".to_string()))
            .unwrap();
        assert_eq!(config.history_window, 0);
    }

    #[test]
    fn env_rejects_garbage() {
        let err = ControllerConfig::default()
            .apply_env_with(|name| (name == ENV_HISTORY_WINDOW).then(|| "five".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { name, .. } if name == ENV_HISTORY_WINDOW));
    }
}
