//! TOML-based application configuration.
//!
//! Stores:
//! - Activation policy (excluded month, quiz window)
//! - Tick and poll cadences
//! - Course backend location and credentials
//! - Default subscriptions for the CLI
//!
//! Configuration is stored at `~/.config/quizwatch/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use url::Url;

use super::data_dir;
use crate::countdown::{
    Cadence, GatePolicy, QuizWindow, SchedulerSettings, DEFAULT_CLOSE_HOUR,
    DEFAULT_EXCLUDED_MONTH, DEFAULT_OPEN_HOUR,
};
use crate::error::ConfigError;
use crate::event::SubscriptionId;

/// Overrides `remote.token` when set.
pub const TOKEN_ENV: &str = "QUIZWATCH_TOKEN";

/// Activation and window policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// 1-based month that never activates; 0 disables the exclusion.
    #[serde(default = "default_excluded_month")]
    pub excluded_month: u32,
    /// Local opening time, `HH:MM`.
    #[serde(default = "default_open_at")]
    pub open_at: String,
    /// Local closing time, `HH:MM`.
    #[serde(default = "default_close_at")]
    pub close_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CadenceConfig {
    #[serde(default = "default_fast_tick_ms")]
    pub fast_tick_ms: u64,
    /// Also the longest delay before a remote edit is noticed.
    #[serde(default = "default_slow_poll_secs")]
    pub slow_poll_secs: u64,
}

/// Course backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/quizwatch/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Subscriptions used when none are given on the command line.
    #[serde(default)]
    pub subscriptions: Vec<String>,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub cadence: CadenceConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
}

// Default functions
fn default_excluded_month() -> u32 {
    DEFAULT_EXCLUDED_MONTH
}
fn default_open_at() -> String {
    format!("{DEFAULT_OPEN_HOUR:02}:00")
}
fn default_close_at() -> String {
    format!("{DEFAULT_CLOSE_HOUR:02}:00")
}
fn default_fast_tick_ms() -> u64 {
    1000
}
fn default_slow_poll_secs() -> u64 {
    60 * 60
}
fn default_base_url() -> String {
    "http://localhost:8000".into()
}
fn default_timeout_secs() -> u64 {
    10
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            excluded_month: default_excluded_month(),
            open_at: default_open_at(),
            close_at: default_close_at(),
        }
    }
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            fast_tick_ms: default_fast_tick_ms(),
            slow_poll_secs: default_slow_poll_secs(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn parse_time(key: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|e| ConfigError::InvalidValue {
            key: key.into(),
            message: format!("'{value}' is not a HH:MM time: {e}"),
        })
}

fn lookup<'a>(root: &'a serde_json::Value, key: &str) -> Option<&'a serde_json::Value> {
    if key.is_empty() {
        return None;
    }
    key.split('.').try_fold(root, |node, part| node.get(part))
}

/// Replace the leaf at `key`, coercing `raw` to the type already stored there.
fn assign(root: &mut serde_json::Value, key: &str, raw: &str) -> Result<(), ConfigError> {
    let unknown = || ConfigError::InvalidValue {
        key: key.into(),
        message: "unknown config key".into(),
    };
    let invalid = |message: String| ConfigError::InvalidValue {
        key: key.into(),
        message,
    };

    let (parent_path, leaf) = match key.rsplit_once('.') {
        Some((parent, leaf)) => (Some(parent), leaf),
        None => (None, key),
    };
    if leaf.is_empty() {
        return Err(unknown());
    }

    let mut parent = root;
    if let Some(path) = parent_path {
        for part in path.split('.') {
            parent = parent.get_mut(part).ok_or_else(unknown)?;
        }
    }
    let obj = parent.as_object_mut().ok_or_else(unknown)?;
    let existing = obj.get(leaf).ok_or_else(unknown)?;

    let value = match existing {
        serde_json::Value::Bool(_) => serde_json::Value::Bool(
            raw.parse::<bool>()
                .map_err(|_| invalid(format!("cannot parse '{raw}' as bool")))?,
        ),
        serde_json::Value::Number(_) => serde_json::Value::Number(
            raw.parse::<u64>()
                .map_err(|_| invalid(format!("cannot parse '{raw}' as number")))?
                .into(),
        ),
        serde_json::Value::Array(_) => {
            if raw.trim_start().starts_with('[') {
                serde_json::from_str(raw).map_err(|e| invalid(e.to_string()))?
            } else {
                serde_json::Value::Array(
                    raw.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(|s| serde_json::Value::String(s.to_string()))
                        .collect(),
                )
            }
        }
        serde_json::Value::Object(_) => {
            serde_json::from_str(raw).map_err(|e| invalid(e.to_string()))?
        }
        _ => serde_json::Value::String(raw.into()),
    };
    obj.insert(leaf.to_string(), value);
    Ok(())
}

impl Config {
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be resolved.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or is
    /// invalid, or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if !path.exists() {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            return Ok(cfg);
        }
        Self::load_from(&path)
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let cfg: Config = toml::from_str(&content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.policy.excluded_month > 12 {
            return Err(ConfigError::InvalidValue {
                key: "policy.excluded_month".into(),
                message: format!(
                    "{} is not a month (1-12, or 0 to disable)",
                    self.policy.excluded_month
                ),
            });
        }
        self.window()?;
        if self.cadence.fast_tick_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "cadence.fast_tick_ms".into(),
                message: "must be greater than zero".into(),
            });
        }
        if self.cadence.slow_poll_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "cadence.slow_poll_secs".into(),
                message: "must be greater than zero".into(),
            });
        }
        self.base_url()?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        match lookup(&json, key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key without persisting it.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed, or
    /// the resulting configuration is invalid.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        assign(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    pub fn gate_policy(&self) -> GatePolicy {
        GatePolicy {
            excluded_month: (1..=12)
                .contains(&self.policy.excluded_month)
                .then_some(self.policy.excluded_month),
        }
    }

    /// # Errors
    ///
    /// Returns an error if either time is malformed or the window is empty.
    pub fn window(&self) -> Result<QuizWindow, ConfigError> {
        let open_at = parse_time("policy.open_at", &self.policy.open_at)?;
        let close_at = parse_time("policy.close_at", &self.policy.close_at)?;
        QuizWindow::new(open_at, close_at)
    }

    pub fn cadence(&self) -> Cadence {
        Cadence {
            fast_tick: Duration::from_millis(self.cadence.fast_tick_ms.max(1)),
            slow_poll: Duration::from_secs(self.cadence.slow_poll_secs.max(1)),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the policy section is invalid.
    pub fn scheduler_settings(&self) -> Result<SchedulerSettings, ConfigError> {
        Ok(SchedulerSettings {
            gate: self.gate_policy(),
            window: self.window()?,
            cadence: self.cadence(),
        })
    }

    /// # Errors
    ///
    /// Returns an error if `remote.base_url` is not an absolute URL.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.remote.base_url).map_err(|e| ConfigError::InvalidValue {
            key: "remote.base_url".into(),
            message: e.to_string(),
        })
    }

    /// Bearer token, preferring the environment over the file.
    pub fn token(&self) -> Option<String> {
        std::env::var(TOKEN_ENV)
            .ok()
            .filter(|t| !t.is_empty())
            .or_else(|| self.remote.token.clone())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.remote.timeout_secs)
    }

    pub fn subscription_ids(&self) -> Vec<SubscriptionId> {
        self.subscriptions
            .iter()
            .map(|s| SubscriptionId::from(s.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
        parsed.validate().unwrap();
    }

    #[test]
    fn defaults_match_built_in_policy() {
        let cfg = Config::default();
        assert_eq!(cfg.gate_policy(), GatePolicy::default());
        assert_eq!(cfg.window().unwrap(), QuizWindow::default());
        assert_eq!(cfg.cadence(), Cadence::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let cfg: Config = toml::from_str(indoc! {r#"
            subscriptions = ["course-1", "course-2"]

            [policy]
            open_at = "21:30"

            [remote]
            base_url = "https://api.example.com"
        "#})
        .unwrap();
        assert_eq!(cfg.policy.close_at, "23:00");
        assert_eq!(cfg.policy.excluded_month, 2);
        assert_eq!(cfg.window().unwrap().length(), Duration::from_secs(90 * 60));
        assert_eq!(cfg.subscription_ids().len(), 2);
        assert_eq!(cfg.base_url().unwrap().host_str(), Some("api.example.com"));
    }

    #[test]
    fn zero_month_disables_exclusion() {
        let mut cfg = Config::default();
        cfg.set("policy.excluded_month", "0").unwrap();
        assert_eq!(cfg.gate_policy().excluded_month, None);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("policy.open_at").as_deref(), Some("22:00"));
        assert_eq!(cfg.get("cadence.slow_poll_secs").as_deref(), Some("3600"));
        assert_eq!(cfg.get("remote.token").as_deref(), Some("null"));
        assert!(cfg.get("policy.missing").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn set_updates_values_by_type() {
        let mut cfg = Config::default();
        cfg.set("cadence.fast_tick_ms", "500").unwrap();
        cfg.set("remote.token", "abc").unwrap();
        cfg.set("subscriptions", "course-1, course-2").unwrap();
        cfg.set("policy.close_at", "23:30").unwrap();
        assert_eq!(cfg.cadence.fast_tick_ms, 500);
        assert_eq!(cfg.remote.token.as_deref(), Some("abc"));
        assert_eq!(cfg.subscriptions, vec!["course-1", "course-2"]);
        assert_eq!(cfg.window().unwrap().length(), Duration::from_secs(90 * 60));
    }

    #[test]
    fn set_rejects_unknown_and_invalid() {
        let mut cfg = Config::default();
        assert!(cfg.set("policy.nonexistent", "1").is_err());
        assert!(cfg.set("cadence.fast_tick_ms", "fast").is_err());
        assert!(cfg.set("cadence.slow_poll_secs", "0").is_err());
        assert!(cfg.set("policy.excluded_month", "13").is_err());
        assert!(cfg.set("policy.close_at", "21:00").is_err());
        assert!(cfg.set("remote.base_url", "not a url").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn save_and_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.set("subscriptions", "course-9").unwrap();
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[policy]\nopen_at = \"late\"\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::InvalidValue { .. })
        ));

        std::fs::write(&path, "[policy\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ParseFailed(_))
        ));
    }
}
