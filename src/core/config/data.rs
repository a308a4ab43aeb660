use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::core::config::io::ConfigError;
use crate::core::gemini::{
    GeminiSettings, DEFAULT_BASE_URL, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MODEL,
};

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// Gemini model name (e.g., "gemini-2.5-flash")
    pub model: Option<String>,
    /// API root, without the `/models/...` suffix
    pub base_url: Option<String>,
    /// Connect timeout for the HTTP client, in seconds
    pub request_timeout_secs: Option<u64>,
    /// Append the conversation transcript to this file
    pub log_file: Option<String>,
}

/// Keys accepted by `stitchperfect set` and `stitchperfect unset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    Model,
    BaseUrl,
    RequestTimeout,
    LogFile,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 4] = [
        ConfigKey::Model,
        ConfigKey::BaseUrl,
        ConfigKey::RequestTimeout,
        ConfigKey::LogFile,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKey::Model => "model",
            ConfigKey::BaseUrl => "base-url",
            ConfigKey::RequestTimeout => "request-timeout",
            ConfigKey::LogFile => "log-file",
        }
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ConfigKey::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| ConfigError::UnknownKey(value.to_string()))
    }
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}

impl Config {
    /// Gemini settings with an optional CLI model override applied.
    pub fn gemini_settings(&self, model_override: Option<&str>) -> GeminiSettings {
        let model = model_override
            .filter(|model| !model.trim().is_empty())
            .or(self.model.as_deref())
            .unwrap_or(DEFAULT_MODEL);
        GeminiSettings {
            model: model.trim().to_string(),
            base_url: self
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            connect_timeout: self
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT),
        }
    }

    pub fn set_value(&mut self, key: ConfigKey, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: key.as_str(),
                reason: "value must not be empty".to_string(),
            });
        }
        match key {
            ConfigKey::Model => self.model = Some(value.to_string()),
            ConfigKey::BaseUrl => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err(ConfigError::InvalidValue {
                        key: key.as_str(),
                        reason: "expected an http:// or https:// URL".to_string(),
                    });
                }
                self.base_url = Some(value.trim_end_matches('/').to_string());
            }
            ConfigKey::RequestTimeout => {
                let secs = value
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or_else(|| ConfigError::InvalidValue {
                        key: key.as_str(),
                        reason: format!("expected a positive number of seconds, got '{value}'"),
                    })?;
                self.request_timeout_secs = Some(secs);
            }
            ConfigKey::LogFile => self.log_file = Some(value.to_string()),
        }
        Ok(())
    }

    pub fn unset_value(&mut self, key: ConfigKey) {
        match key {
            ConfigKey::Model => self.model = None,
            ConfigKey::BaseUrl => self.base_url = None,
            ConfigKey::RequestTimeout => self.request_timeout_secs = None,
            ConfigKey::LogFile => self.log_file = None,
        }
    }

    pub fn display_value(&self, key: ConfigKey) -> String {
        let value = match key {
            ConfigKey::Model => self.model.clone(),
            ConfigKey::BaseUrl => self.base_url.clone(),
            ConfigKey::RequestTimeout => self.request_timeout_secs.map(|secs| format!("{secs}s")),
            ConfigKey::LogFile => self.log_file.clone(),
        };
        value.unwrap_or_else(|| "(unset)".to_string())
    }
}
