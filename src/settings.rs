use crate::error::SettingsError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Engine-wide settings, passed explicitly to the evaluator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default)]
    pub model: ModelSettings,
}

/// Where and how model-check blocks reach the external model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Upper bound for a single model-check call.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Used when a block does not configure its own temperature.
    #[serde(default = "default_temperature")]
    pub default_temperature: f64,
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "qwen3-vl:8b-instruct".to_string()
}

fn default_timeout_ms() -> u64 {
    60_000
}

fn default_temperature() -> f64 {
    0.3
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_ms: default_timeout_ms(),
            default_temperature: default_temperature(),
        }
    }
}

impl ModelSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl EngineSettings {
    /// Load settings from a TOML file, expanding `${ENV_VAR}` references.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| SettingsError::NotFound(path.display().to_string()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let expanded = expand_env_vars(content, |name| std::env::var(name).ok());
        Ok(toml::from_str(&expanded)?)
    }
}

/// Expand `${NAME}` patterns using `lookup`. Unknown names are left untouched.
fn expand_env_vars(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match lookup(name) {
                    Some(value) => result.push_str(&value),
                    None => result.push_str(&rest[start..start + 2 + end + 1]),
                }
                rest = &after[end + 1..];
            }
            None => {
                result.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    result.push_str(rest);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars() {
        let result = expand_env_vars("url = \"${HOST}:${PORT}\"", |name| match name {
            "HOST" => Some("http://models".to_string()),
            "PORT" => Some("11434".to_string()),
            _ => None,
        });
        assert_eq!(result, "url = \"http://models:11434\"");
    }

    #[test]
    fn test_expand_env_vars_missing() {
        let result = expand_env_vars("key = \"${NONEXISTENT_RAILIER_VAR}\"", |_| None);
        assert_eq!(result, "key = \"${NONEXISTENT_RAILIER_VAR}\"");
    }

    #[test]
    fn test_expand_env_vars_unterminated() {
        let result = expand_env_vars("key = \"${OPEN", |_| Some("x".to_string()));
        assert_eq!(result, "key = \"${OPEN");
    }

    #[test]
    fn test_partial_settings_use_defaults() {
        let settings = EngineSettings::from_toml_str(
            r#"
            [model]
            model = "llama3"
            timeout_ms = 2500
            "#,
        )
        .unwrap();
        assert_eq!(settings.model.model, "llama3");
        assert_eq!(settings.model.timeout(), Duration::from_millis(2500));
        assert_eq!(settings.model.base_url, "http://localhost:11434");
        assert_eq!(settings.model.default_temperature, 0.3);
    }

    #[test]
    fn test_empty_settings() {
        let settings = EngineSettings::from_toml_str("").unwrap();
        assert_eq!(settings, EngineSettings::default());
    }
}
