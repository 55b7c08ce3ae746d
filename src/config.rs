use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::collab::PlatformConfig as CollabPlatformConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_active_platform")]
    pub active_platform: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_token_threshold")]
    pub token_threshold: u32,
    #[serde(default = "default_max_round")]
    pub max_round: u32,
    #[serde(default = "default_preceding_lines_threshold")]
    pub preceding_lines_threshold: usize,
    #[serde(default)]
    pub mtool_preprocess_enabled: bool,
    #[serde(default)]
    pub glossary_refresh_on_save: bool,
    #[serde(default)]
    pub platforms: HashMap<String, PlatformTomlConfig>,
}

fn default_active_platform() -> String {
    "openai".to_string()
}

fn default_chunk_size() -> usize {
    500
}

fn default_token_threshold() -> u32 {
    768
}

fn default_max_round() -> u32 {
    16
}

fn default_preceding_lines_threshold() -> usize {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformTomlConfig {
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
    pub model: String,
    #[serde(default)]
    pub rps: u32,
    #[serde(default)]
    pub rpm: u32,
    #[serde(default)]
    pub max_workers: u32,
}

impl Config {
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("translorc");
        Ok(config_dir)
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            anyhow::bail!(
                "Configuration file not found at {}. Run 'translorc init' first.",
                config_path.display()
            );
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file at {}", config_path.display()))?;

        config.expand_env_vars();

        Ok(config)
    }

    fn expand_env_vars(&mut self) {
        for platform in self.platforms.values_mut() {
            platform.api_key = expand_env_var(&platform.api_key);
        }
    }

    pub fn get_platform(&self, name: &str) -> Option<CollabPlatformConfig> {
        self.platforms.get(name).map(|p| CollabPlatformConfig {
            name: name.to_string(),
            api_url: p.api_url.clone(),
            api_key: p.api_key.clone(),
            model: p.model.clone(),
            rps: p.rps,
            rpm: p.rpm,
            max_workers: p.max_workers,
        })
    }

    pub fn active_platform(&self) -> Option<CollabPlatformConfig> {
        self.get_platform(&self.active_platform)
    }
}

/// Expand environment variable references like ${VAR_NAME} or $VAR_NAME.
fn expand_env_var(value: &str) -> String {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).unwrap_or_default()
    } else if let Some(var_name) = value.strip_prefix('$') {
        std::env::var(var_name).unwrap_or_default()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_env_var_braces() {
        unsafe { std::env::set_var("TEST_VAR_A", "value_a") };
        assert_eq!(expand_env_var("${TEST_VAR_A}"), "value_a");
        unsafe { std::env::remove_var("TEST_VAR_A") };
    }

    #[test]
    fn expand_env_var_dollar() {
        unsafe { std::env::set_var("TEST_VAR_B", "value_b") };
        assert_eq!(expand_env_var("$TEST_VAR_B"), "value_b");
        unsafe { std::env::remove_var("TEST_VAR_B") };
    }

    #[test]
    fn expand_env_var_literal() {
        assert_eq!(expand_env_var("literal_value"), "literal_value");
    }

    #[test]
    fn expand_env_var_missing_returns_empty() {
        assert_eq!(expand_env_var("${DEFINITELY_NOT_SET_XYZ_123}"), "");
    }

    #[test]
    fn config_from_toml() {
        let toml_str = r#"
            active_platform = "local"
            chunk_size = 300
            token_threshold = 512
            max_round = 8
            preceding_lines_threshold = 2

            [platforms.local]
            api_url = "http://localhost:8080/v1"
            model = "qwen"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.active_platform, "local");
        assert_eq!(config.chunk_size, 300);
        assert_eq!(config.token_threshold, 512);
        let platform = config.get_platform("local").unwrap();
        assert_eq!(platform.api_url, "http://localhost:8080/v1");
    }

    #[test]
    fn config_default_values() {
        let toml_str = "";
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.active_platform, "openai");
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.token_threshold, 768);
        assert_eq!(config.max_round, 16);
    }

    #[test]
    fn get_platform_returns_none_when_absent() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.get_platform("missing").is_none());
    }

    #[test]
    fn config_roundtrip_toml() {
        let mut platforms = HashMap::new();
        platforms.insert(
            "openai".to_string(),
            PlatformTomlConfig {
                api_url: "https://api.openai.com/v1".into(),
                api_key: "sk-123".into(),
                model: "gpt-4o".into(),
                rps: 5,
                rpm: 0,
                max_workers: 8,
            },
        );
        let config = Config {
            active_platform: "openai".into(),
            chunk_size: 500,
            token_threshold: 768,
            max_round: 16,
            preceding_lines_threshold: 3,
            mtool_preprocess_enabled: true,
            glossary_refresh_on_save: false,
            platforms,
        };

        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.active_platform, "openai");
        assert_eq!(deserialized.get_platform("openai").unwrap().api_key, "sk-123");
    }
}
