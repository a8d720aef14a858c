//! solvelog-config: configuration loading for the bot process.
//!
//! Reads `~/.solvelog/config.json5`, falling back to defaults when the file
//! is absent. The Discord token is usually supplied via the environment
//! (`DISCORD_TOKEN`, `.env` honored) rather than the config file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON5 parse error: {0}")]
    Json5(#[from] json5::Error),
    #[error("Config directory not found")]
    NoDirFound,
    #[error("Discord bot token not configured (set DISCORD_TOKEN or discord.bot_token)")]
    NoToken,
}

/// Discord connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Bot token; the `DISCORD_TOKEN` environment variable takes precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,
    /// Prefix for text commands.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
}

fn default_command_prefix() -> String {
    "!".to_string()
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            command_prefix: default_command_prefix(),
        }
    }
}

/// Reminder scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    /// Seconds between scheduler ticks. Matching is minute-granular, so
    /// anything other than 60 only makes sense in tests.
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: u64,
}

fn default_tick_seconds() -> u64 {
    60
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            tick_seconds: default_tick_seconds(),
        }
    }
}

/// Top-level solvelog configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolvelogConfig {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub reminder: ReminderConfig,
    /// Database location; defaults to `<config dir>/solvelog.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
}

impl SolvelogConfig {
    /// Resolve the bot token: environment first, then the config file.
    pub fn bot_token(&self) -> Result<String, ConfigError> {
        if let Ok(token) = std::env::var("DISCORD_TOKEN") {
            if !token.is_empty() {
                return Ok(token);
            }
        }
        self.discord.bot_token.clone().ok_or(ConfigError::NoToken)
    }

    /// Resolve the database path, creating the config dir for the default.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(ensure_config_dir()?.join("solvelog.db")),
        }
    }
}

/// Resolve the solvelog config directory (~/.solvelog/).
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|h| h.join(".solvelog"))
        .ok_or(ConfigError::NoDirFound)
}

/// Resolve the config file path (~/.solvelog/config.json5).
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.json5"))
}

/// Load configuration from the default path, falling back to defaults.
pub fn load_config() -> Result<SolvelogConfig, ConfigError> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let path = config_file_path()?;
    load_config_from(&path)
}

/// Load configuration from a specific path, falling back to defaults if not found.
pub fn load_config_from(path: &Path) -> Result<SolvelogConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("Config file not found at {}, using defaults", path.display());
        return Ok(SolvelogConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: SolvelogConfig = json5::from_str(&content)?;
    Ok(config)
}

/// Ensure the config directory exists.
pub fn ensure_config_dir() -> Result<PathBuf, ConfigError> {
    let dir = config_dir()?;
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SolvelogConfig::default();
        assert_eq!(config.discord.command_prefix, "!");
        assert_eq!(config.reminder.tick_seconds, 60);
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_json5_parse() {
        let json5_str = r#"{
            discord: {
                bot_token: "token-123",
                command_prefix: "?",
            },
            reminder: { tick_seconds: 30 },
            database_path: "/tmp/solvelog-test.db",
        }"#;
        let config: SolvelogConfig = json5::from_str(json5_str).unwrap();
        assert_eq!(config.discord.bot_token.as_deref(), Some("token-123"));
        assert_eq!(config.discord.command_prefix, "?");
        assert_eq!(config.reminder.tick_seconds, 30);
        assert_eq!(
            config.database_path.as_deref(),
            Some(Path::new("/tmp/solvelog-test.db"))
        );
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: SolvelogConfig = json5::from_str("{ discord: {} }").unwrap();
        assert_eq!(config.discord.command_prefix, "!");
        assert_eq!(config.reminder.tick_seconds, 60);
    }
}
