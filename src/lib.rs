pub mod api;
pub mod db;
pub mod duration;
pub mod error;
pub mod events;
pub mod github;
pub mod handler;
pub mod labels;
pub mod logging;
pub mod release;
pub mod sync;
pub mod telegram;
pub mod utils;
pub mod webhook;

#[cfg(test)]
pub(crate) mod testing;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use duration::IsoDuration;
use error::{BotError, Result};
use handler::{Collaborators, HandlerRegistry};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BotConfig {
    pub app_name: String,
    /// Maximum age of a PR branch relative to its merge base before auto-sync
    pub pr_max_age: IsoDuration,
    pub database_path: PathBuf,
    pub log_directory: Option<PathBuf>,
    pub webhook_secret: Option<String>,
    pub github: GitHubConfig,
    pub telegram: TelegramConfig,
    pub bot: BotIdentity,
    pub rules: RulesConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            app_name: "repo_bot".to_string(),
            pr_max_age: IsoDuration::default(),
            database_path: PathBuf::from("data/repo_bot.db"),
            log_directory: None,
            webhook_secret: None,
            github: GitHubConfig::default(),
            telegram: TelegramConfig::default(),
            bot: BotIdentity::default(),
            rules: RulesConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GitHubConfig {
    pub api_base: String,
    pub token: Option<String>,
    pub user_agent: String,
    pub request_timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            token: None,
            user_agent: "repo-bot".to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TelegramConfig {
    pub api_base: String,
    pub bot_token: Option<String>,
    /// Channel that receives every audit notification
    pub audit_channel_id: String,
    /// Public channel, used for release announcements
    pub broadcast_channel_id: Option<String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.telegram.org".to_string(),
            bot_token: None,
            audit_channel_id: String::new(),
            broadcast_channel_id: None,
        }
    }
}

/// Accounts the bot acts as
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BotIdentity {
    pub login: String,
    pub reviewer: String,
    pub qa_team: String,
    pub committer_name: String,
    pub committer_email: String,
}

impl Default for BotIdentity {
    fn default() -> Self {
        Self {
            login: "daebot".to_string(),
            reviewer: "dae-bot[bot]".to_string(),
            qa_team: "qa".to_string(),
            committer_name: "daebot".to_string(),
            committer_email: "dae@v2raya.org".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RulesConfig {
    pub release_repos: Vec<String>,
    pub release_maintainers: Vec<String>,
    pub qa_repos: Vec<String>,
    pub upstream_repo: String,
    pub downstream_repo: String,
    pub sync_branch: String,
    pub sync_workflow: String,
    pub release_workflow: String,
    pub prerelease_workflow: String,
    pub changelog_path: String,
}

impl Default for RulesConfig {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            release_repos: owned(&["dae", "daed"]),
            release_maintainers: owned(&["yqlbu", "kunish", "mzz2017"]),
            qa_repos: owned(&["dae", "daed"]),
            upstream_repo: "dae-wing".to_string(),
            downstream_repo: "daed".to_string(),
            sync_branch: "sync-upstream".to_string(),
            sync_workflow: "sync-upstream.yml".to_string(),
            release_workflow: "release.yml".to_string(),
            prerelease_workflow: "prerelease.yml".to_string(),
            changelog_path: "CHANGELOGS.md".to_string(),
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

impl BotConfig {
    /// Fills secrets missing from the file from the given variable lookup.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for (slot, var) in [
            (&mut self.webhook_secret, "WEBHOOK_SECRET"),
            (&mut self.github.token, "GITHUB_TOKEN"),
            (&mut self.telegram.bot_token, "TELEGRAM_BOT_TOKEN"),
        ] {
            if is_blank(slot)
                && let Some(value) = lookup(var).filter(|v| !v.trim().is_empty())
            {
                *slot = Some(value);
            }
        }
    }

    /// Returns the webhook secret if one is configured and non-empty.
    pub fn webhook_secret(&self) -> Option<&str> {
        self.webhook_secret
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Audit channel plus the public channel, when configured.
    pub fn public_channels(&self) -> Vec<&str> {
        let mut channels = vec![self.telegram.audit_channel_id.as_str()];
        if let Some(public) = self.telegram.broadcast_channel_id.as_deref() {
            channels.push(public);
        }
        channels
    }
}

/// Parses configuration from TOML text without consulting the environment.
pub fn parse_config(raw: &str) -> Result<BotConfig> {
    let config: BotConfig = toml::from_str(raw)?;
    if config.telegram.audit_channel_id.trim().is_empty() {
        return Err(BotError::ConfigError(
            "telegram.audit_channel_id must be set".to_string(),
        ));
    }
    Ok(config)
}

/// Load and parse the configuration file, then apply environment fallbacks
pub fn load_config(path: impl AsRef<Path>) -> Result<BotConfig> {
    let path = path.as_ref();
    let config_str = fs::read_to_string(path).map_err(|e| {
        BotError::ConfigError(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    let mut config = parse_config(&config_str).map_err(|e| {
        BotError::ConfigError(format!(
            "Failed to parse config file '{}': {}",
            path.display(),
            e
        ))
    })?;
    config.apply_env_overrides(|var| std::env::var(var).ok());
    Ok(config)
}

pub struct AppState {
    pub config: BotConfig,
    pub registry: HandlerRegistry,
    pub clients: Collaborators,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: BotConfig, registry: HandlerRegistry, clients: Collaborators) -> Self {
        Self {
            config,
            registry,
            clients,
            start_time: Instant::now(),
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<AppState>;
