use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::BotError;

pub const DEFAULT_SEARCH_LIMIT: u32 = 10;
pub const DEFAULT_MENTION_MATCH_INDEX: usize = 1;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub redmine: RedmineConfig,
    pub mention: MentionConfig,
    pub chat: ChatConfig,
    pub logging: LoggingConfig,
}

/// Tracker connection settings. Base URL and token stay optional at load time so
/// that a host can start without the integration; see [`RedmineConfig::settings`].
#[derive(Clone, Debug)]
pub struct RedmineConfig {
    pub base_url: Option<String>,
    pub api_token: Option<SecretString>,
    pub search_limit: u32,
}

#[derive(Clone, Debug)]
pub struct MentionConfig {
    pub regex: Option<String>,
    pub match_index: usize,
    pub ignore_users: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct ChatConfig {
    pub bot_name: String,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

/// Fully-present tracker settings, produced only when both required values exist.
#[derive(Clone, Debug)]
pub struct TrackerSettings {
    pub base_url: String,
    pub api_token: SecretString,
    pub search_limit: u32,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub redmine_base_url: Option<String>,
    pub redmine_api_token: Option<String>,
    pub redmine_search_limit: Option<u32>,
    pub mention_regex: Option<String>,
    pub mention_ignore_users: Option<Vec<String>>,
    pub bot_name: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            redmine: RedmineConfig {
                base_url: None,
                api_token: None,
                search_limit: DEFAULT_SEARCH_LIMIT,
            },
            mention: MentionConfig {
                regex: None,
                match_index: DEFAULT_MENTION_MATCH_INDEX,
                ignore_users: Vec::new(),
            },
            chat: ChatConfig { bot_name: "redbot".to_string() },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl RedmineConfig {
    /// Returns the settings needed to talk to the tracker, or `ConfigMissing` naming
    /// the first absent value.
    pub fn settings(&self) -> Result<TrackerSettings, BotError> {
        let base_url = self
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                BotError::ConfigMissing(
                    "REDBOT_REDMINE_BASE_URL configuration variable missing.".to_string(),
                )
            })?;

        let api_token = self
            .api_token
            .as_ref()
            .filter(|token| !token.expose_secret().trim().is_empty())
            .cloned()
            .ok_or_else(|| {
                BotError::ConfigMissing(
                    "REDBOT_REDMINE_TOKEN configuration variable missing.".to_string(),
                )
            })?;

        Ok(TrackerSettings {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
            search_limit: self.search_limit,
        })
    }
}

impl MentionConfig {
    /// Compiled mention pattern, `None` when the listener is disabled.
    pub fn pattern(&self) -> Result<Option<Regex>, ConfigError> {
        let Some(raw) = self.regex.as_deref().filter(|value| !value.trim().is_empty()) else {
            return Ok(None);
        };

        Regex::new(raw).map(Some).map_err(|error| {
            ConfigError::Validation(format!("mention.regex is not a valid pattern: {error}"))
        })
    }

    pub fn is_ignored(&self, user_name: &str) -> bool {
        self.ignore_users.iter().any(|ignored| ignored == user_name)
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("redbot.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(redmine) = patch.redmine {
            if let Some(base_url) = redmine.base_url {
                self.redmine.base_url = Some(base_url);
            }
            if let Some(api_token) = redmine.api_token {
                self.redmine.api_token = Some(secret_value(api_token));
            }
            if let Some(search_limit) = redmine.search_limit {
                self.redmine.search_limit = search_limit;
            }
        }

        if let Some(mention) = patch.mention {
            if let Some(regex) = mention.regex {
                self.mention.regex = Some(regex);
            }
            if let Some(match_index) = mention.match_index {
                self.mention.match_index = match_index;
            }
            if let Some(ignore_users) = mention.ignore_users {
                self.mention.ignore_users = ignore_users;
            }
        }

        if let Some(chat) = patch.chat {
            if let Some(bot_name) = chat.bot_name {
                self.chat.bot_name = bot_name;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("REDBOT_REDMINE_BASE_URL") {
            self.redmine.base_url = Some(value);
        }
        if let Some(value) = read_env("REDBOT_REDMINE_TOKEN") {
            self.redmine.api_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("REDBOT_REDMINE_SEARCH_LIMIT") {
            self.redmine.search_limit = parse_u32("REDBOT_REDMINE_SEARCH_LIMIT", &value)?;
        }

        if let Some(value) = read_env("REDBOT_MENTION_REGEX") {
            self.mention.regex = Some(value);
        }
        if let Some(value) = read_env("REDBOT_MENTION_MATCH") {
            self.mention.match_index = parse_usize("REDBOT_MENTION_MATCH", &value)?;
        }
        if let Some(value) = read_env("REDBOT_MENTION_IGNORE_USERS") {
            self.mention.ignore_users = split_user_list(&value);
        }

        if let Some(value) = read_env("REDBOT_CHAT_BOT_NAME") {
            self.chat.bot_name = value;
        }

        let log_level = read_env("REDBOT_LOGGING_LEVEL").or_else(|| read_env("REDBOT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("REDBOT_LOGGING_FORMAT").or_else(|| read_env("REDBOT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(base_url) = overrides.redmine_base_url {
            self.redmine.base_url = Some(base_url);
        }
        if let Some(api_token) = overrides.redmine_api_token {
            self.redmine.api_token = Some(secret_value(api_token));
        }
        if let Some(search_limit) = overrides.redmine_search_limit {
            self.redmine.search_limit = search_limit;
        }
        if let Some(regex) = overrides.mention_regex {
            self.mention.regex = Some(regex);
        }
        if let Some(ignore_users) = overrides.mention_ignore_users {
            self.mention.ignore_users = ignore_users;
        }
        if let Some(bot_name) = overrides.bot_name {
            self.chat.bot_name = bot_name;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_redmine(&self.redmine)?;
        validate_mention(&self.mention)?;
        validate_chat(&self.chat)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("redbot.toml"), PathBuf::from("config/redbot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

/// Path of the config file that `AppConfig::load` would read with default options.
pub fn detect_config_path() -> Option<PathBuf> {
    resolve_config_path(None)
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_redmine(redmine: &RedmineConfig) -> Result<(), ConfigError> {
    if let Some(base_url) = redmine.base_url.as_deref().map(str::trim) {
        if !base_url.is_empty()
            && !base_url.starts_with("http://")
            && !base_url.starts_with("https://")
        {
            return Err(ConfigError::Validation(
                "redmine.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    if redmine.search_limit == 0 {
        return Err(ConfigError::Validation(
            "redmine.search_limit must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_mention(mention: &MentionConfig) -> Result<(), ConfigError> {
    let Some(pattern) = mention.pattern()? else {
        return Ok(());
    };

    if mention.match_index >= pattern.captures_len() {
        return Err(ConfigError::Validation(format!(
            "mention.match_index {} is out of range for a pattern with {} capture group(s)",
            mention.match_index,
            pattern.captures_len() - 1
        )));
    }

    Ok(())
}

fn validate_chat(chat: &ChatConfig) -> Result<(), ConfigError> {
    if chat.bot_name.trim().is_empty() {
        return Err(ConfigError::Validation("chat.bot_name must not be empty".to_string()));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn split_user_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .collect()
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    redmine: Option<RedminePatch>,
    mention: Option<MentionPatch>,
    chat: Option<ChatPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct RedminePatch {
    base_url: Option<String>,
    api_token: Option<String>,
    search_limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct MentionPatch {
    regex: Option<String>,
    match_index: Option<usize>,
    ignore_users: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatPatch {
    bot_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
