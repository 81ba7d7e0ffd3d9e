use std::env;
use std::fs;
use std::path::Path;

use redbot_core::config::{detect_config_path, AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

use crate::commands::CommandResult;

struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::failed(format!("config validation failed: {error}")),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    CommandResult::ok(lines.join("\n"))
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let api_token = config
        .redmine
        .api_token
        .as_ref()
        .map(|token| redact_token(token.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());
    let ignore_users = if config.mention.ignore_users.is_empty() {
        "<none>".to_string()
    } else {
        config.mention.ignore_users.join(",")
    };

    vec![
        Field {
            key: "redmine.base_url",
            value: config.redmine.base_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            env_keys: &["REDBOT_REDMINE_BASE_URL"],
        },
        Field { key: "redmine.api_token", value: api_token, env_keys: &["REDBOT_REDMINE_TOKEN"] },
        Field {
            key: "redmine.search_limit",
            value: config.redmine.search_limit.to_string(),
            env_keys: &["REDBOT_REDMINE_SEARCH_LIMIT"],
        },
        Field {
            key: "mention.regex",
            value: config.mention.regex.clone().unwrap_or_else(|| "<unset>".to_string()),
            env_keys: &["REDBOT_MENTION_REGEX"],
        },
        Field {
            key: "mention.match_index",
            value: config.mention.match_index.to_string(),
            env_keys: &["REDBOT_MENTION_MATCH"],
        },
        Field {
            key: "mention.ignore_users",
            value: ignore_users,
            env_keys: &["REDBOT_MENTION_IGNORE_USERS"],
        },
        Field {
            key: "chat.bot_name",
            value: config.chat.bot_name.clone(),
            env_keys: &["REDBOT_CHAT_BOT_NAME"],
        },
        Field {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["REDBOT_LOGGING_LEVEL", "REDBOT_LOG_LEVEL"],
        },
        Field {
            key: "logging.format",
            value: format!("{:?}", config.logging.format),
            env_keys: &["REDBOT_LOGGING_FORMAT", "REDBOT_LOG_FORMAT"],
        },
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps the last four characters of long tokens so operators can tell keys apart.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    let chars: Vec<char> = trimmed.chars().collect();
    if chars.len() < 12 {
        return "<redacted>".to_string();
    }

    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("***{tail}")
}

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::{contains_path, redact_token};

    #[test]
    fn redaction_never_reveals_short_tokens() {
        assert_eq!(redact_token(""), "<empty>");
        assert_eq!(redact_token("abc123"), "<redacted>");
        assert_eq!(redact_token("0123456789abcdef"), "***cdef");
    }

    #[test]
    fn nested_keys_are_found_in_file_doc() {
        let doc: Value = "[redmine]\nbase_url = \"https://tracker.example\"\n"
            .parse()
            .expect("toml parses");
        assert!(contains_path(&doc, "redmine.base_url"));
        assert!(!contains_path(&doc, "redmine.api_token"));
        assert!(!contains_path(&doc, "chat.bot_name"));
    }
}
