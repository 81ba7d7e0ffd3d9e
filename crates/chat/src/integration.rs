use std::sync::Arc;

use redbot_core::config::{AppConfig, ConfigError};
use redbot_tracker::{RedmineClient, TrackerApi};
use thiserror::Error;
use tracing::{error, info};

use crate::{
    commands::CommandRouter,
    events::{CommandHandler, EventDispatcher, MentionListener},
    service::TrackerCommands,
};

#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("command patterns failed to compile: {0}")]
    Patterns(#[from] regex::Error),
    #[error(transparent)]
    Mention(#[from] ConfigError),
}

/// Builds the dispatcher for `config`. Missing tracker settings, or anything else that keeps
/// the integration from starting, is logged and yields a dispatcher with no handlers.
pub fn register(config: &AppConfig) -> EventDispatcher {
    let settings = match config.redmine.settings() {
        Ok(settings) => settings,
        Err(missing) => {
            error!(event_name = "integration.config_missing", error = %missing, "{missing}");
            return EventDispatcher::new();
        }
    };

    let client = match RedmineClient::new(&settings) {
        Ok(client) => client,
        Err(client_error) => {
            error!(
                event_name = "integration.client_failed",
                error = %client_error,
                "tracker client could not be built"
            );
            return EventDispatcher::new();
        }
    };

    match build_dispatcher(config, Arc::new(client)) {
        Ok(dispatcher) => {
            info!(
                event_name = "integration.registered",
                handlers = ?dispatcher.handler_names(),
                base_url = %settings.base_url,
                "tracker integration registered"
            );
            dispatcher
        }
        Err(build_error) => {
            error!(
                event_name = "integration.build_failed",
                error = %build_error,
                "tracker integration not registered"
            );
            EventDispatcher::new()
        }
    }
}

/// Registers the command handler, then the mention listener when a mention pattern is set.
pub fn build_dispatcher(
    config: &AppConfig,
    tracker: Arc<dyn TrackerApi>,
) -> Result<EventDispatcher, IntegrationError> {
    let service = TrackerCommands::new(tracker.clone(), config.redmine.search_limit);
    let router = CommandRouter::new(config.chat.bot_name.clone(), service)?;

    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(CommandHandler::new(router));

    if let Some(pattern) = config.mention.pattern()? {
        dispatcher.register(MentionListener::new(tracker, pattern, config.mention.clone()));
    }

    Ok(dispatcher)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use redbot_core::config::AppConfig;

    use super::{build_dispatcher, register};
    use crate::{
        events::{ChatEnvelope, ChatEvent, EventContext, HandlerResult, MessageEvent},
        testing::{issue, FakeTracker},
    };

    fn message(user_name: &str, text: &str) -> ChatEnvelope {
        ChatEnvelope {
            envelope_id: "env-1".to_owned(),
            event: ChatEvent::Message(MessageEvent {
                room: "general".to_owned(),
                user_name: user_name.to_owned(),
                text: text.to_owned(),
            }),
        }
    }

    #[test]
    fn missing_settings_register_nothing() {
        let dispatcher = register(&AppConfig::default());
        assert_eq!(dispatcher.handler_count(), 0);
    }

    #[test]
    fn registers_command_handler_and_optional_mention_listener() {
        let mut config = AppConfig::default();
        let dispatcher =
            build_dispatcher(&config, Arc::new(FakeTracker::new())).expect("dispatcher");
        assert_eq!(dispatcher.handler_names(), vec!["command"]);

        config.mention.regex = Some(r"#(\d+)".to_owned());
        let dispatcher =
            build_dispatcher(&config, Arc::new(FakeTracker::new())).expect("dispatcher");
        assert_eq!(dispatcher.handler_names(), vec!["command", "mention"]);
    }

    #[tokio::test]
    async fn mention_listener_honours_configured_ignore_list() {
        let mut config = AppConfig::default();
        config.mention.regex = Some(r"#(\d+)".to_owned());
        config.mention.ignore_users = vec!["redmine-plugin".to_owned()];
        let tracker = Arc::new(FakeTracker::new().with_issue(issue(42, "New")));
        let dispatcher = build_dispatcher(&config, tracker.clone()).expect("dispatcher");

        let from_plugin = dispatcher
            .dispatch(&message("redmine-plugin", "closed #42"), &EventContext::default())
            .await;
        assert_eq!(from_plugin, HandlerResult::Ignored);
        assert!(tracker.calls().is_empty());

        let from_person =
            dispatcher.dispatch(&message("alice", "see #42"), &EventContext::default()).await;
        assert!(matches!(from_person, HandlerResult::Responded(ref replies) if replies.len() == 2));
    }

    #[test]
    fn invalid_mention_pattern_is_a_build_error() {
        let mut config = AppConfig::default();
        config.mention.regex = Some("#(".to_owned());
        assert!(build_dispatcher(&config, Arc::new(FakeTracker::new())).is_err());
    }

    #[test]
    fn configured_settings_register_handlers() {
        let mut config = AppConfig::default();
        config.redmine.base_url = Some("https://tracker.example/".to_owned());
        config.redmine.api_token = Some("secret".to_owned().into());
        assert_eq!(register(&config).handler_count(), 1);
    }
}
