use std::sync::Arc;

use redbot_chat::runner::{BotRunner, ReconnectPolicy};
use redbot_core::config::AppConfig;
use tracing::info;

use crate::console::ConsoleTransport;

pub struct Application {
    pub config: AppConfig,
    pub handler_count: usize,
    pub runner: BotRunner,
}

/// Wires the tracker integration to the console transport. A config without tracker
/// settings still produces a runner; it just has nothing registered.
pub fn bootstrap_with_config(config: AppConfig) -> Application {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let dispatcher = redbot_chat::register(&config);
    let handler_count = dispatcher.handler_count();
    info!(
        event_name = "system.bootstrap.dispatcher_ready",
        correlation_id = "bootstrap",
        handlers = handler_count,
        "chat dispatcher ready"
    );

    let transport = Arc::new(ConsoleTransport::stdio(&config.chat.bot_name));
    let runner = BotRunner::new(transport, dispatcher, ReconnectPolicy::default());

    Application { config, handler_count, runner }
}
