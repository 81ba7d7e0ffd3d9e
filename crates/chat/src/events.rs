use std::sync::Arc;

use async_trait::async_trait;
use redbot_core::{config::MentionConfig, BotError, IssueId};
use redbot_tracker::TrackerApi;
use regex::Regex;
use thiserror::Error;
use tracing::{error, info};

use crate::{
    commands::{CommandRouter, TrackerCommandService},
    render,
    replies::OutboundMessage,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatEnvelope {
    pub envelope_id: String,
    pub event: ChatEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatEvent {
    Message(MessageEvent),
    Unsupported { event_type: String },
}

impl ChatEvent {
    pub fn event_type(&self) -> ChatEventType {
        match self {
            Self::Message(_) => ChatEventType::Message,
            Self::Unsupported { .. } => ChatEventType::Unsupported,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChatEventType {
    Message,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub room: String,
    pub user_name: String,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded(Vec<OutboundMessage>),
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Tracker(#[from] BotError),
}

impl EventHandlerError {
    /// The single reply a failed handler owes the sender.
    pub fn reply(&self) -> OutboundMessage {
        OutboundMessage::reply(self.to_string())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Tracker(tracker_error) => tracker_error.kind(),
        }
    }
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

/// Tries handlers in registration order. The first handler that does not ignore the event
/// owns it; later handlers never see it.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.push(Arc::new(handler));
    }

    /// Handler failures are logged and turned into a reply; they never escape.
    pub async fn dispatch(&self, envelope: &ChatEnvelope, ctx: &EventContext) -> HandlerResult {
        for handler in &self.handlers {
            match handler.handle(envelope, ctx).await {
                Ok(HandlerResult::Ignored) => continue,
                Ok(result) => return result,
                Err(handler_error) => {
                    error!(
                        event_name = "chat.handler.failed",
                        handler = handler.name(),
                        correlation_id = %ctx.correlation_id,
                        error_kind = handler_error.kind(),
                        error = %handler_error,
                        "chat handler failed; replying with error"
                    );
                    return HandlerResult::Responded(vec![handler_error.reply()]);
                }
            }
        }

        HandlerResult::Ignored
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|handler| handler.name()).collect()
    }
}

pub struct CommandHandler<S> {
    router: CommandRouter<S>,
}

impl<S> CommandHandler<S>
where
    S: TrackerCommandService,
{
    pub fn new(router: CommandRouter<S>) -> Self {
        Self { router }
    }
}

#[async_trait]
impl<S> EventHandler for CommandHandler<S>
where
    S: TrackerCommandService + 'static,
{
    fn name(&self) -> &'static str {
        "command"
    }

    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let ChatEvent::Message(message) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        let Some(command) = self.router.parse(&message.text) else {
            return Ok(HandlerResult::Ignored);
        };

        info!(
            event_name = "chat.command.matched",
            command = command.name(),
            issue_id = command.issue_id().map(|id| id.0),
            user = %message.user_name,
            room = %message.room,
            correlation_id = %ctx.correlation_id,
            "routing chat command"
        );

        let replies = self.router.route(command, &message.user_name).await?;
        Ok(HandlerResult::Responded(replies))
    }
}

/// Passive listener that answers incidental issue references (`see #123`) with a one-line
/// summary and the issue link.
pub struct MentionListener {
    tracker: Arc<dyn TrackerApi>,
    pattern: Regex,
    settings: MentionConfig,
}

impl MentionListener {
    /// `pattern` is the compiled form of `settings.regex`.
    pub fn new(tracker: Arc<dyn TrackerApi>, pattern: Regex, settings: MentionConfig) -> Self {
        Self { tracker, pattern, settings }
    }

    fn mentioned_issue(&self, message: &MessageEvent) -> Option<IssueId> {
        if self.settings.is_ignored(&message.user_name) {
            return None;
        }

        let captures = self.pattern.captures(&message.text)?;
        let id = captures.get(self.settings.match_index)?.as_str().trim().parse::<u64>().ok()?;
        (id != 0).then_some(IssueId(id))
    }
}

#[async_trait]
impl EventHandler for MentionListener {
    fn name(&self) -> &'static str {
        "mention"
    }

    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let ChatEvent::Message(message) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        let Some(issue_id) = self.mentioned_issue(message) else {
            return Ok(HandlerResult::Ignored);
        };

        info!(
            event_name = "chat.mention.matched",
            issue_id = issue_id.0,
            user = %message.user_name,
            correlation_id = %ctx.correlation_id,
            "summarizing mentioned issue"
        );

        let issue = self.tracker.get_issue(issue_id, false).await?;
        Ok(HandlerResult::Responded(vec![
            OutboundMessage::send(render::mention_summary(&issue)),
            OutboundMessage::send(self.tracker.issue_url(issue_id)),
        ]))
    }
}
