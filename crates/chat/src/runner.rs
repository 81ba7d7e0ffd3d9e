use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use crate::{
    events::{ChatEnvelope, ChatEvent, EventContext, EventDispatcher, HandlerResult},
    replies::OutboundMessage,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport ack failed: {0}")]
    Acknowledge(String),
    #[error("transport delivery failed: {0}")]
    Deliver(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// A chat connection. `next_envelope` returning `None` means the stream closed cleanly.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_envelope(&self) -> Result<Option<ChatEnvelope>, TransportError>;
    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError>;
    async fn deliver(
        &self,
        envelope: &ChatEnvelope,
        messages: &[OutboundMessage],
    ) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

/// Pumps envelopes from a transport into the dispatcher. Each envelope is handled on its
/// own task, so slow tracker calls do not hold up later messages.
pub struct BotRunner {
    transport: Arc<dyn ChatTransport>,
    dispatcher: Arc<EventDispatcher>,
    reconnect_policy: ReconnectPolicy,
}

impl BotRunner {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        dispatcher: EventDispatcher,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, dispatcher: Arc::new(dispatcher), reconnect_policy }
    }

    pub async fn start(&self) -> Result<()> {
        let mut in_flight = JoinSet::new();
        let outcome = self.run_attempts(&mut in_flight).await;
        drain(&mut in_flight).await;
        outcome
    }

    async fn run_attempts(&self, in_flight: &mut JoinSet<()>) -> Result<()> {
        for attempt in 0..=self.reconnect_policy.max_retries {
            match self.connect_and_pump(attempt, in_flight).await {
                Ok(()) => return Ok(()),
                Err(transport_error) => {
                    warn!(
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "chat transport failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "chat transport retries exhausted; continuing process without crash"
                        );
                        return Ok(());
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Ok(())
    }

    async fn connect_and_pump(
        &self,
        attempt: u32,
        in_flight: &mut JoinSet<()>,
    ) -> Result<(), TransportError> {
        info!(attempt, "opening chat transport connection");
        self.transport.connect().await?;
        info!(attempt, "chat transport connected");

        loop {
            let Some(envelope) = self.transport.next_envelope().await? else {
                info!(attempt, in_flight = in_flight.len(), "chat transport stream closed");
                drain(in_flight).await;
                self.transport.disconnect().await?;
                return Ok(());
            };
            let user = sender_of(&envelope);

            info!(
                event_name = "ingress.chat.envelope_received",
                envelope_id = %envelope.envelope_id,
                event_type = ?envelope.event.event_type(),
                correlation_id = %envelope.envelope_id,
                user = user.unwrap_or("unknown"),
                "received chat envelope"
            );

            if let Err(error) = self.transport.acknowledge(&envelope.envelope_id).await {
                warn!(
                    event_name = "ingress.chat.ack_sent",
                    envelope_id = %envelope.envelope_id,
                    correlation_id = %envelope.envelope_id,
                    error = %error,
                    "failed to acknowledge chat envelope"
                );
            } else {
                debug!(
                    event_name = "ingress.chat.ack_sent",
                    envelope_id = %envelope.envelope_id,
                    correlation_id = %envelope.envelope_id,
                    "acknowledged chat envelope"
                );
            }

            reap_finished(in_flight);
            let transport = self.transport.clone();
            let dispatcher = self.dispatcher.clone();
            in_flight.spawn(async move { handle_envelope(transport, dispatcher, envelope).await });
        }
    }
}

/// Collects envelope tasks that have already finished without waiting on the rest.
fn reap_finished(in_flight: &mut JoinSet<()>) {
    while let Some(joined) = in_flight.try_join_next() {
        log_join_failure(joined);
    }
}

async fn drain(in_flight: &mut JoinSet<()>) {
    while let Some(joined) = in_flight.join_next().await {
        log_join_failure(joined);
    }
}

fn log_join_failure(joined: Result<(), JoinError>) {
    if let Err(join_error) = joined {
        warn!(error = %join_error, "envelope task ended abnormally");
    }
}

async fn handle_envelope(
    transport: Arc<dyn ChatTransport>,
    dispatcher: Arc<EventDispatcher>,
    envelope: ChatEnvelope,
) {
    let context = EventContext { correlation_id: envelope.envelope_id.clone() };
    let HandlerResult::Responded(messages) = dispatcher.dispatch(&envelope, &context).await else {
        return;
    };

    match transport.deliver(&envelope, &messages).await {
        Ok(()) => debug!(
            event_name = "egress.chat.delivered",
            correlation_id = %context.correlation_id,
            messages = messages.len(),
            "delivered chat replies"
        ),
        Err(error) => warn!(
            event_name = "egress.chat.delivered",
            correlation_id = %context.correlation_id,
            error = %error,
            "failed to deliver chat replies"
        ),
    }
}

fn sender_of(envelope: &ChatEnvelope) -> Option<&str> {
    match &envelope.event {
        ChatEvent::Message(message) => Some(message.user_name.as_str()),
        ChatEvent::Unsupported { .. } => None,
    }
}
