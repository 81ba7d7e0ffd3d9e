use async_trait::async_trait;
use redbot_chat::{
    events::{ChatEnvelope, ChatEvent, MessageEvent},
    replies::{Delivery, OutboundMessage},
    runner::{ChatTransport, TransportError},
};
use tokio::io::{
    self, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines, Stdin, Stdout,
};
use tokio::sync::Mutex;
use uuid::Uuid;

const ROOM: &str = "console";

/// Line-oriented chat transport. Each input line is `<user>: <text>`; lines without a
/// sender prefix are attributed to the local user.
pub struct ConsoleTransport<R, W> {
    input: Mutex<Lines<BufReader<R>>>,
    output: Mutex<W>,
    bot_name: String,
    local_user: String,
}

impl ConsoleTransport<Stdin, Stdout> {
    pub fn stdio(bot_name: &str) -> Self {
        let local_user = std::env::var("USER").unwrap_or_else(|_| "console".to_owned());
        Self::new(io::stdin(), io::stdout(), bot_name, local_user)
    }
}

impl<R, W> ConsoleTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(input: R, output: W, bot_name: &str, local_user: String) -> Self {
        Self {
            input: Mutex::new(BufReader::new(input).lines()),
            output: Mutex::new(output),
            bot_name: bot_name.to_owned(),
            local_user,
        }
    }

    fn envelope_for(&self, line: &str) -> ChatEnvelope {
        let (user_name, text) = match line.split_once(": ") {
            Some((user, text)) if self.is_sender(user) => (user.trim(), text),
            _ => (self.local_user.as_str(), line),
        };

        ChatEnvelope {
            envelope_id: Uuid::new_v4().to_string(),
            event: ChatEvent::Message(MessageEvent {
                room: ROOM.to_owned(),
                user_name: user_name.to_owned(),
                text: text.to_owned(),
            }),
        }
    }

    /// A prefix names the sender unless it is blank, contains spaces, or addresses the bot.
    fn is_sender(&self, prefix: &str) -> bool {
        let prefix = prefix.trim();
        !prefix.is_empty()
            && !prefix.contains(char::is_whitespace)
            && !prefix.trim_start_matches('@').eq_ignore_ascii_case(&self.bot_name)
    }
}

fn render(envelope: &ChatEnvelope, message: &OutboundMessage) -> String {
    match (&envelope.event, message.delivery) {
        (ChatEvent::Message(event), Delivery::Reply) => {
            format!("{}: {}", event.user_name, message.text)
        }
        _ => message.text.clone(),
    }
}

#[async_trait]
impl<R, W> ChatTransport for ConsoleTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<ChatEnvelope>, TransportError> {
        let mut input = self.input.lock().await;
        loop {
            let line = input
                .next_line()
                .await
                .map_err(|error| TransportError::Receive(error.to_string()))?;
            let Some(line) = line else {
                return Ok(None);
            };
            if line.trim().is_empty() {
                continue;
            }
            return Ok(Some(self.envelope_for(line.trim_end())));
        }
    }

    async fn acknowledge(&self, _envelope_id: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn deliver(
        &self,
        envelope: &ChatEnvelope,
        messages: &[OutboundMessage],
    ) -> Result<(), TransportError> {
        let mut output = self.output.lock().await;
        for message in messages {
            let line = format!("{}\n", render(envelope, message));
            output
                .write_all(line.as_bytes())
                .await
                .map_err(|error| TransportError::Deliver(error.to_string()))?;
        }
        output.flush().await.map_err(|error| TransportError::Deliver(error.to_string()))
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let mut output = self.output.lock().await;
        output.flush().await.map_err(|error| TransportError::Disconnect(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use redbot_chat::{
        events::{ChatEvent, MessageEvent},
        replies::OutboundMessage,
        runner::ChatTransport,
    };

    use super::ConsoleTransport;

    fn transport(input: &'static str) -> ConsoleTransport<&'static [u8], Vec<u8>> {
        ConsoleTransport::new(input.as_bytes(), Vec::new(), "redbot", "operator".to_owned())
    }

    fn message_of(event: ChatEvent) -> MessageEvent {
        match event {
            ChatEvent::Message(message) => message,
            other => panic!("expected a message, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn reads_sender_prefixed_lines_and_skips_blanks() {
        let transport = transport("alice: redbot rm show 42\n\n  \nredbot: rm link me 7\n");

        let first = transport.next_envelope().await.expect("read").expect("envelope");
        let first = message_of(first.event);
        assert_eq!(first.user_name, "alice");
        assert_eq!(first.text, "redbot rm show 42");
        assert_eq!(first.room, "console");

        let second = transport.next_envelope().await.expect("read").expect("envelope");
        let second = message_of(second.event);
        assert_eq!(second.user_name, "operator");
        assert_eq!(second.text, "redbot: rm link me 7");

        assert!(transport.next_envelope().await.expect("read").is_none());
    }

    #[tokio::test]
    async fn envelopes_get_unique_ids() {
        let transport = transport("a: one\nb: two\n");
        let first = transport.next_envelope().await.expect("read").expect("envelope");
        let second = transport.next_envelope().await.expect("read").expect("envelope");
        assert_ne!(first.envelope_id, second.envelope_id);
    }

    #[tokio::test]
    async fn replies_are_addressed_and_sends_are_bare() {
        let transport = transport("alice: see #42\n");
        let envelope = transport.next_envelope().await.expect("read").expect("envelope");

        transport
            .deliver(
                &envelope,
                &[
                    OutboundMessage::reply("Set #42 to 50%"),
                    OutboundMessage::send("https://tracker.example/issues/42"),
                ],
            )
            .await
            .expect("deliver");

        let output = String::from_utf8(transport.output.lock().await.clone()).expect("utf8");
        assert_eq!(output, "alice: Set #42 to 50%\nhttps://tracker.example/issues/42\n");
    }
}
