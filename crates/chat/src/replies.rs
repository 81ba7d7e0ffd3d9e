use serde::Serialize;

/// How a message reaches the room: a reply is addressed back to the sender, a send is a
/// plain message to the room.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    Reply,
    Send,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub delivery: Delivery,
    pub text: String,
}

impl OutboundMessage {
    pub fn reply(text: impl Into<String>) -> Self {
        Self { delivery: Delivery::Reply, text: text.into() }
    }

    pub fn send(text: impl Into<String>) -> Self {
        Self { delivery: Delivery::Send, text: text.into() }
    }
}

/// Accumulates reply lines; `build` joins them with newlines.
#[derive(Debug, Default)]
pub struct TextBuilder {
    lines: Vec<String>,
}

impl TextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }

    /// Adds `line` preceded by an empty line.
    pub fn spaced(self, line: impl AsRef<str>) -> Self {
        let line = format!("\n{}", line.as_ref());
        self.line(line)
    }

    pub fn extend<I, L>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        self.lines.extend(lines.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> String {
        self.lines.join("\n")
    }
}

const HELP_LINES: [&str; 11] = [
    "rm link me <issue-id> - Reply with the issue URL",
    "rm set <issue-id> to <int>% [\"comments\"] - Update the issue's done ratio",
    "rm add <hours> hours to <issue-id> [\"comments\"] - Log time on the issue",
    "rm show [my|<user's>] issues - List open issues assigned to you or someone else",
    "rm update <issue-id> with \"<note>\" - Add a note to the issue",
    "rm starting <issue-id> [<status>] - Move the issue to a status (In Progress by default)",
    "rm add issue to \"<project>\" [tracker <id>] with \"<subject>\" - Create an issue",
    "rm assign <issue-id> to <user> [\"notes\"] - Assign the issue by login or first name",
    "rm show <issue-id> - Show the issue with its journal",
    "rm search <query> - Search the tracker",
    "rm help - Show this list",
];

pub fn help_message() -> OutboundMessage {
    let text = TextBuilder::new()
        .line("Available commands (`redmine` works wherever `rm` does):")
        .extend(HELP_LINES)
        .build();
    OutboundMessage::reply(text)
}
