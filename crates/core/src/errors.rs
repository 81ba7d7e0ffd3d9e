use thiserror::Error;

/// Every failure a command can hit. The message is shown to the chat user as-is.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BotError {
    #[error("{0}")]
    ConfigMissing(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    MalformedResponse(String),
}

impl BotError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigMissing(_) => "config_missing",
            Self::NotFound(_) => "not_found",
            Self::Transport(_) => "transport",
            Self::MalformedResponse(_) => "malformed_response",
        }
    }

    pub fn user_not_found(name: &str) -> Self {
        Self::NotFound(format!("Couldn't find any users with the name \"{name}\""))
    }
}
