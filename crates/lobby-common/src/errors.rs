use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// An owner-only mutation was attempted by a non-owner. Local state is
    /// left untouched.
    #[error("{operation} requires lobby ownership")]
    NotOwner { operation: &'static str },

    #[error("{operation} called while the session is not active")]
    NotActive { operation: &'static str },

    #[error("chat message is {len} bytes, limit is {max}")]
    ChatMessageTooLong { len: usize, max: usize },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl LobbyError {
    /// True for failures the host may treat as a silent no-op.
    pub fn is_authorization(&self) -> bool {
        matches!(self, LobbyError::NotOwner { .. })
    }
}
