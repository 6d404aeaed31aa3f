pub mod errors;
pub mod id;

pub use errors::{ConfigError, LobbyError};
pub use id::{AvatarHandle, LobbyId, OutputHandle, UserId};

pub type Result<T> = std::result::Result<T, LobbyError>;
