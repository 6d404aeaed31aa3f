//! Opaque identities handed out by the platform and its collaborators.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn raw(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

opaque_id!(
    /// A platform user.
    UserId
);
opaque_id!(
    /// A platform lobby.
    LobbyId
);
opaque_id!(
    /// Avatar image owned by the avatar collaborator. Referenced, never freed here.
    AvatarHandle
);
opaque_id!(
    /// Per-speaker playback stream owned by the audio collaborator.
    OutputHandle
);
