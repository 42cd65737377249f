//! Newtype identifiers for platform objects.
//!
//! The platform's snowflake-style ids are opaque `u64`s; wrapping them
//! keeps a guild id from ever being handed to a function expecting a
//! user id. All of them serialize transparently as plain numbers.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }
    };
}

id_type!(
    /// A guild (server) id.
    GuildId
);
id_type!(
    /// A channel id.
    ChannelId
);
id_type!(
    /// A user id.
    UserId
);
id_type!(
    /// A message id.
    MessageId
);
id_type!(
    /// A role id.
    RoleId
);

/// A delivered message: the channel it landed in plus its message id.
///
/// Returned by [`Notifier::post`](super::Notifier::post) and used later
/// to edit or delete the delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    /// Channel the message was delivered to.
    pub channel: ChannelId,
    /// Platform-assigned message id.
    pub message: MessageId,
}
