//! Inbound triggers.
//!
//! Everything the engine reacts to arrives as one [`Trigger`]: button
//! presses, messages, slash commands, timer fires, server events, and
//! the startup signal. The gateway deserializes triggers off the wire;
//! timer fires are injected by the run loop from the scheduler channel.

use serde::{Deserialize, Serialize};

use crate::gateway::{ChannelId, Destination, GuildId, MessageId, UserId};
use crate::sched::TimerKey;

/// A single unit of work for the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "trigger", rename_all = "snake_case")]
pub enum Trigger {
    /// A component button was pressed.
    Button(ButtonPress),
    /// A message was posted (channel or private).
    Message(InboundMessage),
    /// A slash command was invoked.
    Command(CommandInvocation),
    /// A scheduled deadline fired.
    Timer(TimerKey),
    /// Something happened in the guild itself.
    Server(ServerEvent),
    /// The process came up; post panels and seed periodic timers.
    Startup {
        /// The served guild.
        guild: GuildId,
    },
}

/// A button press on a panel or announcement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ButtonPress {
    /// Guild the press happened in.
    pub guild: GuildId,
    /// Channel of the message carrying the button.
    pub channel: ChannelId,
    /// The message carrying the button.
    pub message: MessageId,
    /// Who pressed it.
    pub actor: UserId,
    /// Opaque button id, parsed by [`ButtonAction::parse`].
    pub custom_id: String,
}

/// A posted message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Guild, absent for private messages.
    pub guild: Option<GuildId>,
    /// Channel the message was posted in.
    pub channel: ChannelId,
    /// The author.
    pub author: UserId,
    /// Message text.
    pub text: String,
    /// Whether this is a private (direct) message.
    #[serde(default)]
    pub private: bool,
    /// Whether the author is a bot (including this one).
    #[serde(default)]
    pub from_bot: bool,
}

/// A slash-command invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandInvocation {
    /// Guild the command was invoked in.
    pub guild: GuildId,
    /// Channel the command was invoked in.
    pub channel: ChannelId,
    /// The invoking user.
    pub invoker: UserId,
    /// The command and its arguments.
    #[serde(flatten)]
    pub command: Command,
}

impl CommandInvocation {
    /// Invoker-only reply destination for this invocation.
    #[must_use]
    pub fn reply_destination(&self) -> Destination {
        Destination::Ephemeral {
            channel: self.channel,
            user: self.invoker,
        }
    }
}

/// Commands the engine understands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Start a timed giveaway in the current channel.
    GiveawayStart {
        /// Prize description.
        prize: String,
        /// Duration string, e.g. `"30s"`, `"2d"`.
        duration: String,
        /// How many winners to draw.
        #[serde(default = "default_winners")]
        winners: u32,
    },
    /// End the current channel's running giveaway immediately.
    GiveawayEnd,
    /// Redraw winners for a completed giveaway.
    GiveawayReroll {
        /// The completed giveaway's id.
        id: String,
    },
    /// List recent completed giveaways in the current channel.
    GiveawayList,
    /// Start the number-guessing game.
    GameStart {
        /// Upper bound of the secret number.
        bound: u64,
        /// Forced secret number, for rigged rounds.
        #[serde(default)]
        target: Option<u64>,
    },
    /// Stop the running game and reveal the number.
    GameStop,
    /// Submit a review.
    Review {
        /// Review site name.
        site: String,
        /// Rating from 1 to 5.
        rating: u8,
        /// Free-form feedback.
        #[serde(default)]
        feedback: String,
    },
}

const fn default_winners() -> u32 {
    1
}

/// Something that happened in the guild, outside any workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A member joined.
    MemberJoined {
        /// The guild.
        guild: GuildId,
        /// The new member.
        user: UserId,
        /// Member count after joining, if known.
        #[serde(default)]
        member_count: Option<u64>,
    },
    /// A member left.
    MemberLeft {
        /// The guild.
        guild: GuildId,
        /// The departed member.
        user: UserId,
    },
    /// A message was edited.
    MessageEdited {
        /// The guild.
        guild: GuildId,
        /// Channel of the message.
        channel: ChannelId,
        /// Author of the message.
        author: UserId,
        /// Text before the edit.
        before: String,
        /// Text after the edit.
        after: String,
    },
    /// A message was deleted.
    MessageDeleted {
        /// The guild.
        guild: GuildId,
        /// Channel of the message.
        channel: ChannelId,
        /// Author of the message.
        author: UserId,
        /// The removed text.
        content: String,
    },
    /// A role was created.
    RoleCreated {
        /// The guild.
        guild: GuildId,
        /// Role name.
        name: String,
    },
    /// A role was deleted.
    RoleDeleted {
        /// The guild.
        guild: GuildId,
        /// Role name.
        name: String,
    },
    /// A member was banned.
    MemberBanned {
        /// The guild.
        guild: GuildId,
        /// The banned user.
        user: UserId,
    },
    /// A member's voice channel changed. Absent names mean not in voice.
    VoiceStateChanged {
        /// The guild.
        guild: GuildId,
        /// The member.
        user: UserId,
        /// Voice channel name before the change.
        #[serde(default)]
        before: Option<String>,
        /// Voice channel name after the change.
        #[serde(default)]
        after: Option<String>,
    },
    /// A guild channel was created.
    ChannelCreated {
        /// The guild.
        guild: GuildId,
        /// Channel name.
        name: String,
    },
    /// A guild channel was deleted.
    ChannelDeleted {
        /// The guild.
        guild: GuildId,
        /// Channel name.
        name: String,
    },
    /// A member's guild profile changed (nickname, roles).
    MemberUpdated {
        /// The guild.
        guild: GuildId,
        /// The member.
        user: UserId,
        /// Nickname before the change.
        #[serde(default)]
        before_nick: Option<String>,
        /// Nickname after the change.
        #[serde(default)]
        after_nick: Option<String>,
        /// Names of roles gained.
        #[serde(default)]
        roles_added: Vec<String>,
        /// Names of roles lost.
        #[serde(default)]
        roles_removed: Vec<String>,
    },
    /// A user's account profile changed (username).
    UserUpdated {
        /// The user.
        user: UserId,
        /// Username before the change.
        before_name: String,
        /// Username after the change.
        after_name: String,
    },
}

/// Decoded button intent.
///
/// Button ids are flat strings so they survive round-trips through the
/// platform; ids carrying an argument use a `:` separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    /// Open a support ticket (`ticket_open`).
    TicketOpen,
    /// Close the current ticket (`ticket_close`).
    TicketClose,
    /// Enter a giveaway (`giveaway_enter:<id>`).
    GiveawayEnter(String),
    /// Begin a staff application (`application_start`).
    ApplicationStart,
    /// Approve an application (`application_approve:<user id>`).
    ApplicationApprove(UserId),
    /// Deny an application (`application_deny:<user id>`).
    ApplicationDeny(UserId),
}

impl ButtonAction {
    /// Parses a custom id. Unknown ids return `None` and are ignored.
    #[must_use]
    pub fn parse(custom_id: &str) -> Option<Self> {
        match custom_id {
            "ticket_open" => return Some(Self::TicketOpen),
            "ticket_close" => return Some(Self::TicketClose),
            "application_start" => return Some(Self::ApplicationStart),
            _ => {}
        }
        let (prefix, arg) = custom_id.split_once(':')?;
        match prefix {
            "giveaway_enter" if !arg.is_empty() => Some(Self::GiveawayEnter(arg.to_string())),
            "application_approve" => arg.parse().ok().map(|id| Self::ApplicationApprove(UserId(id))),
            "application_deny" => arg.parse().ok().map(|id| Self::ApplicationDeny(UserId(id))),
            _ => None,
        }
    }
}

impl Trigger {
    /// Where a rejection or confirmation for this trigger should go.
    ///
    /// Button presses and commands get invoker-only replies; private
    /// messages get a direct reply. Other triggers have no natural
    /// reply destination.
    #[must_use]
    pub fn reply_destination(&self) -> Option<Destination> {
        match self {
            Self::Button(press) => Some(Destination::Ephemeral {
                channel: press.channel,
                user: press.actor,
            }),
            Self::Command(invocation) => Some(Destination::Ephemeral {
                channel: invocation.channel,
                user: invocation.invoker,
            }),
            Self::Message(message) if message.private => Some(Destination::Direct {
                user: message.author,
            }),
            _ => None,
        }
    }
}
