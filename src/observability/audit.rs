//! Audit log.
//!
//! Every noteworthy state change is recorded twice: as a structured
//! tracing event for operators, and as a formatted notice in the guild's
//! log channel for moderators. Posting is best-effort; a failed delivery
//! never fails the workflow step that produced the event.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::gateway::{ChannelId, Content, Destination, Notifier, UserId};

/// A recordable state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    /// A giveaway was started.
    GiveawayStarted {
        /// Giveaway id.
        id: String,
        /// Prize description.
        prize: String,
        /// The starting user.
        host: UserId,
    },
    /// A giveaway ended and winners were drawn.
    GiveawayEnded {
        /// Giveaway id.
        id: String,
        /// Prize description.
        prize: String,
        /// Drawn winners; empty when nobody entered.
        winners: Vec<UserId>,
    },
    /// A completed giveaway was rerolled.
    GiveawayRerolled {
        /// Giveaway id.
        id: String,
        /// Replacement winners.
        winners: Vec<UserId>,
    },
    /// A support ticket channel was created.
    TicketOpened {
        /// Ticket owner.
        owner: UserId,
        /// The created channel.
        channel: ChannelId,
    },
    /// A ticket close was requested.
    TicketClosed {
        /// The ticket channel.
        channel: ChannelId,
        /// Who requested the close.
        actor: UserId,
    },
    /// A closed ticket channel was deleted after its grace period.
    TicketPurged {
        /// The deleted channel.
        channel: ChannelId,
    },
    /// A staff application was submitted for review.
    ApplicationSubmitted {
        /// The applicant.
        applicant: UserId,
    },
    /// A staff application was approved.
    ApplicationApproved {
        /// The applicant.
        applicant: UserId,
        /// The deciding staff member.
        actor: UserId,
    },
    /// A staff application was denied.
    ApplicationDenied {
        /// The applicant.
        applicant: UserId,
        /// The deciding staff member.
        actor: UserId,
    },
    /// An unfinished application was discarded by the reaper.
    ApplicationReaped {
        /// The applicant.
        applicant: UserId,
    },
    /// A number game was started.
    GameStarted {
        /// The starting admin.
        host: UserId,
        /// Upper bound of the secret number.
        bound: u64,
    },
    /// The number game was won.
    GameWon {
        /// The winning guesser.
        winner: UserId,
        /// The secret number.
        target: u64,
        /// Counted guesses, including the winning one.
        guesses: u64,
    },
    /// The number game was stopped without a winner.
    GameStopped {
        /// The stopping admin.
        actor: UserId,
        /// The unrevealed secret number.
        target: u64,
    },
    /// A review was submitted.
    ReviewSubmitted {
        /// The reviewer.
        user: UserId,
        /// Review site.
        site: String,
        /// Rating, 1 to 5.
        rating: u8,
    },
    /// A member joined the guild.
    MemberJoined {
        /// The new member.
        user: UserId,
        /// Member count after joining, if the gateway supplied it.
        member_count: Option<u64>,
    },
    /// A member left the guild.
    MemberLeft {
        /// The departed member.
        user: UserId,
    },
    /// A message was edited.
    MessageEdited {
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
        /// Channel of the message.
        channel: ChannelId,
        /// Author of the message.
        author: UserId,
        /// The removed text.
        content: String,
    },
    /// A role was created.
    RoleCreated {
        /// Role name.
        name: String,
    },
    /// A role was deleted.
    RoleDeleted {
        /// Role name.
        name: String,
    },
    /// A member was banned.
    MemberBanned {
        /// The banned user.
        user: UserId,
    },
    /// A member's voice channel changed.
    VoiceStateChanged {
        /// The member.
        user: UserId,
        /// Voice channel name before the change.
        before: Option<String>,
        /// Voice channel name after the change.
        after: Option<String>,
    },
    /// A guild channel was created.
    ChannelCreated {
        /// Channel name.
        name: String,
    },
    /// A guild channel was deleted.
    ChannelDeleted {
        /// Channel name.
        name: String,
    },
    /// A member's guild profile changed.
    MemberUpdated {
        /// The member.
        user: UserId,
        /// Nickname before the change.
        before_nick: Option<String>,
        /// Nickname after the change.
        after_nick: Option<String>,
        /// Names of roles gained.
        roles_added: Vec<String>,
        /// Names of roles lost.
        roles_removed: Vec<String>,
    },
    /// A user's account profile changed.
    UserUpdated {
        /// The user.
        user: UserId,
        /// Username before the change.
        before_name: String,
        /// Username after the change.
        after_name: String,
    },
}

const EXCERPT_LIMIT: usize = 256;

fn excerpt(text: &str) -> String {
    if text.chars().count() <= EXCERPT_LIMIT {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(EXCERPT_LIMIT).collect();
        cut.push('…');
        cut
    }
}

fn user_list(users: &[UserId]) -> String {
    if users.is_empty() {
        "nobody".to_string()
    } else {
        users
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl AuditEvent {
    /// Renders the event as a log-channel notice.
    #[must_use]
    pub fn to_content(&self) -> Content {
        match self {
            Self::GiveawayStarted { id, prize, host } => Content::info("Giveaway started")
                .field("Prize", excerpt(prize))
                .field("Host", host.to_string())
                .field("Id", id.clone()),
            Self::GiveawayEnded { id, prize, winners } => Content::success("Giveaway ended")
                .field("Prize", excerpt(prize))
                .field("Winners", user_list(winners))
                .field("Id", id.clone()),
            Self::GiveawayRerolled { id, winners } => Content::info("Giveaway rerolled")
                .field("Winners", user_list(winners))
                .field("Id", id.clone()),
            Self::TicketOpened { owner, channel } => Content::info("Ticket opened")
                .field("Owner", owner.to_string())
                .field("Channel", channel.to_string()),
            Self::TicketClosed { channel, actor } => Content::info("Ticket closing")
                .field("Channel", channel.to_string())
                .field("Closed by", actor.to_string()),
            Self::TicketPurged { channel } => {
                Content::info("Ticket deleted").field("Channel", channel.to_string())
            }
            Self::ApplicationSubmitted { applicant } => {
                Content::info("Application submitted").field("Applicant", applicant.to_string())
            }
            Self::ApplicationApproved { applicant, actor } => {
                Content::success("Application approved")
                    .field("Applicant", applicant.to_string())
                    .field("Decided by", actor.to_string())
            }
            Self::ApplicationDenied { applicant, actor } => Content::info("Application denied")
                .field("Applicant", applicant.to_string())
                .field("Decided by", actor.to_string()),
            Self::ApplicationReaped { applicant } => Content::warning("Application expired")
                .field("Applicant", applicant.to_string()),
            Self::GameStarted { host, bound } => Content::info("Number game started")
                .field("Host", host.to_string())
                .field("Range", format!("1-{bound}")),
            Self::GameWon {
                winner,
                target,
                guesses,
            } => Content::success("Number game won")
                .field("Winner", winner.to_string())
                .field("Number", target.to_string())
                .field("Guesses", guesses.to_string()),
            Self::GameStopped { actor, target } => Content::info("Number game stopped")
                .field("Stopped by", actor.to_string())
                .field("Number", target.to_string()),
            Self::ReviewSubmitted { user, site, rating } => Content::info("Review submitted")
                .field("Reviewer", user.to_string())
                .field("Site", site.clone())
                .field("Rating", format!("{rating}/5")),
            Self::MemberJoined { user, member_count } => {
                let mut content =
                    Content::success("Member joined").field("Member", user.to_string());
                if let Some(count) = member_count {
                    content = content.field("Member count", count.to_string());
                }
                content
            }
            Self::MemberLeft { user } => {
                Content::info("Member left").field("Member", user.to_string())
            }
            Self::MessageEdited {
                channel,
                author,
                before,
                after,
            } => Content::warning("Message edited")
                .field("Channel", channel.to_string())
                .field("Author", author.to_string())
                .field("Before", excerpt(before))
                .field("After", excerpt(after)),
            Self::MessageDeleted {
                channel,
                author,
                content,
            } => Content::warning("Message deleted")
                .field("Channel", channel.to_string())
                .field("Author", author.to_string())
                .field("Content", excerpt(content)),
            Self::RoleCreated { name } => {
                Content::info("Role created").field("Role", excerpt(name))
            }
            Self::RoleDeleted { name } => {
                Content::warning("Role deleted").field("Role", excerpt(name))
            }
            Self::MemberBanned { user } => {
                Content::error("Member banned").field("Member", user.to_string())
            }
            Self::VoiceStateChanged { user, before, after } => match (before, after) {
                (None, Some(joined)) => Content::success("Voice channel joined")
                    .field("Member", user.to_string())
                    .field("Channel", excerpt(joined)),
                (Some(left), None) => Content::info("Voice channel left")
                    .field("Member", user.to_string())
                    .field("Channel", excerpt(left)),
                (Some(from), Some(to)) => Content::info("Voice channel moved")
                    .field("Member", user.to_string())
                    .field("From", excerpt(from))
                    .field("To", excerpt(to)),
                (None, None) => Content::info("Voice state changed")
                    .field("Member", user.to_string()),
            },
            Self::ChannelCreated { name } => {
                Content::success("Channel created").field("Channel", excerpt(name))
            }
            Self::ChannelDeleted { name } => {
                Content::warning("Channel deleted").field("Channel", excerpt(name))
            }
            Self::MemberUpdated {
                user,
                before_nick,
                after_nick,
                roles_added,
                roles_removed,
            } => {
                let mut content =
                    Content::info("Member updated").field("Member", user.to_string());
                if before_nick != after_nick {
                    let render = |nick: &Option<String>| {
                        nick.as_deref().map_or_else(|| "none".to_string(), excerpt)
                    };
                    content = content
                        .field("Nickname before", render(before_nick))
                        .field("Nickname after", render(after_nick));
                }
                if !roles_added.is_empty() {
                    content = content.field("Roles added", excerpt(&roles_added.join(", ")));
                }
                if !roles_removed.is_empty() {
                    content = content.field("Roles removed", excerpt(&roles_removed.join(", ")));
                }
                content
            }
            Self::UserUpdated {
                user,
                before_name,
                after_name,
            } => Content::info("Username changed")
                .field("User", user.to_string())
                .field("Before", excerpt(before_name))
                .field("After", excerpt(after_name)),
        }
    }
}

/// Records audit events to tracing and the guild's log channel.
#[derive(Clone)]
pub struct AuditLog {
    notifier: Arc<dyn Notifier>,
    channel: ChannelId,
}

impl AuditLog {
    /// Creates an audit log posting to `channel`.
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>, channel: ChannelId) -> Self {
        Self { notifier, channel }
    }

    /// Records an event. Delivery failures are logged and swallowed.
    pub async fn record(&self, event: AuditEvent) {
        info!(event = ?event, "audit");
        let content = event.to_content();
        let destination = Destination::Channel {
            channel: self.channel,
        };
        if let Err(error) = self.notifier.post(destination, content).await {
            warn!(%error, "failed to post audit notice");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::NoticeKind;

    #[test]
    fn ended_event_lists_winners_or_nobody() {
        let event = AuditEvent::GiveawayEnded {
            id: "1_2_3".into(),
            prize: "stickers".into(),
            winners: vec![UserId(5), UserId(6)],
        };
        let content = event.to_content();
        assert_eq!(content.kind, NoticeKind::Success);
        assert!(content.fields.iter().any(|f| f.value == "5, 6"));

        let empty = AuditEvent::GiveawayEnded {
            id: "1_2_3".into(),
            prize: "stickers".into(),
            winners: vec![],
        };
        assert!(empty.to_content().fields.iter().any(|f| f.value == "nobody"));
    }

    #[test]
    fn excerpts_are_bounded() {
        let long = "x".repeat(1000);
        let event = AuditEvent::MessageDeleted {
            channel: ChannelId(1),
            author: UserId(2),
            content: long,
        };
        let content = event.to_content();
        let field = content.fields.iter().find(|f| f.name == "Content").unwrap();
        assert!(field.value.chars().count() <= EXCERPT_LIMIT + 1);
        assert!(field.value.ends_with('…'));
    }

    #[test]
    fn events_serialize_tagged() {
        let event = AuditEvent::TicketPurged {
            channel: ChannelId(9),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "ticket_purged");
        assert_eq!(json["channel"], 9);
    }
}
