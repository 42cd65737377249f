//! Support tickets.
//!
//! One ticket per user, enforced by an explicit ownership registry — the
//! channel topic mentions the owner but is display text only. Closing is
//! a two-step terminal transition: the close press flips an in-progress
//! flag (second presses bounce off it), then a grace timer deletes the
//! channel.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::warn;

use crate::error::WorkflowError;
use crate::gateway::{ChannelId, Content, Destination, GuildId, TicketChannelRequest, UserId};
use crate::observability::AuditEvent;
use crate::sched::TimerKey;

use super::engine::Engine;
use super::trigger::ButtonPress;

/// A live support ticket.
#[derive(Debug, Clone)]
pub struct Ticket {
    /// Guild the ticket belongs to.
    pub guild: GuildId,
    /// The user the ticket was opened for.
    pub owner: UserId,
    /// The private ticket channel.
    pub channel: ChannelId,
    /// When the ticket was opened.
    pub opened_at: DateTime<Utc>,
    /// Whether a close is in progress (grace timer running).
    pub closing: bool,
}

/// Owner-side state while a ticket exists.
#[derive(Debug, Clone, PartialEq, Eq)]
enum OwnerSlot {
    /// Claimed; the channel is still being created.
    Pending,
    /// Open at the given channel.
    Open(ChannelId),
}

/// Why a ticket claim was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimRefusal {
    /// The owner's previous open press is still creating its channel.
    Creating,
    /// The owner already has an open ticket at this channel.
    AlreadyOpen(ChannelId),
}

/// Source of truth for ticket ownership, keyed both ways.
#[derive(Default)]
pub struct TicketRegistry {
    by_owner: DashMap<(GuildId, UserId), OwnerSlot>,
    by_channel: DashMap<ChannelId, Ticket>,
}

impl TicketRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claims the one-ticket-per-user slot.
    ///
    /// # Errors
    ///
    /// Returns the refusal reason when the owner already holds a slot.
    pub fn claim(&self, guild: GuildId, owner: UserId) -> Result<(), ClaimRefusal> {
        match self.by_owner.entry((guild, owner)) {
            Entry::Occupied(slot) => Err(match slot.get() {
                OwnerSlot::Pending => ClaimRefusal::Creating,
                OwnerSlot::Open(channel) => ClaimRefusal::AlreadyOpen(*channel),
            }),
            Entry::Vacant(slot) => {
                slot.insert(OwnerSlot::Pending);
                Ok(())
            }
        }
    }

    /// Finishes a claim by recording the created channel.
    pub fn complete_open(&self, ticket: Ticket) {
        self.by_owner
            .insert((ticket.guild, ticket.owner), OwnerSlot::Open(ticket.channel));
        self.by_channel.insert(ticket.channel, ticket);
    }

    /// Releases a claim whose channel creation failed.
    pub fn release(&self, guild: GuildId, owner: UserId) {
        self.by_owner.remove(&(guild, owner));
    }

    /// Looks up the ticket at a channel.
    #[must_use]
    pub fn at_channel(&self, channel: ChannelId) -> Option<Ticket> {
        self.by_channel.get(&channel).map(|t| t.value().clone())
    }

    /// The owner's open ticket channel, if any.
    #[must_use]
    pub fn open_channel(&self, guild: GuildId, owner: UserId) -> Option<ChannelId> {
        match self.by_owner.get(&(guild, owner)).map(|s| s.value().clone()) {
            Some(OwnerSlot::Open(channel)) => Some(channel),
            _ => None,
        }
    }

    /// Flips the closing flag, returning the ticket exactly once.
    ///
    /// A second close press finds the flag already set and gets `None`.
    pub fn begin_close(&self, channel: ChannelId) -> Option<Ticket> {
        let mut entry = self.by_channel.get_mut(&channel)?;
        if entry.closing {
            return None;
        }
        entry.closing = true;
        Some(entry.clone())
    }

    /// Removes the ticket entirely. Idempotent.
    pub fn purge(&self, channel: ChannelId) -> Option<Ticket> {
        let (_, ticket) = self.by_channel.remove(&channel)?;
        self.by_owner.remove(&(ticket.guild, ticket.owner));
        Some(ticket)
    }

    /// Number of live tickets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_channel.len()
    }

    /// Whether no tickets are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_channel.is_empty()
    }
}

impl Engine {
    /// Opens a ticket for the pressing user.
    pub(super) async fn ticket_open(&self, press: &ButtonPress) -> Result<(), WorkflowError> {
        match self.tickets.claim(press.guild, press.actor) {
            Ok(()) => {}
            Err(ClaimRefusal::Creating) => {
                return Err(WorkflowError::Validation(
                    "Your ticket is already being created.".to_string(),
                ));
            }
            Err(ClaimRefusal::AlreadyOpen(channel)) => {
                return Err(WorkflowError::Validation(format!(
                    "You already have an open ticket: <#{channel}>."
                )));
            }
        }

        let request = TicketChannelRequest {
            guild: press.guild,
            category: self.config.channels.ticket_category,
            owner: press.actor,
            name: format!("ticket-{}", press.actor),
            topic: format!("Support ticket for <@{}>", press.actor),
        };
        let channel = match self.notifier.create_ticket_channel(request).await {
            Ok(channel) => channel,
            Err(error) => {
                self.tickets.release(press.guild, press.actor);
                return Err(WorkflowError::Delivery(error));
            }
        };

        self.tickets.complete_open(Ticket {
            guild: press.guild,
            owner: press.actor,
            channel,
            opened_at: Utc::now(),
            closing: false,
        });

        let welcome = Content::info("Support ticket")
            .body(format!(
                "Hello <@{}>! Describe your issue and staff will be with you shortly.",
                press.actor
            ))
            .button("ticket_close", "Close ticket");
        if let Err(error) = self
            .notifier
            .post(Destination::Channel { channel }, welcome)
            .await
        {
            warn!(%error, %channel, "failed to post ticket welcome");
        }

        self.reply(
            Destination::Ephemeral {
                channel: press.channel,
                user: press.actor,
            },
            Content::success("Ticket opened").body(format!("Your ticket: <#{channel}>")),
        )
        .await;

        self.audit
            .record(AuditEvent::TicketOpened {
                owner: press.actor,
                channel,
            })
            .await;
        Ok(())
    }

    /// Requests a ticket close from inside the ticket channel.
    pub(super) async fn ticket_close(&self, press: &ButtonPress) -> Result<(), WorkflowError> {
        let Some(ticket) = self.tickets.at_channel(press.channel) else {
            return Err(WorkflowError::NotFound(
                "This is not a ticket channel.".to_string(),
            ));
        };
        self.require_host_or_elevated(press.guild, press.actor, ticket.owner)
            .await
            .map_err(|_| {
                WorkflowError::Permission(
                    "Only the ticket owner or staff can close a ticket.".to_string(),
                )
            })?;

        let Some(_closing) = self.tickets.begin_close(press.channel) else {
            return Err(WorkflowError::NotFound(
                "This ticket is already closing.".to_string(),
            ));
        };

        let grace = self.config.tickets.close_grace_secs;
        let notice = Content::warning("Ticket closing")
            .body(format!("This channel will be deleted in {grace} seconds."));
        if let Err(error) = self
            .notifier
            .post(
                Destination::Channel {
                    channel: press.channel,
                },
                notice,
            )
            .await
        {
            warn!(%error, channel = %press.channel, "failed to post closing notice");
        }

        self.timers.schedule(
            TimerKey::TicketPurge {
                channel: press.channel,
            },
            std::time::Duration::from_secs(grace),
        );

        self.audit
            .record(AuditEvent::TicketClosed {
                channel: press.channel,
                actor: press.actor,
            })
            .await;
        Ok(())
    }

    /// Grace-timer fire: deletes the ticket channel.
    pub(super) async fn ticket_purge_fired(&self, channel: ChannelId) {
        if self.tickets.purge(channel).is_none() {
            return;
        }
        if let Err(error) = self.notifier.delete_channel(channel).await {
            warn!(%error, %channel, "failed to delete ticket channel");
        }
        self.audit
            .record(AuditEvent::TicketPurged { channel })
            .await;
    }
}
