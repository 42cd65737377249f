//! Timed giveaways.
//!
//! A giveaway lives in the active store from start until its end, which
//! is triggered by the scheduler or an early end command — whichever
//! takes the entity first performs the draw, so a race resolves to
//! exactly one set of winners. Completed giveaways stay in a second
//! store for listing and rerolls until the process exits.

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::duration::parse_duration;
use crate::error::WorkflowError;
use crate::gateway::{ChannelId, Content, Destination, GuildId, MessageRef, UserId};
use crate::observability::AuditEvent;
use crate::sched::TimerKey;

use super::engine::Engine;
use super::trigger::CommandInvocation;

/// Giveaway identifier: `<guild>_<host>_<unix seconds>`, bumped by one
/// second on collision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GiveawayId(pub String);

impl std::fmt::Display for GiveawayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A running giveaway.
#[derive(Debug, Clone)]
pub struct Giveaway {
    /// Identifier, also embedded in the entry button.
    pub id: GiveawayId,
    /// Guild the giveaway runs in.
    pub guild: GuildId,
    /// Prize description.
    pub prize: String,
    /// The duration string as the host typed it, for display.
    pub duration_label: String,
    /// Parsed duration in seconds.
    pub duration_secs: u64,
    /// When the giveaway ends.
    pub ends_at: DateTime<Utc>,
    /// How many winners to draw.
    pub winner_count: u32,
    /// The starting user.
    pub host: UserId,
    /// Entrants in entry order, duplicate-free.
    pub participants: IndexSet<UserId>,
    /// Channel the giveaway was announced in.
    pub channel: ChannelId,
    /// The announcement message, once posted.
    pub announcement: Option<MessageRef>,
}

/// An ended giveaway, kept for listing and rerolls.
#[derive(Debug, Clone)]
pub struct CompletedGiveaway {
    /// Prize description.
    pub prize: String,
    /// The starting user.
    pub host: UserId,
    /// Final entrant list in entry order.
    pub participants: Vec<UserId>,
    /// Winners requested at start.
    pub winner_count: u32,
    /// Channel the giveaway ran in.
    pub channel: ChannelId,
    /// When the draw happened.
    pub completed_at: DateTime<Utc>,
    /// Most recent winners (initial draw or last reroll).
    pub last_winners: Vec<UserId>,
    /// When the last reroll happened, if any.
    pub last_reroll: Option<DateTime<Utc>>,
}

/// Draws up to `count` distinct winners from `pool`.
///
/// A pool no larger than `count` wins wholesale; otherwise winners are
/// sampled without replacement, preserving entry order.
pub fn draw_with<R: Rng + ?Sized>(rng: &mut R, pool: &[UserId], count: usize) -> Vec<UserId> {
    if pool.len() <= count {
        return pool.to_vec();
    }
    let mut indices: Vec<usize> = rand::seq::index::sample(rng, pool.len(), count).into_vec();
    indices.sort_unstable();
    indices.into_iter().map(|i| pool[i]).collect()
}

fn mention_list(users: &[UserId]) -> String {
    if users.is_empty() {
        "nobody".to_string()
    } else {
        users
            .iter()
            .map(|u| format!("<@{u}>"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn announcement_content(giveaway: &Giveaway) -> Content {
    Content::success("Giveaway")
        .body(giveaway.prize.clone())
        .field("Winners", giveaway.winner_count.to_string())
        .field("Duration", giveaway.duration_label.clone())
        .field("Hosted by", format!("<@{}>", giveaway.host))
        .field("Entries", giveaway.participants.len().to_string())
        .button(format!("giveaway_enter:{}", giveaway.id), "Enter")
}

impl Engine {
    /// Starts a giveaway in the invoking channel.
    pub(super) async fn giveaway_start(
        &self,
        invocation: &CommandInvocation,
        prize: &str,
        duration: &str,
        winners: u32,
    ) -> Result<(), WorkflowError> {
        let limits = &self.config.giveaways;

        let prize = prize.trim();
        if prize.is_empty() {
            return Err(WorkflowError::Validation(
                "The prize description must not be empty.".to_string(),
            ));
        }
        if prize.chars().count() > limits.max_prize_chars {
            return Err(WorkflowError::Validation(format!(
                "The prize description must be at most {} characters.",
                limits.max_prize_chars
            )));
        }
        if winners == 0 || winners > limits.max_winners {
            return Err(WorkflowError::Validation(format!(
                "The number of winners must be between 1 and {}.",
                limits.max_winners
            )));
        }
        let duration_secs = parse_duration(duration)
            .map_err(|e| WorkflowError::Validation(e.to_string()))?;
        if duration_secs < limits.min_duration_secs || duration_secs > limits.max_duration_secs {
            return Err(WorkflowError::Validation(format!(
                "The duration must be between {}s and {}s.",
                limits.min_duration_secs, limits.max_duration_secs
            )));
        }

        // Claim a unique id; collisions bump the timestamp component.
        let mut stamp = Utc::now().timestamp();
        let id = loop {
            let candidate = GiveawayId(format!(
                "{}_{}_{stamp}",
                invocation.guild, invocation.invoker
            ));
            if self.completed.contains(&candidate) {
                stamp += 1;
                continue;
            }
            let giveaway = Giveaway {
                id: candidate.clone(),
                guild: invocation.guild,
                prize: prize.to_string(),
                duration_label: duration.trim().to_ascii_lowercase(),
                duration_secs,
                ends_at: Utc::now()
                    + chrono::Duration::seconds(i64::try_from(duration_secs).unwrap_or(i64::MAX)),
                winner_count: winners,
                host: invocation.invoker,
                participants: IndexSet::new(),
                channel: invocation.channel,
                announcement: None,
            };
            if self.giveaways.insert_if_absent(candidate.clone(), giveaway) {
                break candidate;
            }
            stamp += 1;
        };

        // The announcement is the visible commitment; roll the claim back
        // if it cannot be delivered.
        let content = self
            .giveaways
            .get_cloned(&id)
            .map(|g| announcement_content(&g))
            .ok_or_else(|| WorkflowError::NotFound("Giveaway vanished during start.".to_string()))?;
        let destination = Destination::Channel {
            channel: invocation.channel,
        };
        let announcement = match self.notifier.post(destination, content).await {
            Ok(message) => message,
            Err(error) => {
                self.giveaways.take(&id);
                return Err(WorkflowError::Delivery(error));
            }
        };
        self.giveaways
            .update(&id, |g| g.announcement = Some(announcement));

        self.timers.schedule(
            TimerKey::GiveawayEnd { id: id.clone() },
            std::time::Duration::from_secs(duration_secs),
        );
        self.audit
            .record(AuditEvent::GiveawayStarted {
                id: id.to_string(),
                prize: prize.to_string(),
                host: invocation.invoker,
            })
            .await;

        self.reply(
            invocation.reply_destination(),
            Content::success("Giveaway started").body(format!("Id: `{id}`")),
        )
        .await;
        Ok(())
    }

    /// Records a giveaway entry from the announcement button.
    pub(super) async fn giveaway_enter(
        &self,
        raw_id: &str,
        actor: UserId,
    ) -> Result<(), WorkflowError> {
        let id = GiveawayId(raw_id.to_string());
        let outcome = self.giveaways.update(&id, |g| {
            let inserted = g.participants.insert(actor);
            (inserted, g.clone())
        });
        let Some((inserted, giveaway)) = outcome else {
            return Err(WorkflowError::NotFound(
                "That giveaway has already ended.".to_string(),
            ));
        };
        if !inserted {
            return Err(WorkflowError::Validation(
                "You have already entered this giveaway.".to_string(),
            ));
        }

        // Refresh the entry count on the announcement; cosmetic only.
        if let Some(message) = giveaway.announcement {
            if let Err(error) = self
                .notifier
                .edit(message, announcement_content(&giveaway))
                .await
            {
                warn!(%error, id = %id, "failed to refresh giveaway announcement");
            }
        }

        self.reply(
            Destination::Ephemeral {
                channel: giveaway.channel,
                user: actor,
            },
            Content::success("Entry recorded").body(format!("Good luck winning **{}**!", giveaway.prize)),
        )
        .await;
        Ok(())
    }

    /// Ends the invoking channel's running giveaway ahead of schedule.
    pub(super) async fn giveaway_end_command(
        &self,
        invocation: &CommandInvocation,
    ) -> Result<(), WorkflowError> {
        let candidate = self
            .giveaways
            .snapshot()
            .into_iter()
            .find(|(_, g)| g.channel == invocation.channel);
        let Some((id, giveaway)) = candidate else {
            return Err(WorkflowError::NotFound(
                "There is no running giveaway in this channel.".to_string(),
            ));
        };
        self.require_host_or_elevated(invocation.guild, invocation.invoker, giveaway.host)
            .await?;
        self.finish_giveaway(&id).await;
        Ok(())
    }

    /// Timer-fired end. A missing id means the giveaway ended early.
    pub(super) async fn giveaway_timer_fired(&self, id: &GiveawayId) {
        self.finish_giveaway(id).await;
    }

    /// Terminal transition: draws winners and archives the giveaway.
    ///
    /// `take` makes this idempotent — the loser of a timer/command race
    /// finds the store empty and does nothing.
    async fn finish_giveaway(&self, id: &GiveawayId) {
        let Some(giveaway) = self.giveaways.take(id) else {
            return;
        };
        self.timers.cancel(&TimerKey::GiveawayEnd { id: id.clone() });

        let pool: Vec<UserId> = giveaway.participants.iter().copied().collect();
        let winners = {
            let mut rng = rand::rng();
            draw_with(&mut rng, &pool, giveaway.winner_count as usize)
        };

        // Archive before any await so a reroll can never miss the result.
        self.completed.insert(
            id.clone(),
            CompletedGiveaway {
                prize: giveaway.prize.clone(),
                host: giveaway.host,
                participants: pool,
                winner_count: giveaway.winner_count,
                channel: giveaway.channel,
                completed_at: Utc::now(),
                last_winners: winners.clone(),
                last_reroll: None,
            },
        );

        let result = if winners.is_empty() {
            Content::warning("Giveaway ended")
                .body(format!("Nobody entered the giveaway for **{}**.", giveaway.prize))
        } else {
            Content::success("Giveaway ended").body(format!(
                "Congratulations {} — you won **{}**!",
                mention_list(&winners),
                giveaway.prize
            ))
        };
        if let Err(error) = self
            .notifier
            .post(
                Destination::Channel {
                    channel: giveaway.channel,
                },
                result.field("Id", id.to_string()),
            )
            .await
        {
            warn!(%error, id = %id, "failed to announce giveaway result");
        }

        // Strip the entry button from the original announcement.
        if let Some(message) = giveaway.announcement {
            let closed = Content::info("Giveaway ended")
                .body(giveaway.prize.clone())
                .field("Winners", mention_list(&winners));
            if let Err(error) = self.notifier.edit(message, closed).await {
                warn!(%error, id = %id, "failed to close giveaway announcement");
            }
        }

        self.audit
            .record(AuditEvent::GiveawayEnded {
                id: id.to_string(),
                prize: giveaway.prize,
                winners,
            })
            .await;
    }

    /// Redraws winners for a completed giveaway.
    pub(super) async fn giveaway_reroll(
        &self,
        invocation: &CommandInvocation,
        raw_id: &str,
    ) -> Result<(), WorkflowError> {
        let id = GiveawayId(raw_id.trim().trim_matches('`').to_string());
        let Some(completed) = self.completed.get_cloned(&id) else {
            return Err(WorkflowError::NotFound(format!(
                "No completed giveaway with id `{id}`."
            )));
        };
        self.require_host_or_elevated(invocation.guild, invocation.invoker, completed.host)
            .await?;
        if completed.channel != invocation.channel {
            return Err(WorkflowError::Validation(
                "Rerolls must happen in the channel the giveaway ran in.".to_string(),
            ));
        }
        if completed.participants.is_empty() {
            return Err(WorkflowError::Validation(
                "Nobody entered that giveaway, so there is nothing to reroll.".to_string(),
            ));
        }

        // Prefer entrants who have not just won, unless that would leave
        // too small a pool for the requested winner count.
        let count = completed.winner_count as usize;
        let reduced: Vec<UserId> = completed
            .participants
            .iter()
            .copied()
            .filter(|u| !completed.last_winners.contains(u))
            .collect();
        let pool: &[UserId] = if reduced.len() >= count {
            &reduced
        } else {
            &completed.participants
        };
        let winners = {
            let mut rng = rand::rng();
            draw_with(&mut rng, pool, count)
        };

        self.completed.update(&id, |c| {
            c.last_winners = winners.clone();
            c.last_reroll = Some(Utc::now());
        });

        self.notifier
            .post(
                Destination::Channel {
                    channel: completed.channel,
                },
                Content::success("Giveaway rerolled")
                    .body(format!(
                        "New winners for **{}**: {}",
                        completed.prize,
                        mention_list(&winners)
                    ))
                    .field("Id", id.to_string()),
            )
            .await?;

        self.audit
            .record(AuditEvent::GiveawayRerolled {
                id: id.to_string(),
                winners,
            })
            .await;
        Ok(())
    }

    /// Lists recent completed giveaways for the invoking channel.
    pub(super) async fn giveaway_list(
        &self,
        invocation: &CommandInvocation,
    ) -> Result<(), WorkflowError> {
        let mut rows: Vec<(GiveawayId, CompletedGiveaway)> = self
            .completed
            .snapshot()
            .into_iter()
            .filter(|(_, c)| c.channel == invocation.channel)
            .collect();
        rows.sort_by(|a, b| b.1.completed_at.cmp(&a.1.completed_at));
        rows.truncate(self.config.giveaways.list_limit);

        let mut content = Content::info("Recent giveaways");
        if rows.is_empty() {
            content = content.body("No completed giveaways in this channel yet.");
        }
        for (id, c) in rows {
            content = content.field(
                format!("{} (`{id}`)", c.prize),
                format!(
                    "{} entries, won by {}",
                    c.participants.len(),
                    mention_list(&c.last_winners)
                ),
            );
        }
        self.reply(invocation.reply_destination(), content).await;
        Ok(())
    }
}
