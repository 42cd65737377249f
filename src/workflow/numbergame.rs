//! Number-guessing game.
//!
//! At most one round runs per process, held in a [`SingletonSlot`].
//! Guesses are plain integers posted in the configured channel; wrong
//! in-range guesses are counted silently, out-of-range guesses get a
//! range correction without being counted, and the winning guess ends
//! the round inside one critical section — the slot is already idle
//! when the win announcement goes out, so a racing guess or stop
//! command cannot end the round twice.
//!
//! [`SingletonSlot`]: crate::store::SingletonSlot

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::warn;

use crate::error::WorkflowError;
use crate::gateway::{Content, Destination, UserId};
use crate::observability::AuditEvent;
use crate::store::Resolved;

use super::engine::Engine;
use super::trigger::{CommandInvocation, InboundMessage};

/// A running round.
#[derive(Debug, Clone)]
pub struct NumberGame {
    /// Upper bound of the secret number (inclusive, lower bound is 1).
    pub bound: u64,
    /// The secret number.
    pub target: u64,
    /// The admin who started the round.
    pub host: UserId,
    /// Counted guesses, including the eventual winning one.
    pub total_guesses: u64,
    /// When the round started.
    pub started_at: DateTime<Utc>,
}

enum GuessOutcome {
    OutOfRange { bound: u64 },
    Miss,
    Hit,
}

impl Engine {
    /// Starts a round. Admin-only.
    pub(super) async fn game_start(
        &self,
        invocation: &CommandInvocation,
        bound: u64,
        forced_target: Option<u64>,
    ) -> Result<(), WorkflowError> {
        if !self.perms.is_admin(invocation.guild, invocation.invoker).await {
            return Err(WorkflowError::Permission(
                "Only administrators can start the number game.".to_string(),
            ));
        }
        let limits = &self.config.game;
        if bound < limits.min_bound || bound > limits.max_bound {
            return Err(WorkflowError::Validation(format!(
                "The upper bound must be between {} and {}.",
                limits.min_bound, limits.max_bound
            )));
        }
        if let Some(target) = forced_target {
            if target < 1 || target > bound {
                return Err(WorkflowError::Validation(
                    "The forced number must be within the guessing range.".to_string(),
                ));
            }
        }

        let target = forced_target.unwrap_or_else(|| rand::rng().random_range(1..=bound));
        let round = NumberGame {
            bound,
            target,
            host: invocation.invoker,
            total_guesses: 0,
            started_at: Utc::now(),
        };
        if !self.game.try_start(round) {
            return Err(WorkflowError::Validation(
                "A number game is already running.".to_string(),
            ));
        }

        let announcement = Content::success("Number game")
            .body(format!(
                "I picked a number between 1 and {bound}. Post your guesses here!"
            ))
            .field("Started by", format!("<@{}>", invocation.invoker));
        if let Err(error) = self
            .notifier
            .post(
                Destination::Channel {
                    channel: self.config.channels.guess,
                },
                announcement,
            )
            .await
        {
            warn!(%error, "failed to announce number game");
        }

        self.reply(
            invocation.reply_destination(),
            Content::success("Game started").body(format!("Guessing range: 1-{bound}")),
        )
        .await;
        self.audit
            .record(AuditEvent::GameStarted {
                host: invocation.invoker,
                bound,
            })
            .await;
        Ok(())
    }

    /// Handles a message in the guess channel.
    ///
    /// Non-numeric chatter and messages outside a running round are
    /// ignored; wrong in-range guesses are deliberately unanswered.
    pub(super) async fn game_guess(&self, message: &InboundMessage) {
        let Ok(value) = message.text.trim().parse::<i64>() else {
            return;
        };

        let resolution = self.game.resolve(|round| {
            if value < 1 || u64::try_from(value).is_ok_and(|v| v > round.bound) {
                return (GuessOutcome::OutOfRange { bound: round.bound }, false);
            }
            round.total_guesses += 1;
            if u64::try_from(value) == Ok(round.target) {
                (GuessOutcome::Hit, true)
            } else {
                (GuessOutcome::Miss, false)
            }
        });

        match resolution {
            // A kept Hit cannot happen (the closure takes on a hit), but
            // the arms must cover it.
            Resolved::Idle | Resolved::Kept(GuessOutcome::Miss | GuessOutcome::Hit) => {}
            Resolved::Kept(GuessOutcome::OutOfRange { bound }) => {
                self.reply(
                    Destination::Channel {
                        channel: message.channel,
                    },
                    Content::warning("Out of range")
                        .body(format!("The number is between 1 and {bound}.")),
                )
                .await;
            }
            Resolved::Taken(round, _) => {
                self.reply(
                    Destination::Channel {
                        channel: message.channel,
                    },
                    Content::success("We have a winner!").body(format!(
                        "<@{}> guessed the number {} after {} guesses.",
                        message.author, round.target, round.total_guesses
                    )),
                )
                .await;
                self.audit
                    .record(AuditEvent::GameWon {
                        winner: message.author,
                        target: round.target,
                        guesses: round.total_guesses,
                    })
                    .await;
            }
        }
    }

    /// Stops the round and reveals the number. Admin-only.
    pub(super) async fn game_stop(
        &self,
        invocation: &CommandInvocation,
    ) -> Result<(), WorkflowError> {
        if !self.perms.is_admin(invocation.guild, invocation.invoker).await {
            return Err(WorkflowError::Permission(
                "Only administrators can stop the number game.".to_string(),
            ));
        }
        let Some(round) = self.game.take() else {
            return Err(WorkflowError::Validation(
                "No number game is running.".to_string(),
            ));
        };

        if let Err(error) = self
            .notifier
            .post(
                Destination::Channel {
                    channel: self.config.channels.guess,
                },
                Content::info("Number game stopped").body(format!(
                    "The number was {}. {} guesses were made.",
                    round.target, round.total_guesses
                )),
            )
            .await
        {
            warn!(%error, "failed to announce game stop");
        }

        self.audit
            .record(AuditEvent::GameStopped {
                actor: invocation.invoker,
                target: round.target,
            })
            .await;
        Ok(())
    }
}
