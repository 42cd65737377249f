//! Expiry/timeout scheduler.
//!
//! Every deadline in the engine is a spawned task that sleeps and then
//! sends its [`TimerKey`] back into the dispatch loop through an mpsc
//! channel, so timer fires are handled exactly like any other trigger.
//! Timers are cancellable and keyed: scheduling the same key again
//! replaces the pending timer, and reaching a terminal state early
//! cancels it. A fire whose target entity is already gone is a no-op at
//! the workflow layer, so a lost cancellation race is harmless.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::gateway::{ChannelId, UserId};
use crate::workflow::giveaway::GiveawayId;

/// Identifies a scheduled deadline and the entity it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "timer", rename_all = "snake_case")]
pub enum TimerKey {
    /// A giveaway's end deadline.
    GiveawayEnd {
        /// The giveaway to end.
        id: GiveawayId,
    },
    /// Deletion of a closed ticket channel after the grace period.
    TicketPurge {
        /// The ticket channel to delete.
        channel: ChannelId,
    },
    /// Per-question answer deadline for a staff application.
    ApplicationTimeout {
        /// The applicant.
        user: UserId,
        /// The question index the deadline was armed for. The fire is
        /// ignored if the applicant has moved past this question.
        question: usize,
    },
    /// Periodic sweep of stale applications; reschedules itself.
    ApplicationReap,
}

struct PendingTimer {
    generation: u64,
    token: CancellationToken,
}

/// Spawns, tracks, and cancels deadline tasks.
///
/// Cloneable handles are not needed — the engine owns the scheduler and
/// the run loop owns the receiving half of the channel.
pub struct TimerScheduler {
    tx: mpsc::UnboundedSender<TimerKey>,
    pending: Arc<DashMap<TimerKey, PendingTimer>>,
    next_generation: AtomicU64,
}

impl TimerScheduler {
    /// Creates a scheduler and the receiver its fires arrive on.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerKey>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                pending: Arc::new(DashMap::new()),
                next_generation: AtomicU64::new(0),
            },
            rx,
        )
    }

    /// Schedules `key` to fire after `delay`, replacing (and cancelling)
    /// any pending timer for the same key.
    pub fn schedule(&self, key: TimerKey, delay: Duration) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        if let Some(previous) = self.pending.insert(
            key.clone(),
            PendingTimer {
                generation,
                token: token.clone(),
            },
        ) {
            previous.token.cancel();
        }

        let tx = self.tx.clone();
        let pending = Arc::clone(&self.pending);
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {
                    debug!(?key, "timer cancelled");
                }
                () = tokio::time::sleep(delay) => {
                    // Deregister only our own entry; a replacement timer
                    // for the same key has a newer generation.
                    pending.remove_if(&key, |_, p| p.generation == generation);
                    // Send failure means the run loop is gone; nothing to do.
                    let _ = tx.send(key);
                }
            }
        });
    }

    /// Cancels the pending timer for `key`, if any.
    pub fn cancel(&self, key: &TimerKey) {
        if let Some((_, pending)) = self.pending.remove(key) {
            pending.token.cancel();
        }
    }

    /// Cancels every pending timer. Used on shutdown.
    pub fn cancel_all(&self) {
        for entry in self.pending.iter() {
            entry.value().token.cancel();
        }
        self.pending.clear();
    }

    /// Number of timers currently pending.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
