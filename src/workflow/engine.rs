//! The dispatch engine.
//!
//! One [`Engine`] owns every store and the timer scheduler. All triggers
//! funnel through [`Engine::dispatch`], which routes to the workflow
//! handlers and turns their rejections into private replies — a bad
//! trigger never crashes the loop. The engine is `Send + Sync` and can
//! be shared behind an `Arc`, but the bundled run loop dispatches
//! sequentially; the stores make concurrent dispatch safe regardless.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::BotConfig;
use crate::error::WorkflowError;
use crate::gateway::{
    ChannelId, Content, Destination, GuildId, MessageId, Notifier, PermissionOracle, UserId,
};
use crate::observability::AuditLog;
use crate::sched::{TimerKey, TimerScheduler};
use crate::store::{EntityStore, SingletonSlot};

use super::application::{Application, PendingDecision};
use super::giveaway::{CompletedGiveaway, Giveaway, GiveawayId};
use super::numbergame::NumberGame;
use super::ticket::TicketRegistry;
use super::trigger::{ButtonAction, Command, Trigger};

/// The workflow engine: stores, timers, and the dispatch entry point.
pub struct Engine {
    pub(super) config: Arc<BotConfig>,
    pub(super) notifier: Arc<dyn Notifier>,
    pub(super) perms: Arc<dyn PermissionOracle>,
    pub(super) timers: TimerScheduler,
    pub(super) audit: AuditLog,
    pub(super) giveaways: EntityStore<GiveawayId, Giveaway>,
    pub(super) completed: EntityStore<GiveawayId, CompletedGiveaway>,
    pub(super) tickets: TicketRegistry,
    pub(super) applications: EntityStore<UserId, Application>,
    pub(super) decisions: EntityStore<MessageId, PendingDecision>,
    pub(super) game: SingletonSlot<NumberGame>,
}

impl Engine {
    /// Creates an engine and the receiver for its timer fires.
    ///
    /// The caller owns the receiver and must feed each fire back in as
    /// [`Trigger::Timer`]; the bundled run loop does exactly that.
    #[must_use]
    pub fn new(
        config: Arc<BotConfig>,
        notifier: Arc<dyn Notifier>,
        perms: Arc<dyn PermissionOracle>,
    ) -> (Self, mpsc::UnboundedReceiver<TimerKey>) {
        let (timers, timer_rx) = TimerScheduler::new();
        let audit = AuditLog::new(Arc::clone(&notifier), config.channels.log);
        let engine = Self {
            config,
            notifier,
            perms,
            timers,
            audit,
            giveaways: EntityStore::new(),
            completed: EntityStore::new(),
            tickets: TicketRegistry::new(),
            applications: EntityStore::new(),
            decisions: EntityStore::new(),
            game: SingletonSlot::new(),
        };
        (engine, timer_rx)
    }

    /// Handles one trigger end to end. Never returns an error and never
    /// panics on bad input; rejections become private replies.
    pub async fn dispatch(&self, trigger: Trigger) {
        metrics::counter!("guildhall_triggers_total", "kind" => trigger_kind(&trigger))
            .increment(1);

        let reply_to = trigger.reply_destination();
        let outcome = self.dispatch_inner(&trigger).await;
        let Err(error) = outcome else {
            return;
        };
        metrics::counter!("guildhall_rejections_total").increment(1);

        let notice = match &error {
            WorkflowError::Validation(message) => Content::warning("Can't do that").body(message),
            WorkflowError::Permission(message) => {
                Content::error("Permission denied").body(message)
            }
            WorkflowError::NotFound(message) => Content::info("Nothing to do").body(message),
            WorkflowError::Delivery(delivery) => {
                warn!(error = %delivery, "delivery failure during dispatch");
                Content::error("Something went wrong")
                    .body("I could not complete that. Please try again.")
            }
        };
        debug!(%error, "trigger rejected");
        if let Some(destination) = reply_to {
            self.reply(destination, notice).await;
        }
    }

    async fn dispatch_inner(&self, trigger: &Trigger) -> Result<(), WorkflowError> {
        match trigger {
            Trigger::Button(press) => match ButtonAction::parse(&press.custom_id) {
                // Unknown button ids belong to somebody else's message.
                None => Ok(()),
                Some(ButtonAction::TicketOpen) => self.ticket_open(press).await,
                Some(ButtonAction::TicketClose) => self.ticket_close(press).await,
                Some(ButtonAction::GiveawayEnter(id)) => {
                    self.giveaway_enter(&id, press.actor).await
                }
                Some(ButtonAction::ApplicationStart) => self.application_start(press).await,
                Some(ButtonAction::ApplicationApprove(_)) => {
                    self.application_decide(press, true).await
                }
                Some(ButtonAction::ApplicationDeny(_)) => {
                    self.application_decide(press, false).await
                }
            },
            Trigger::Message(message) => {
                if message.from_bot {
                    return Ok(());
                }
                if message.private {
                    return self.application_message(message).await;
                }
                if message.channel == self.config.channels.guess {
                    self.game_guess(message).await;
                }
                Ok(())
            }
            Trigger::Command(invocation) => match &invocation.command {
                Command::GiveawayStart {
                    prize,
                    duration,
                    winners,
                } => {
                    self.giveaway_start(invocation, prize, duration, *winners)
                        .await
                }
                Command::GiveawayEnd => self.giveaway_end_command(invocation).await,
                Command::GiveawayReroll { id } => self.giveaway_reroll(invocation, id).await,
                Command::GiveawayList => self.giveaway_list(invocation).await,
                Command::GameStart { bound, target } => {
                    self.game_start(invocation, *bound, *target).await
                }
                Command::GameStop => self.game_stop(invocation).await,
                Command::Review {
                    site,
                    rating,
                    feedback,
                } => {
                    self.review_submit(invocation, site, *rating, feedback)
                        .await
                }
            },
            Trigger::Timer(key) => {
                match key {
                    TimerKey::GiveawayEnd { id } => self.giveaway_timer_fired(id).await,
                    TimerKey::TicketPurge { channel } => self.ticket_purge_fired(*channel).await,
                    TimerKey::ApplicationTimeout { user, question } => {
                        self.application_timeout_fired(*user, *question).await;
                    }
                    TimerKey::ApplicationReap => self.application_reap_fired().await,
                }
                Ok(())
            }
            Trigger::Server(event) => {
                self.server_event(event.clone()).await;
                Ok(())
            }
            Trigger::Startup { .. } => {
                self.startup().await;
                Ok(())
            }
        }
    }

    /// Best-effort delivery for confirmations and rejections.
    pub(super) async fn reply(&self, destination: Destination, content: Content) {
        if let Err(error) = self.notifier.post(destination, content).await {
            warn!(%error, "failed to deliver reply");
        }
    }

    /// Host-or-staff check shared by giveaway and ticket commands.
    pub(super) async fn require_host_or_elevated(
        &self,
        guild: GuildId,
        actor: UserId,
        owner: UserId,
    ) -> Result<(), WorkflowError> {
        if actor == owner || self.perms.has_elevated_permission(guild, actor).await {
            Ok(())
        } else {
            Err(WorkflowError::Permission(
                "Only the host or staff can do that.".to_string(),
            ))
        }
    }

    /// Cancels all pending timers. Called when the run loop exits.
    pub fn shutdown(&self) {
        self.timers.cancel_all();
    }

    // ------------------------------------------------------------------
    // Read-only inspection, used by tests and diagnostics.
    // ------------------------------------------------------------------

    /// Ids of running giveaways.
    #[must_use]
    pub fn active_giveaways(&self) -> Vec<GiveawayId> {
        self.giveaways.snapshot().into_iter().map(|(id, _)| id).collect()
    }

    /// A running giveaway by id.
    #[must_use]
    pub fn giveaway(&self, id: &GiveawayId) -> Option<Giveaway> {
        self.giveaways.get_cloned(id)
    }

    /// A completed giveaway by id.
    #[must_use]
    pub fn completed_giveaway(&self, id: &GiveawayId) -> Option<CompletedGiveaway> {
        self.completed.get_cloned(id)
    }

    /// The user's open ticket channel, if any.
    #[must_use]
    pub fn open_ticket(&self, guild: GuildId, user: UserId) -> Option<ChannelId> {
        self.tickets.open_channel(guild, user)
    }

    /// The ticket at a channel, if any.
    #[must_use]
    pub fn ticket_at(&self, channel: ChannelId) -> Option<super::ticket::Ticket> {
        self.tickets.at_channel(channel)
    }

    /// The user's in-progress application, if any.
    #[must_use]
    pub fn application(&self, user: UserId) -> Option<Application> {
        self.applications.get_cloned(&user)
    }

    /// Number of transcripts awaiting a decision.
    #[must_use]
    pub fn pending_decisions(&self) -> usize {
        self.decisions.len()
    }

    /// Whether a number game is running.
    #[must_use]
    pub fn game_running(&self) -> bool {
        self.game.is_active()
    }

    /// Number of pending timers.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.pending_count()
    }
}

fn trigger_kind(trigger: &Trigger) -> &'static str {
    match trigger {
        Trigger::Button(_) => "button",
        Trigger::Message(_) => "message",
        Trigger::Command(_) => "command",
        Trigger::Timer(_) => "timer",
        Trigger::Server(_) => "server",
        Trigger::Startup { .. } => "startup",
    }
}
