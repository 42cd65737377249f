//! Shared test harness: a recording notifier, static permissions, and
//! an engine builder with a small fixed configuration.

#![allow(dead_code)] // each integration test binary uses a subset

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;

use guildhall::config::{
    ApplicationConfig, BotConfig, ChannelConfig, GameConfig, GiveawayConfig, PermissionsConfig,
    ReviewConfig, TicketConfig,
};
use guildhall::error::DeliveryError;
use guildhall::gateway::{
    ChannelId, Content, Destination, GuildId, MessageId, MessageRef, Notifier, RoleId,
    StaticPermissions, TicketChannelRequest, UserId,
};
use guildhall::sched::TimerKey;
use guildhall::workflow::{
    ButtonPress, Command, CommandInvocation, Engine, InboundMessage, Trigger,
};
use tokio::sync::mpsc;

pub const GUILD: GuildId = GuildId(100);
pub const WELCOME: ChannelId = ChannelId(1);
pub const LOG: ChannelId = ChannelId(2);
pub const REVIEW: ChannelId = ChannelId(3);
pub const TICKET_PANEL: ChannelId = ChannelId(4);
pub const TICKET_CATEGORY: ChannelId = ChannelId(5);
pub const STAFF_APPLY: ChannelId = ChannelId(6);
pub const STAFF_RESULTS: ChannelId = ChannelId(7);
pub const GUESS: ChannelId = ChannelId(8);

pub const ADMIN: UserId = UserId(900);
pub const STAFF: UserId = UserId(901);
pub const STAFF_ROLE: RoleId = RoleId(77);

/// A notifier that records every outbound action in memory.
#[derive(Default)]
pub struct RecordingNotifier {
    next_id: AtomicU64,
    fail_direct: AtomicBool,
    pub posts: Mutex<Vec<(Destination, Content, MessageRef)>>,
    pub edits: Mutex<Vec<(MessageRef, Content)>>,
    pub deleted_messages: Mutex<Vec<MessageRef>>,
    pub created_channels: Mutex<Vec<(ChannelId, TicketChannelRequest)>>,
    pub deleted_channels: Mutex<Vec<ChannelId>>,
    pub granted_roles: Mutex<Vec<(GuildId, UserId, RoleId)>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(1000),
            ..Self::default()
        })
    }

    /// Makes every direct-message post fail, simulating closed DMs.
    pub fn close_direct_messages(&self) {
        self.fail_direct.store(true, Ordering::SeqCst);
    }

    pub fn open_direct_messages(&self) {
        self.fail_direct.store(false, Ordering::SeqCst);
    }

    fn allocate(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// All contents posted to a guild channel.
    pub fn channel_posts(&self, channel: ChannelId) -> Vec<Content> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .filter(|(d, _, _)| matches!(d, Destination::Channel { channel: c } if *c == channel))
            .map(|(_, c, _)| c.clone())
            .collect()
    }

    /// All contents sent privately to a user.
    pub fn direct_posts(&self, user: UserId) -> Vec<Content> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .filter(|(d, _, _)| matches!(d, Destination::Direct { user: u } if *u == user))
            .map(|(_, c, _)| c.clone())
            .collect()
    }

    /// All invoker-only replies delivered to a user.
    pub fn ephemeral_posts(&self, user: UserId) -> Vec<Content> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .filter(|(d, _, _)| matches!(d, Destination::Ephemeral { user: u, .. } if *u == user))
            .map(|(_, c, _)| c.clone())
            .collect()
    }

    /// Number of channel posts whose title contains `needle`.
    pub fn count_titled(&self, channel: ChannelId, needle: &str) -> usize {
        self.channel_posts(channel)
            .iter()
            .filter(|c| c.title.contains(needle))
            .count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn post(
        &self,
        destination: Destination,
        content: Content,
    ) -> Result<MessageRef, DeliveryError> {
        if matches!(destination, Destination::Direct { .. })
            && self.fail_direct.load(Ordering::SeqCst)
        {
            return Err(DeliveryError::Forbidden("closed direct messages".into()));
        }
        let channel = match destination {
            Destination::Channel { channel } | Destination::Ephemeral { channel, .. } => channel,
            Destination::Direct { user } => ChannelId(user.0),
        };
        let message = MessageRef {
            channel,
            message: MessageId(self.allocate()),
        };
        self.posts.lock().unwrap().push((destination, content, message));
        Ok(message)
    }

    async fn edit(&self, message: MessageRef, content: Content) -> Result<(), DeliveryError> {
        self.edits.lock().unwrap().push((message, content));
        Ok(())
    }

    async fn delete_message(&self, message: MessageRef) -> Result<(), DeliveryError> {
        self.deleted_messages.lock().unwrap().push(message);
        Ok(())
    }

    async fn create_ticket_channel(
        &self,
        request: TicketChannelRequest,
    ) -> Result<ChannelId, DeliveryError> {
        let channel = ChannelId(self.allocate());
        self.created_channels.lock().unwrap().push((channel, request));
        Ok(channel)
    }

    async fn delete_channel(&self, channel: ChannelId) -> Result<(), DeliveryError> {
        self.deleted_channels.lock().unwrap().push(channel);
        Ok(())
    }

    async fn grant_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
    ) -> Result<(), DeliveryError> {
        self.granted_roles.lock().unwrap().push((guild, user, role));
        Ok(())
    }

    async fn history_contains(
        &self,
        channel: ChannelId,
        marker: &str,
    ) -> Result<bool, DeliveryError> {
        Ok(self
            .channel_posts(channel)
            .iter()
            .any(|c| c.title.contains(marker)))
    }
}

pub fn test_config() -> Arc<BotConfig> {
    Arc::new(BotConfig {
        guild: GUILD,
        channels: ChannelConfig {
            welcome: WELCOME,
            log: LOG,
            review: REVIEW,
            ticket_panel: TICKET_PANEL,
            ticket_category: TICKET_CATEGORY,
            staff_apply: STAFF_APPLY,
            staff_results: STAFF_RESULTS,
            guess: GUESS,
        },
        permissions: PermissionsConfig {
            admins: vec![ADMIN],
            staff: vec![STAFF],
        },
        giveaways: GiveawayConfig::default(),
        tickets: TicketConfig::default(),
        applications: ApplicationConfig {
            staff_role: STAFF_ROLE,
            questions: vec![
                "Why do you want to join?".to_string(),
                "How active are you?".to_string(),
            ],
            answer_timeout_secs: 600,
            max_age_secs: 3600,
            reap_interval_secs: 1800,
        },
        game: GameConfig::default(),
        reviews: ReviewConfig {
            sites: vec!["Trustpilot".to_string()],
        },
    })
}

pub fn engine_with(
    notifier: Arc<RecordingNotifier>,
) -> (Engine, mpsc::UnboundedReceiver<TimerKey>) {
    let perms = Arc::new(StaticPermissions {
        admins: vec![ADMIN],
        staff: vec![STAFF],
    });
    Engine::new(test_config(), notifier, perms)
}

// ----------------------------------------------------------------------
// Trigger builders
// ----------------------------------------------------------------------

pub fn command(invoker: UserId, channel: ChannelId, command: Command) -> Trigger {
    Trigger::Command(CommandInvocation {
        guild: GUILD,
        channel,
        invoker,
        command,
    })
}

pub fn press(actor: UserId, channel: ChannelId, message: u64, custom_id: &str) -> Trigger {
    Trigger::Button(ButtonPress {
        guild: GUILD,
        channel,
        message: MessageId(message),
        actor,
        custom_id: custom_id.to_string(),
    })
}

pub fn private_message(author: UserId, text: &str) -> Trigger {
    Trigger::Message(InboundMessage {
        guild: None,
        channel: ChannelId(author.0),
        author,
        text: text.to_string(),
        private: true,
        from_bot: false,
    })
}

pub fn guess_message(author: UserId, text: &str) -> Trigger {
    Trigger::Message(InboundMessage {
        guild: Some(GUILD),
        channel: GUESS,
        author,
        text: text.to_string(),
        private: false,
        from_bot: false,
    })
}
