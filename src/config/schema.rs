//! Configuration schema.
//!
//! One YAML document describes a deployment: the guild being served, the
//! fixed channels each workflow posts to, and per-workflow tuning knobs.
//! Every knob has a default matching the documented behavior, so a
//! minimal file only names the guild, the channels, and the application
//! questions.

use serde::{Deserialize, Serialize};

use crate::gateway::{ChannelId, GuildId, RoleId, UserId};

/// Root configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// The guild this deployment serves.
    pub guild: GuildId,

    /// Fixed channels the workflows post to.
    pub channels: ChannelConfig,

    /// Static permission lists for gateways without a live permission API.
    #[serde(default)]
    pub permissions: PermissionsConfig,

    /// Giveaway limits.
    #[serde(default)]
    pub giveaways: GiveawayConfig,

    /// Support-ticket behavior.
    #[serde(default)]
    pub tickets: TicketConfig,

    /// Staff-application workflow.
    pub applications: ApplicationConfig,

    /// Number-guessing game bounds.
    #[serde(default)]
    pub game: GameConfig,

    /// Review command.
    #[serde(default)]
    pub reviews: ReviewConfig,
}

/// Channels each workflow is wired to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelConfig {
    /// Member join/leave notices.
    pub welcome: ChannelId,

    /// Audit log destination (edits, deletions, workflow outcomes).
    pub log: ChannelId,

    /// Submitted reviews.
    pub review: ChannelId,

    /// Channel holding the ticket-open panel.
    pub ticket_panel: ChannelId,

    /// Category ticket channels are created under.
    pub ticket_category: ChannelId,

    /// Channel holding the staff-application panel.
    pub staff_apply: ChannelId,

    /// Completed application transcripts for staff review.
    pub staff_results: ChannelId,

    /// Channel the number game reads guesses from.
    pub guess: ChannelId,
}

/// Static admin/staff lists, consumed by
/// [`StaticPermissions`](crate::gateway::StaticPermissions).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PermissionsConfig {
    /// Administrator user ids.
    #[serde(default)]
    pub admins: Vec<UserId>,

    /// Staff user ids (elevated, not admin).
    #[serde(default)]
    pub staff: Vec<UserId>,
}

/// Giveaway validation limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GiveawayConfig {
    /// Shortest accepted duration in seconds.
    #[serde(default = "default_min_duration_secs")]
    pub min_duration_secs: u64,

    /// Longest accepted duration in seconds.
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: u64,

    /// Most winners a single giveaway may draw.
    #[serde(default = "default_max_winners")]
    pub max_winners: u32,

    /// Longest accepted prize description, in characters.
    #[serde(default = "default_max_prize_chars")]
    pub max_prize_chars: usize,

    /// How many completed giveaways the list command shows.
    #[serde(default = "default_list_limit")]
    pub list_limit: usize,
}

impl Default for GiveawayConfig {
    fn default() -> Self {
        Self {
            min_duration_secs: default_min_duration_secs(),
            max_duration_secs: default_max_duration_secs(),
            max_winners: default_max_winners(),
            max_prize_chars: default_max_prize_chars(),
            list_limit: default_list_limit(),
        }
    }
}

/// Support-ticket behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TicketConfig {
    /// Seconds between a close request and channel deletion.
    #[serde(default = "default_close_grace_secs")]
    pub close_grace_secs: u64,
}

impl Default for TicketConfig {
    fn default() -> Self {
        Self {
            close_grace_secs: default_close_grace_secs(),
        }
    }
}

/// Staff-application workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplicationConfig {
    /// Role granted to approved applicants.
    pub staff_role: RoleId,

    /// Questions asked, in order, one at a time over private messages.
    pub questions: Vec<String>,

    /// Seconds an applicant has to answer each question.
    #[serde(default = "default_answer_timeout_secs")]
    pub answer_timeout_secs: u64,

    /// Age in seconds past which an unfinished application is reaped.
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,

    /// Seconds between reaper sweeps.
    #[serde(default = "default_reap_interval_secs")]
    pub reap_interval_secs: u64,
}

/// Number-guessing game bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GameConfig {
    /// Smallest accepted upper bound.
    #[serde(default = "default_min_bound")]
    pub min_bound: u64,

    /// Largest accepted upper bound.
    #[serde(default = "default_max_bound")]
    pub max_bound: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_bound: default_min_bound(),
            max_bound: default_max_bound(),
        }
    }
}

/// Review command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReviewConfig {
    /// Accepted review sites, matched case-insensitively. Empty disables
    /// the command.
    #[serde(default)]
    pub sites: Vec<String>,
}

fn default_min_duration_secs() -> u64 {
    10
}

fn default_max_duration_secs() -> u64 {
    604_800 // 7 days
}

fn default_max_winners() -> u32 {
    20
}

fn default_max_prize_chars() -> usize {
    100
}

fn default_list_limit() -> usize {
    10
}

fn default_close_grace_secs() -> u64 {
    10
}

fn default_answer_timeout_secs() -> u64 {
    600
}

fn default_max_age_secs() -> u64 {
    3600
}

fn default_reap_interval_secs() -> u64 {
    1800
}

fn default_min_bound() -> u64 {
    2
}

fn default_max_bound() -> u64 {
    10_000
}
