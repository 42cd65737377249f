//! External collaborator seams.
//!
//! The engine never talks to the chat platform directly. Outbound
//! notifications go through the [`Notifier`] trait with structured
//! [`Content`] (rendering is the collaborator's problem), and permission
//! questions go through the [`PermissionOracle`]. The bundled binary uses
//! the NDJSON [`stdio::StdioGateway`] for both directions.

pub mod ids;
pub mod stdio;

pub use ids::{ChannelId, GuildId, MessageId, MessageRef, RoleId, UserId};

use serde::{Deserialize, Serialize};

use crate::error::DeliveryError;

// ============================================================================
// Structured content
// ============================================================================

/// Severity/flavor of a notice. Renderers map this to color or styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// Neutral information.
    Info,
    /// Positive outcome.
    Success,
    /// Rejected input or benign problem.
    Warning,
    /// Failure.
    Error,
}

/// A labeled name/value pair inside a notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field label.
    pub name: String,
    /// Field value.
    pub value: String,
}

/// An interactive button attached to a notice.
///
/// A press comes back as a button trigger carrying `custom_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    /// Opaque id, round-tripped by the platform.
    pub custom_id: String,
    /// Visible label.
    pub label: String,
}

/// A structured message handed to the notifier.
///
/// The engine only fills in content; how a title or field is rendered
/// (embed, markdown, plain text) is decided by the notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    /// Notice flavor.
    pub kind: NoticeKind,
    /// Short heading.
    pub title: String,
    /// Main text. May be empty for field-only notices.
    #[serde(default)]
    pub body: String,
    /// Ordered labeled fields.
    #[serde(default)]
    pub fields: Vec<Field>,
    /// Buttons attached below the notice.
    #[serde(default)]
    pub buttons: Vec<Button>,
}

impl Content {
    /// Creates a notice with the given kind and title.
    #[must_use]
    pub fn new(kind: NoticeKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            body: String::new(),
            fields: Vec::new(),
            buttons: Vec::new(),
        }
    }

    /// Creates an informational notice.
    #[must_use]
    pub fn info(title: impl Into<String>) -> Self {
        Self::new(NoticeKind::Info, title)
    }

    /// Creates a success notice.
    #[must_use]
    pub fn success(title: impl Into<String>) -> Self {
        Self::new(NoticeKind::Success, title)
    }

    /// Creates a warning notice.
    #[must_use]
    pub fn warning(title: impl Into<String>) -> Self {
        Self::new(NoticeKind::Warning, title)
    }

    /// Creates an error notice.
    #[must_use]
    pub fn error(title: impl Into<String>) -> Self {
        Self::new(NoticeKind::Error, title)
    }

    /// Sets the body text.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Appends a labeled field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(Field {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Attaches a button.
    #[must_use]
    pub fn button(mut self, custom_id: impl Into<String>, label: impl Into<String>) -> Self {
        self.buttons.push(Button {
            custom_id: custom_id.into(),
            label: label.into(),
        });
        self
    }
}

/// Where a notice is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Destination {
    /// A guild channel, visible to everyone who can read it.
    Channel {
        /// Target channel.
        channel: ChannelId,
    },
    /// A private message to one user.
    Direct {
        /// Target user.
        user: UserId,
    },
    /// An invoker-only reply in a channel (visible only to `user`).
    Ephemeral {
        /// Channel the interaction came from.
        channel: ChannelId,
        /// The invoking user.
        user: UserId,
    },
}

/// Parameters for creating a private support-ticket channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketChannelRequest {
    /// Guild to create the channel in.
    pub guild: GuildId,
    /// Category the channel is filed under.
    pub category: ChannelId,
    /// The requesting user, granted read/write; the default role is denied.
    pub owner: UserId,
    /// Channel name, e.g. `ticket-1234`.
    pub name: String,
    /// Display topic. Derived text only — the ticket registry is the
    /// source of truth for ownership.
    pub topic: String,
}

// ============================================================================
// Traits
// ============================================================================

/// Outbound side of the chat platform.
///
/// Every method is fallible with [`DeliveryError`]; the engine decides per
/// call site whether a failure aborts the workflow step or is logged and
/// tolerated.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers structured content, returning a handle for later edits.
    async fn post(
        &self,
        destination: Destination,
        content: Content,
    ) -> Result<MessageRef, DeliveryError>;

    /// Replaces the content of a previous delivery.
    async fn edit(&self, message: MessageRef, content: Content) -> Result<(), DeliveryError>;

    /// Removes a previous delivery.
    async fn delete_message(&self, message: MessageRef) -> Result<(), DeliveryError>;

    /// Creates a private ticket channel and returns its id.
    async fn create_ticket_channel(
        &self,
        request: TicketChannelRequest,
    ) -> Result<ChannelId, DeliveryError>;

    /// Deletes a channel.
    async fn delete_channel(&self, channel: ChannelId) -> Result<(), DeliveryError>;

    /// Grants a role to a guild member.
    async fn grant_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
    ) -> Result<(), DeliveryError>;

    /// Reports whether recent history of `channel` contains a message
    /// carrying `marker`. Used to avoid re-posting interaction panels on
    /// startup; stores are volatile, so this scan is the only memory of
    /// a previously posted panel.
    async fn history_contains(
        &self,
        channel: ChannelId,
        marker: &str,
    ) -> Result<bool, DeliveryError>;
}

/// Permission questions, answered by the host platform.
///
/// The engine never implements role logic itself.
#[async_trait::async_trait]
pub trait PermissionOracle: Send + Sync {
    /// Whether `user` holds staff-level (moderation) permission in `guild`.
    async fn has_elevated_permission(&self, guild: GuildId, user: UserId) -> bool;

    /// Whether `user` is an administrator of `guild`.
    async fn is_admin(&self, guild: GuildId, user: UserId) -> bool;
}

/// Config-backed oracle for deployments without a live permission API,
/// such as the stdio gateway.
#[derive(Debug, Clone, Default)]
pub struct StaticPermissions {
    /// Administrator user ids.
    pub admins: Vec<UserId>,
    /// Staff user ids (elevated, but not admin).
    pub staff: Vec<UserId>,
}

#[async_trait::async_trait]
impl PermissionOracle for StaticPermissions {
    async fn has_elevated_permission(&self, _guild: GuildId, user: UserId) -> bool {
        self.admins.contains(&user) || self.staff.contains(&user)
    }

    async fn is_admin(&self, _guild: GuildId, user: UserId) -> bool {
        self.admins.contains(&user)
    }
}
