//! NDJSON gateway over stdin/stdout.
//!
//! The bundled binary talks to a platform adapter through newline-
//! delimited JSON: triggers arrive one per line on stdin, outbound
//! actions leave one per line on stdout. Diagnostics stay on stderr.
//!
//! The gateway assigns synthetic message and channel ids from a local
//! counter; the adapter on the other side keeps the mapping to real
//! platform ids.

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::{DeliveryError, GuildhallError};
use crate::workflow::Trigger;

use super::{
    ChannelId, Content, Destination, GuildId, MessageId, MessageRef, Notifier, RoleId,
    TicketChannelRequest, UserId,
};

/// Default maximum inbound line size in bytes (1 MB).
pub const DEFAULT_MAX_LINE_SIZE: usize = 1024 * 1024;

/// Default read/write buffer size in bytes (64 KB).
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Configuration for the stdio gateway.
///
/// Values are read from environment variables with fallback to defaults.
#[derive(Debug, Clone, Copy)]
pub struct StdioConfig {
    /// Maximum inbound line size in bytes.
    pub max_line_size: usize,
    /// Read/write buffer size in bytes.
    pub buffer_size: usize,
}

impl StdioConfig {
    /// Loads configuration from environment variables with defaults.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `GUILDHALL_MAX_LINE_SIZE` | 1 MB |
    /// | `GUILDHALL_STDIO_BUFFER_SIZE` | 64 KB |
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            max_line_size: env_or("GUILDHALL_MAX_LINE_SIZE", DEFAULT_MAX_LINE_SIZE),
            buffer_size: env_or("GUILDHALL_STDIO_BUFFER_SIZE", DEFAULT_BUFFER_SIZE),
        }
    }
}

impl Default for StdioConfig {
    fn default() -> Self {
        Self {
            max_line_size: DEFAULT_MAX_LINE_SIZE,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

/// An outbound action line.
///
/// Everything the engine asks of the platform is one of these, written
/// as a single JSON object per line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OutboundAction {
    /// Deliver a notice.
    Post {
        /// Synthetic id assigned to the delivery.
        message: MessageId,
        /// Where to deliver.
        destination: Destination,
        /// What to deliver.
        content: Content,
    },
    /// Replace a previous delivery's content.
    Edit {
        /// The delivery to replace.
        message: MessageRef,
        /// Replacement content.
        content: Content,
    },
    /// Remove a previous delivery.
    DeleteMessage {
        /// The delivery to remove.
        message: MessageRef,
    },
    /// Create a private ticket channel.
    CreateChannel {
        /// Synthetic id assigned to the channel.
        channel: ChannelId,
        /// Creation parameters.
        request: TicketChannelRequest,
    },
    /// Delete a channel.
    DeleteChannel {
        /// The channel to delete.
        channel: ChannelId,
    },
    /// Grant a role to a guild member.
    GrantRole {
        /// The guild.
        guild: GuildId,
        /// The member.
        user: UserId,
        /// The role.
        role: RoleId,
    },
}

/// NDJSON gateway: trigger source and [`Notifier`] in one.
///
/// Reader and writer sit behind separate `tokio::sync::Mutex` locks so a
/// blocked read never stalls outbound actions. The async mutex is
/// required because the locks are held across `.await` points.
pub struct StdioGateway {
    reader: Mutex<BufReader<tokio::io::Stdin>>,
    writer: Mutex<BufWriter<tokio::io::Stdout>>,
    config: StdioConfig,
    next_id: AtomicU64,
    // Titles posted per channel this process. Backs `history_contains`
    // so a restart within one process run cannot double-post panels;
    // across real restarts the adapter answers from platform history.
    posted_titles: DashMap<ChannelId, Vec<String>>,
}

impl StdioGateway {
    /// Creates a gateway with configuration from environment variables.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(StdioConfig::from_env())
    }

    /// Creates a gateway with explicit configuration.
    #[must_use]
    pub fn with_config(config: StdioConfig) -> Self {
        Self {
            reader: Mutex::new(BufReader::with_capacity(
                config.buffer_size,
                tokio::io::stdin(),
            )),
            writer: Mutex::new(BufWriter::with_capacity(
                config.buffer_size,
                tokio::io::stdout(),
            )),
            config,
            // Synthetic ids start high so they cannot collide with ids
            // the adapter passes through in triggers.
            next_id: AtomicU64::new(1 << 62),
            posted_titles: DashMap::new(),
        }
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Reads the next trigger from stdin.
    ///
    /// Empty, oversized, and malformed lines are logged and skipped.
    /// Returns `Ok(None)` at end of input.
    ///
    /// # Errors
    ///
    /// Returns an error only for I/O failures on stdin.
    pub async fn next_trigger(&self) -> Result<Option<Trigger>, GuildhallError> {
        let mut reader = self.reader.lock().await;
        let limit = self.config.max_line_size;
        let mut line = String::new();

        loop {
            line.clear();
            // read_line appends; a fresh String each round would churn.
            let n = reader.read_line(&mut line).await?;
            if n == 0 {
                return Ok(None);
            }
            if n > limit {
                warn!(bytes = n, limit, "inbound line exceeds size limit, skipping");
                continue;
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<Trigger>(trimmed) {
                Ok(trigger) => return Ok(Some(trigger)),
                Err(error) => {
                    warn!(
                        %error,
                        line = %sanitize_for_log(trimmed, 200),
                        "malformed trigger line, skipping"
                    );
                }
            }
        }
    }

    async fn write_action(&self, action: &OutboundAction) -> Result<(), DeliveryError> {
        let serialized = serde_json::to_string(action)
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        let mut writer = self.writer.lock().await;
        let result = async {
            writer.write_all(serialized.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await
        }
        .await;
        drop(writer);
        result.map_err(|e| DeliveryError::Transport(e.to_string()))
    }
}

impl Default for StdioGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StdioGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdioGateway")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Notifier for StdioGateway {
    async fn post(
        &self,
        destination: Destination,
        content: Content,
    ) -> Result<MessageRef, DeliveryError> {
        let message = MessageId(self.allocate_id());
        let channel = match destination {
            Destination::Channel { channel } | Destination::Ephemeral { channel, .. } => channel,
            // Direct messages get a synthetic conversation channel.
            Destination::Direct { user } => ChannelId(user.0),
        };
        if let Destination::Channel { channel } = destination {
            self.posted_titles
                .entry(channel)
                .or_default()
                .push(content.title.clone());
        }
        self.write_action(&OutboundAction::Post {
            message,
            destination,
            content,
        })
        .await?;
        Ok(MessageRef { channel, message })
    }

    async fn edit(&self, message: MessageRef, content: Content) -> Result<(), DeliveryError> {
        self.write_action(&OutboundAction::Edit { message, content })
            .await
    }

    async fn delete_message(&self, message: MessageRef) -> Result<(), DeliveryError> {
        self.write_action(&OutboundAction::DeleteMessage { message })
            .await
    }

    async fn create_ticket_channel(
        &self,
        request: TicketChannelRequest,
    ) -> Result<ChannelId, DeliveryError> {
        let channel = ChannelId(self.allocate_id());
        self.write_action(&OutboundAction::CreateChannel { channel, request })
            .await?;
        Ok(channel)
    }

    async fn delete_channel(&self, channel: ChannelId) -> Result<(), DeliveryError> {
        self.posted_titles.remove(&channel);
        self.write_action(&OutboundAction::DeleteChannel { channel })
            .await
    }

    async fn grant_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
    ) -> Result<(), DeliveryError> {
        self.write_action(&OutboundAction::GrantRole { guild, user, role })
            .await
    }

    async fn history_contains(
        &self,
        channel: ChannelId,
        marker: &str,
    ) -> Result<bool, DeliveryError> {
        Ok(self
            .posted_titles
            .get(&channel)
            .is_some_and(|titles| titles.iter().any(|t| t.contains(marker))))
    }
}

/// Truncates and strips control characters from untrusted input before logging.
///
/// Replaces control characters (except tab) with the Unicode replacement
/// character to prevent log injection via raw stdin input.
fn sanitize_for_log(input: &str, max_len: usize) -> String {
    input
        .chars()
        .take(max_len)
        .map(|c| {
            if c.is_control() && c != '\t' {
                '\u{FFFD}'
            } else {
                c
            }
        })
        .collect()
}

/// Reads an environment variable, parsing it to type `T`, or returns the default.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(v) => v.parse().unwrap_or_else(|_| {
            warn!(name, value = %v, "invalid env var value, using default");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdio_config_default() {
        let config = StdioConfig::default();
        assert_eq!(config.max_line_size, DEFAULT_MAX_LINE_SIZE);
        assert_eq!(config.buffer_size, DEFAULT_BUFFER_SIZE);
    }

    #[test]
    fn sanitize_strips_control_characters() {
        assert_eq!(sanitize_for_log("ok\ttab", 10), "ok\ttab");
        assert_eq!(sanitize_for_log("bad\x1b[31m", 10), "bad\u{FFFD}[31m");
        assert_eq!(sanitize_for_log("abcdef", 3), "abc");
    }

    #[test]
    fn outbound_actions_serialize_tagged() {
        let action = OutboundAction::GrantRole {
            guild: GuildId(1),
            user: UserId(2),
            role: RoleId(3),
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["action"], "grant_role");
        assert_eq!(json["role"], 3);
    }

    #[test]
    fn gateway_handle_coerces_to_notifier() {
        use std::sync::Arc;

        let gateway = Arc::new(StdioGateway::new());
        let notifier: Arc<dyn crate::gateway::Notifier> = gateway.clone();
        assert_eq!(Arc::strong_count(&gateway), 2);
        drop(notifier);
    }

    #[test]
    fn env_or_falls_back_on_missing() {
        let value: usize = env_or("GUILDHALL_TEST_NONEXISTENT_VAR_12345", 42);
        assert_eq!(value, 42);
    }
}
