//! Server-event notices.
//!
//! Joins and leaves get a greeting/farewell in the welcome channel;
//! everything lands in the audit log. These handlers never reject — a
//! failed delivery is logged and dropped.

use crate::gateway::{Content, Destination};
use crate::observability::AuditEvent;

use super::engine::Engine;
use super::trigger::ServerEvent;

impl Engine {
    pub(super) async fn server_event(&self, event: ServerEvent) {
        match event {
            ServerEvent::MemberJoined {
                user, member_count, ..
            } => {
                let mut greeting = Content::success("Welcome!")
                    .body(format!("<@{user}> just joined the server."));
                if let Some(count) = member_count {
                    greeting = greeting.field("Members", count.to_string());
                }
                self.reply(
                    Destination::Channel {
                        channel: self.config.channels.welcome,
                    },
                    greeting,
                )
                .await;
                self.audit
                    .record(AuditEvent::MemberJoined { user, member_count })
                    .await;
            }
            ServerEvent::MemberLeft { user, .. } => {
                self.reply(
                    Destination::Channel {
                        channel: self.config.channels.welcome,
                    },
                    Content::info("Goodbye").body(format!("<@{user}> has left the server.")),
                )
                .await;
                self.audit.record(AuditEvent::MemberLeft { user }).await;
            }
            ServerEvent::MessageEdited {
                channel,
                author,
                before,
                after,
                ..
            } => {
                self.audit
                    .record(AuditEvent::MessageEdited {
                        channel,
                        author,
                        before,
                        after,
                    })
                    .await;
            }
            ServerEvent::MessageDeleted {
                channel,
                author,
                content,
                ..
            } => {
                self.audit
                    .record(AuditEvent::MessageDeleted {
                        channel,
                        author,
                        content,
                    })
                    .await;
            }
            ServerEvent::RoleCreated { name, .. } => {
                self.audit.record(AuditEvent::RoleCreated { name }).await;
            }
            ServerEvent::RoleDeleted { name, .. } => {
                self.audit.record(AuditEvent::RoleDeleted { name }).await;
            }
            ServerEvent::MemberBanned { user, .. } => {
                self.audit.record(AuditEvent::MemberBanned { user }).await;
            }
            ServerEvent::VoiceStateChanged {
                user,
                before,
                after,
                ..
            } => {
                if before == after {
                    return;
                }
                self.audit
                    .record(AuditEvent::VoiceStateChanged { user, before, after })
                    .await;
            }
            ServerEvent::ChannelCreated { name, .. } => {
                self.audit.record(AuditEvent::ChannelCreated { name }).await;
            }
            ServerEvent::ChannelDeleted { name, .. } => {
                self.audit.record(AuditEvent::ChannelDeleted { name }).await;
            }
            ServerEvent::MemberUpdated {
                user,
                before_nick,
                after_nick,
                roles_added,
                roles_removed,
                ..
            } => {
                // The platform also fires this for changes we do not render.
                if before_nick == after_nick && roles_added.is_empty() && roles_removed.is_empty()
                {
                    return;
                }
                self.audit
                    .record(AuditEvent::MemberUpdated {
                        user,
                        before_nick,
                        after_nick,
                        roles_added,
                        roles_removed,
                    })
                    .await;
            }
            ServerEvent::UserUpdated {
                user,
                before_name,
                after_name,
            } => {
                if before_name == after_name {
                    return;
                }
                self.audit
                    .record(AuditEvent::UserUpdated {
                        user,
                        before_name,
                        after_name,
                    })
                    .await;
            }
        }
    }
}
