//! Startup panel setup.
//!
//! Stores are volatile, so after a restart the only memory of a
//! previously posted interaction panel is the channel history. Startup
//! scans each panel channel for the panel's marker title and posts the
//! panel only when it is absent, then seeds the periodic application
//! reaper.

use tracing::warn;

use crate::gateway::{ChannelId, Content, Destination};
use crate::sched::TimerKey;

use super::engine::Engine;

/// Marker title identifying the ticket panel in channel history.
pub const TICKET_PANEL_MARKER: &str = "Support Tickets";

/// Marker title identifying the application panel in channel history.
pub const APPLICATION_PANEL_MARKER: &str = "Staff Application";

impl Engine {
    pub(super) async fn startup(&self) {
        self.ensure_panel(
            self.config.channels.ticket_panel,
            TICKET_PANEL_MARKER,
            Content::info(TICKET_PANEL_MARKER)
                .body("Need help? Press the button to open a private ticket with staff.")
                .button("ticket_open", "Open ticket"),
        )
        .await;

        self.ensure_panel(
            self.config.channels.staff_apply,
            APPLICATION_PANEL_MARKER,
            Content::info(APPLICATION_PANEL_MARKER)
                .body("Want to join the team? Press the button and answer a few questions.")
                .button("application_start", "Apply"),
        )
        .await;

        self.timers.schedule(
            TimerKey::ApplicationReap,
            std::time::Duration::from_secs(self.config.applications.reap_interval_secs),
        );
    }

    async fn ensure_panel(&self, channel: ChannelId, marker: &str, panel: Content) {
        match self.notifier.history_contains(channel, marker).await {
            Ok(true) => return,
            Ok(false) => {}
            Err(error) => {
                // Better a duplicate panel than none at all.
                warn!(%error, %channel, marker, "panel history scan failed");
            }
        }
        if let Err(error) = self
            .notifier
            .post(Destination::Channel { channel }, panel)
            .await
        {
            warn!(%error, %channel, marker, "failed to post panel");
        }
    }
}
