//! Review submissions.
//!
//! A stateless command: validate the site against the configured list
//! and the rating range, then post the review publicly.

use crate::error::WorkflowError;
use crate::gateway::{Content, Destination};
use crate::observability::AuditEvent;

use super::engine::Engine;
use super::trigger::CommandInvocation;

impl Engine {
    pub(super) async fn review_submit(
        &self,
        invocation: &CommandInvocation,
        site: &str,
        rating: u8,
        feedback: &str,
    ) -> Result<(), WorkflowError> {
        let sites = &self.config.reviews.sites;
        if sites.is_empty() {
            return Err(WorkflowError::Validation(
                "Reviews are not configured on this server.".to_string(),
            ));
        }
        let Some(canonical) = sites.iter().find(|s| s.eq_ignore_ascii_case(site.trim()))
        else {
            return Err(WorkflowError::Validation(format!(
                "Unknown review site. Available: {}.",
                sites.join(", ")
            )));
        };
        if !(1..=5).contains(&rating) {
            return Err(WorkflowError::Validation(
                "The rating must be between 1 and 5.".to_string(),
            ));
        }

        let stars = "★".repeat(rating as usize) + &"☆".repeat(5 - rating as usize);
        let mut content = Content::success(format!("Review: {canonical}"))
            .field("Rating", stars)
            .field("Reviewer", format!("<@{}>", invocation.invoker));
        let feedback = feedback.trim();
        if !feedback.is_empty() {
            content = content.body(feedback);
        }
        self.notifier
            .post(
                Destination::Channel {
                    channel: self.config.channels.review,
                },
                content,
            )
            .await?;

        self.reply(
            invocation.reply_destination(),
            Content::success("Thank you!").body("Your review has been posted."),
        )
        .await;
        self.audit
            .record(AuditEvent::ReviewSubmitted {
                user: invocation.invoker,
                site: canonical.clone(),
                rating,
            })
            .await;
        Ok(())
    }
}
