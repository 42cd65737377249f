//! Staff applications.
//!
//! An application is a private Q&A: the engine asks the configured
//! questions one at a time over direct messages, each with its own
//! answer deadline. A finished application becomes a transcript in the
//! staff-results channel with approve/deny buttons; the pending-decision
//! store guarantees a double-clicked decision lands exactly once.
//! Unfinished applications older than the configured age are reaped by
//! a periodic sweep.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::WorkflowError;
use crate::gateway::{Content, Destination, GuildId, MessageRef, UserId};
use crate::observability::AuditEvent;
use crate::sched::TimerKey;

use super::engine::Engine;
use super::trigger::{ButtonPress, InboundMessage};

/// Keyword an applicant sends to abandon their application.
pub const CANCEL_KEYWORD: &str = "cancel";

const ANSWER_EXCERPT_LIMIT: usize = 1024;

/// An in-progress application.
#[derive(Debug, Clone)]
pub struct Application {
    /// The applicant.
    pub user: UserId,
    /// Guild applied to.
    pub guild: GuildId,
    /// Answers collected so far, in question order.
    pub answers: Vec<String>,
    /// Index of the question currently awaiting an answer.
    pub current_question: usize,
    /// When the application started.
    pub started_at: DateTime<Utc>,
}

/// A submitted application awaiting a staff decision.
#[derive(Debug, Clone)]
pub struct PendingDecision {
    /// The applicant.
    pub applicant: UserId,
    /// Guild applied to.
    pub guild: GuildId,
    /// The transcript message carrying the decision buttons.
    pub review_message: MessageRef,
    /// When the transcript was posted.
    pub submitted_at: DateTime<Utc>,
}

fn answer_excerpt(text: &str) -> String {
    if text.chars().count() <= ANSWER_EXCERPT_LIMIT {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(ANSWER_EXCERPT_LIMIT).collect();
        cut.push('…');
        cut
    }
}

impl Engine {
    /// Starts an application for the pressing user.
    pub(super) async fn application_start(
        &self,
        press: &ButtonPress,
    ) -> Result<(), WorkflowError> {
        let application = Application {
            user: press.actor,
            guild: press.guild,
            answers: Vec::new(),
            current_question: 0,
            started_at: Utc::now(),
        };
        if !self.applications.insert_if_absent(press.actor, application) {
            return Err(WorkflowError::Validation(
                "You already have an application in progress. Check your private messages."
                    .to_string(),
            ));
        }

        let intro = Content::info("Staff application").body(format!(
            "Answer each question in a reply. You have {} seconds per question; \
             send `{CANCEL_KEYWORD}` at any time to abandon the application.",
            self.config.applications.answer_timeout_secs
        ));
        if let Err(error) = self
            .notifier
            .post(Destination::Direct { user: press.actor }, intro)
            .await
        {
            // Closed private messages: roll the claim back so the user
            // can retry after opening them.
            self.applications.take(&press.actor);
            warn!(%error, user = %press.actor, "could not open application conversation");
            return Err(WorkflowError::Validation(
                "I could not send you a private message. Allow direct messages from this \
                 server and press the button again."
                    .to_string(),
            ));
        }

        self.ask_question(press.actor, 0).await;
        self.reply(
            Destination::Ephemeral {
                channel: press.channel,
                user: press.actor,
            },
            Content::success("Application started").body("Check your private messages."),
        )
        .await;
        Ok(())
    }

    /// Sends question `index` and arms its answer deadline.
    async fn ask_question(&self, user: UserId, index: usize) {
        let questions = &self.config.applications.questions;
        let Some(question) = questions.get(index) else {
            return;
        };
        let content = Content::info(format!("Question {}/{}", index + 1, questions.len()))
            .body(question.clone());
        if let Err(error) = self
            .notifier
            .post(Destination::Direct { user }, content)
            .await
        {
            warn!(%error, %user, question = index, "failed to send application question");
        }
        self.timers.schedule(
            TimerKey::ApplicationTimeout { user, question: index },
            std::time::Duration::from_secs(self.config.applications.answer_timeout_secs),
        );
    }

    /// Handles a private message from a user with an active application.
    ///
    /// Messages from users without one are ignored — a straggler reply
    /// after submission or timeout is not an error.
    pub(super) async fn application_message(
        &self,
        message: &InboundMessage,
    ) -> Result<(), WorkflowError> {
        let user = message.author;
        let text = message.text.trim();

        if text.eq_ignore_ascii_case(CANCEL_KEYWORD) {
            let Some(application) = self.applications.take(&user) else {
                return Ok(());
            };
            self.timers.cancel(&TimerKey::ApplicationTimeout {
                user,
                question: application.current_question,
            });
            self.reply(
                Destination::Direct { user },
                Content::info("Application cancelled")
                    .body("You can start a new one from the application panel."),
            )
            .await;
            return Ok(());
        }

        let answered = self.applications.update(&user, |a| {
            a.answers.push(text.to_string());
            let answered_index = a.current_question;
            a.current_question += 1;
            answered_index
        });
        let Some(answered_index) = answered else {
            return Ok(());
        };
        self.timers.cancel(&TimerKey::ApplicationTimeout {
            user,
            question: answered_index,
        });

        let next = answered_index + 1;
        if next < self.config.applications.questions.len() {
            self.ask_question(user, next).await;
        } else {
            self.application_submit(user).await;
        }
        Ok(())
    }

    /// Terminal transition: posts the transcript for staff review.
    ///
    /// `take` makes this exactly-once even if a duplicate final answer
    /// slips through the gateway.
    async fn application_submit(&self, user: UserId) {
        let Some(application) = self.applications.take(&user) else {
            return;
        };

        let mut transcript = Content::info("Staff application")
            .body(format!("Application from <@{user}>"))
            .field("Applicant", user.to_string());
        for (question, answer) in self
            .config
            .applications
            .questions
            .iter()
            .zip(&application.answers)
        {
            transcript = transcript.field(question.clone(), answer_excerpt(answer));
        }
        transcript = transcript
            .button(format!("application_approve:{user}"), "Approve")
            .button(format!("application_deny:{user}"), "Deny");

        let destination = Destination::Channel {
            channel: self.config.channels.staff_results,
        };
        let review_message = match self.notifier.post(destination, transcript).await {
            Ok(message) => message,
            Err(error) => {
                warn!(%error, %user, "failed to post application transcript");
                self.reply(
                    Destination::Direct { user },
                    Content::error("Application failed")
                        .body("Your answers could not be delivered. Please try again later."),
                )
                .await;
                return;
            }
        };

        self.decisions.insert(
            review_message.message,
            PendingDecision {
                applicant: user,
                guild: application.guild,
                review_message,
                submitted_at: Utc::now(),
            },
        );

        self.reply(
            Destination::Direct { user },
            Content::success("Application submitted")
                .body("Staff will review your answers and get back to you."),
        )
        .await;
        self.audit
            .record(AuditEvent::ApplicationSubmitted { applicant: user })
            .await;
    }

    /// Answer-deadline fire. Stale if the applicant has moved on.
    pub(super) async fn application_timeout_fired(&self, user: UserId, question: usize) {
        let taken = self
            .applications
            .take_if(&user, |a| a.current_question == question);
        if taken.is_none() {
            return;
        }
        self.reply(
            Destination::Direct { user },
            Content::warning("Application timed out").body(
                "You did not answer in time. You can start over from the application panel.",
            ),
        )
        .await;
    }

    /// Approve/deny press on a transcript.
    pub(super) async fn application_decide(
        &self,
        press: &ButtonPress,
        approve: bool,
    ) -> Result<(), WorkflowError> {
        if !self
            .perms
            .has_elevated_permission(press.guild, press.actor)
            .await
        {
            return Err(WorkflowError::Permission(
                "Only staff can decide applications.".to_string(),
            ));
        }

        // Exactly-once: the first press takes the pending decision, a
        // racing second press finds nothing.
        let Some(decision) = self.decisions.take(&press.message) else {
            return Err(WorkflowError::NotFound(
                "This application has already been decided.".to_string(),
            ));
        };
        let applicant = decision.applicant;

        if approve {
            if let Err(error) = self
                .notifier
                .grant_role(decision.guild, applicant, self.config.applications.staff_role)
                .await
            {
                warn!(%error, %applicant, "failed to grant staff role");
            }
            self.reply(
                Destination::Direct { user: applicant },
                Content::success("Application approved").body("Welcome to the team!"),
            )
            .await;
        } else {
            self.reply(
                Destination::Direct { user: applicant },
                Content::info("Application denied")
                    .body("Thank you for applying. You are welcome to try again later."),
            )
            .await;
        }

        // Strip the decision buttons from the transcript.
        let verdict = if approve { "Approved" } else { "Denied" };
        let updated = Content::info("Staff application")
            .body(format!("Application from <@{applicant}>"))
            .field("Outcome", format!("{verdict} by <@{}>", press.actor));
        if let Err(error) = self.notifier.edit(decision.review_message, updated).await {
            warn!(%error, %applicant, "failed to update application transcript");
        }

        self.reply(
            Destination::Ephemeral {
                channel: press.channel,
                user: press.actor,
            },
            Content::success(format!("Application {}", verdict.to_ascii_lowercase()))
                .body(format!("Applicant: <@{applicant}>")),
        )
        .await;

        let event = if approve {
            AuditEvent::ApplicationApproved {
                applicant,
                actor: press.actor,
            }
        } else {
            AuditEvent::ApplicationDenied {
                applicant,
                actor: press.actor,
            }
        };
        self.audit.record(event).await;
        Ok(())
    }

    /// Periodic sweep discarding applications older than the limit.
    pub(super) async fn application_reap_fired(&self) {
        let cutoff = Utc::now()
            - chrono::Duration::seconds(
                i64::try_from(self.config.applications.max_age_secs).unwrap_or(i64::MAX),
            );
        for (user, application) in self.applications.snapshot() {
            if application.started_at >= cutoff {
                continue;
            }
            // Re-check under the lock; the applicant may have answered
            // or cancelled since the snapshot.
            let Some(taken) = self
                .applications
                .take_if(&user, |a| a.started_at < cutoff)
            else {
                continue;
            };
            // The taken record carries the live question index; the
            // snapshot's may be stale if an answer landed in between.
            self.timers.cancel(&TimerKey::ApplicationTimeout {
                user,
                question: taken.current_question,
            });
            self.reply(
                Destination::Direct { user },
                Content::warning("Application expired")
                    .body("Your application sat unfinished for too long and was discarded."),
            )
            .await;
            self.audit
                .record(AuditEvent::ApplicationReaped { applicant: user })
                .await;
        }

        self.timers.schedule(
            TimerKey::ApplicationReap,
            std::time::Duration::from_secs(self.config.applications.reap_interval_secs),
        );
    }
}
