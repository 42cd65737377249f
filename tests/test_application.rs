//! Staff-application flow: Q&A over direct messages, submission,
//! decisions, cancellation, timeouts, and the reaper.

mod common;

use common::*;
use guildhall::gateway::{MessageId, UserId};
use guildhall::sched::TimerKey;
use guildhall::workflow::Trigger;

const APPLICANT: UserId = UserId(60);

async fn complete_application(
    engine: &guildhall::workflow::Engine,
    notifier: &RecordingNotifier,
) -> MessageId {
    engine
        .dispatch(press(APPLICANT, STAFF_APPLY, 1, "application_start"))
        .await;
    engine.dispatch(private_message(APPLICANT, "To help out")).await;
    engine.dispatch(private_message(APPLICANT, "Every day")).await;

    let transcript = notifier
        .posts
        .lock()
        .unwrap()
        .iter()
        .find(|(d, _, _)| {
            matches!(d, guildhall::gateway::Destination::Channel { channel } if *channel == STAFF_RESULTS)
        })
        .map(|(_, _, message)| message.message)
        .expect("transcript should be posted");
    transcript
}

#[tokio::test]
async fn start_asks_the_first_question_privately() {
    let notifier = RecordingNotifier::new();
    let (engine, _rx) = engine_with(notifier.clone());

    engine
        .dispatch(press(APPLICANT, STAFF_APPLY, 1, "application_start"))
        .await;

    let dms = notifier.direct_posts(APPLICANT);
    assert_eq!(dms.len(), 2); // intro + question 1
    assert_eq!(dms[1].title, "Question 1/2");
    assert_eq!(engine.application(APPLICANT).unwrap().current_question, 0);
    assert_eq!(engine.pending_timers(), 1);

    // A second press while in progress is rejected.
    engine
        .dispatch(press(APPLICANT, STAFF_APPLY, 1, "application_start"))
        .await;
    let replies = notifier.ephemeral_posts(APPLICANT);
    assert!(replies.last().unwrap().body.contains("already have an application"));
}

#[tokio::test]
async fn closed_direct_messages_roll_the_claim_back() {
    let notifier = RecordingNotifier::new();
    notifier.close_direct_messages();
    let (engine, _rx) = engine_with(notifier.clone());

    engine
        .dispatch(press(APPLICANT, STAFF_APPLY, 1, "application_start"))
        .await;

    assert!(engine.application(APPLICANT).is_none());
    let replies = notifier.ephemeral_posts(APPLICANT);
    assert!(replies[0].body.contains("private message"));

    // After opening DMs the user can start again.
    notifier.open_direct_messages();
    engine
        .dispatch(press(APPLICANT, STAFF_APPLY, 1, "application_start"))
        .await;
    assert!(engine.application(APPLICANT).is_some());
}

#[tokio::test]
async fn answers_advance_and_submission_is_exactly_once() {
    let notifier = RecordingNotifier::new();
    let (engine, _rx) = engine_with(notifier.clone());

    complete_application(&engine, &notifier).await;

    assert!(engine.application(APPLICANT).is_none());
    assert_eq!(engine.pending_decisions(), 1);

    let transcripts = notifier.channel_posts(STAFF_RESULTS);
    assert_eq!(transcripts.len(), 1);
    let transcript = &transcripts[0];
    assert!(transcript.fields.iter().any(|f| f.value == "To help out"));
    assert!(transcript.fields.iter().any(|f| f.value == "Every day"));
    let button_ids: Vec<_> = transcript.buttons.iter().map(|b| b.custom_id.as_str()).collect();
    assert_eq!(
        button_ids,
        vec![
            format!("application_approve:{APPLICANT}"),
            format!("application_deny:{APPLICANT}")
        ]
    );

    // A straggler reply after submission changes nothing.
    engine.dispatch(private_message(APPLICANT, "one more thing")).await;
    assert_eq!(notifier.channel_posts(STAFF_RESULTS).len(), 1);
    assert_eq!(engine.pending_decisions(), 1);
}

#[tokio::test]
async fn cancel_keyword_abandons_the_application() {
    let notifier = RecordingNotifier::new();
    let (engine, _rx) = engine_with(notifier.clone());
    engine
        .dispatch(press(APPLICANT, STAFF_APPLY, 1, "application_start"))
        .await;

    engine.dispatch(private_message(APPLICANT, "  CANCEL ")).await;

    assert!(engine.application(APPLICANT).is_none());
    let dms = notifier.direct_posts(APPLICANT);
    assert_eq!(dms.last().unwrap().title, "Application cancelled");
    assert!(notifier.channel_posts(STAFF_RESULTS).is_empty());
}

#[tokio::test]
async fn decision_lands_exactly_once() {
    let notifier = RecordingNotifier::new();
    let (engine, _rx) = engine_with(notifier.clone());
    let transcript = complete_application(&engine, &notifier).await;

    // Non-staff cannot decide.
    engine
        .dispatch(press(
            UserId(61),
            STAFF_RESULTS,
            transcript.0,
            &format!("application_approve:{APPLICANT}"),
        ))
        .await;
    assert_eq!(engine.pending_decisions(), 1);

    // First staff press approves and grants the role.
    engine
        .dispatch(press(
            STAFF,
            STAFF_RESULTS,
            transcript.0,
            &format!("application_approve:{APPLICANT}"),
        ))
        .await;
    assert_eq!(
        *notifier.granted_roles.lock().unwrap(),
        vec![(GUILD, APPLICANT, STAFF_ROLE)]
    );
    assert!(notifier
        .direct_posts(APPLICANT)
        .iter()
        .any(|c| c.title == "Application approved"));

    // A racing second press finds the decision already taken.
    engine
        .dispatch(press(
            STAFF,
            STAFF_RESULTS,
            transcript.0,
            &format!("application_deny:{APPLICANT}"),
        ))
        .await;
    assert_eq!(notifier.granted_roles.lock().unwrap().len(), 1);
    assert_eq!(engine.pending_decisions(), 0);
    let replies = notifier.ephemeral_posts(STAFF);
    assert!(replies.last().unwrap().body.contains("already been decided"));
}

#[tokio::test]
async fn deny_notifies_without_granting() {
    let notifier = RecordingNotifier::new();
    let (engine, _rx) = engine_with(notifier.clone());
    let transcript = complete_application(&engine, &notifier).await;

    engine
        .dispatch(press(
            STAFF,
            STAFF_RESULTS,
            transcript.0,
            &format!("application_deny:{APPLICANT}"),
        ))
        .await;

    assert!(notifier.granted_roles.lock().unwrap().is_empty());
    assert!(notifier
        .direct_posts(APPLICANT)
        .iter()
        .any(|c| c.title == "Application denied"));
}

#[tokio::test]
async fn stale_answer_timeout_is_a_no_op() {
    let notifier = RecordingNotifier::new();
    let (engine, _rx) = engine_with(notifier.clone());
    engine
        .dispatch(press(APPLICANT, STAFF_APPLY, 1, "application_start"))
        .await;
    engine.dispatch(private_message(APPLICANT, "answer one")).await;

    // The deadline for question 0 fires after the answer arrived.
    engine
        .dispatch(Trigger::Timer(TimerKey::ApplicationTimeout {
            user: APPLICANT,
            question: 0,
        }))
        .await;
    assert_eq!(engine.application(APPLICANT).unwrap().current_question, 1);

    // The live deadline for question 1 discards the application.
    engine
        .dispatch(Trigger::Timer(TimerKey::ApplicationTimeout {
            user: APPLICANT,
            question: 1,
        }))
        .await;
    assert!(engine.application(APPLICANT).is_none());
    assert_eq!(
        notifier.direct_posts(APPLICANT).last().unwrap().title,
        "Application timed out"
    );
}

#[tokio::test]
async fn reaper_discards_only_stale_applications() {
    let notifier = RecordingNotifier::new();
    let (engine, _rx) = engine_with(notifier.clone());
    engine
        .dispatch(press(APPLICANT, STAFF_APPLY, 1, "application_start"))
        .await;

    // Fresh application survives a sweep, and the sweep rearms itself.
    let timers_before = engine.pending_timers();
    engine.dispatch(Trigger::Timer(TimerKey::ApplicationReap)).await;
    assert!(engine.application(APPLICANT).is_some());
    assert_eq!(engine.pending_timers(), timers_before + 1);
}
