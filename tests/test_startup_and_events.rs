//! Startup panel setup, server-event notices, and the review command.

mod common;

use common::*;
use guildhall::gateway::{ChannelId, UserId};
use guildhall::workflow::{Command, ServerEvent, Trigger};

#[tokio::test]
async fn startup_posts_each_panel_once() {
    let notifier = RecordingNotifier::new();
    let (engine, _rx) = engine_with(notifier.clone());

    engine.dispatch(Trigger::Startup { guild: GUILD }).await;

    let ticket_panels = notifier.channel_posts(TICKET_PANEL);
    assert_eq!(ticket_panels.len(), 1);
    assert_eq!(ticket_panels[0].buttons[0].custom_id, "ticket_open");
    let apply_panels = notifier.channel_posts(STAFF_APPLY);
    assert_eq!(apply_panels.len(), 1);
    assert_eq!(apply_panels[0].buttons[0].custom_id, "application_start");

    // The reaper sweep is armed.
    assert_eq!(engine.pending_timers(), 1);

    // A second startup finds the markers in history and posts nothing.
    engine.dispatch(Trigger::Startup { guild: GUILD }).await;
    assert_eq!(notifier.channel_posts(TICKET_PANEL).len(), 1);
    assert_eq!(notifier.channel_posts(STAFF_APPLY).len(), 1);
}

#[tokio::test]
async fn joins_and_leaves_reach_the_welcome_channel() {
    let notifier = RecordingNotifier::new();
    let (engine, _rx) = engine_with(notifier.clone());

    engine
        .dispatch(Trigger::Server(ServerEvent::MemberJoined {
            guild: GUILD,
            user: UserId(80),
            member_count: Some(1234),
        }))
        .await;
    engine
        .dispatch(Trigger::Server(ServerEvent::MemberLeft {
            guild: GUILD,
            user: UserId(80),
        }))
        .await;

    let welcome = notifier.channel_posts(WELCOME);
    assert_eq!(welcome.len(), 2);
    assert!(welcome[0].body.contains("<@80>"));
    assert!(welcome[0].fields.iter().any(|f| f.value == "1234"));
    assert!(welcome[1].body.contains("left"));

    // Both events were audited.
    assert_eq!(notifier.channel_posts(LOG).len(), 2);
}

#[tokio::test]
async fn edits_and_deletions_are_audited_only() {
    let notifier = RecordingNotifier::new();
    let (engine, _rx) = engine_with(notifier.clone());

    engine
        .dispatch(Trigger::Server(ServerEvent::MessageEdited {
            guild: GUILD,
            channel: ChannelId(55),
            author: UserId(80),
            before: "helo".to_string(),
            after: "hello".to_string(),
        }))
        .await;
    engine
        .dispatch(Trigger::Server(ServerEvent::MessageDeleted {
            guild: GUILD,
            channel: ChannelId(55),
            author: UserId(80),
            content: "oops".to_string(),
        }))
        .await;

    assert!(notifier.channel_posts(WELCOME).is_empty());
    let log = notifier.channel_posts(LOG);
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].title, "Message edited");
    assert!(log[0].fields.iter().any(|f| f.value == "helo"));
    assert_eq!(log[1].title, "Message deleted");
}

#[tokio::test]
async fn moderation_events_are_audited() {
    let notifier = RecordingNotifier::new();
    let (engine, _rx) = engine_with(notifier.clone());
    let member = UserId(80);

    engine
        .dispatch(Trigger::Server(ServerEvent::MemberBanned {
            guild: GUILD,
            user: member,
        }))
        .await;
    engine
        .dispatch(Trigger::Server(ServerEvent::VoiceStateChanged {
            guild: GUILD,
            user: member,
            before: None,
            after: Some("General".to_string()),
        }))
        .await;
    engine
        .dispatch(Trigger::Server(ServerEvent::VoiceStateChanged {
            guild: GUILD,
            user: member,
            before: Some("General".to_string()),
            after: Some("Music".to_string()),
        }))
        .await;
    engine
        .dispatch(Trigger::Server(ServerEvent::ChannelCreated {
            guild: GUILD,
            name: "plans".to_string(),
        }))
        .await;
    engine
        .dispatch(Trigger::Server(ServerEvent::ChannelDeleted {
            guild: GUILD,
            name: "plans".to_string(),
        }))
        .await;
    engine
        .dispatch(Trigger::Server(ServerEvent::MemberUpdated {
            guild: GUILD,
            user: member,
            before_nick: None,
            after_nick: Some("Newbie".to_string()),
            roles_added: vec![],
            roles_removed: vec!["Visitor".to_string()],
        }))
        .await;
    engine
        .dispatch(Trigger::Server(ServerEvent::UserUpdated {
            user: member,
            before_name: "old-name".to_string(),
            after_name: "new-name".to_string(),
        }))
        .await;

    let log = notifier.channel_posts(LOG);
    let titles: Vec<_> = log.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(
        titles,
        [
            "Member banned",
            "Voice channel joined",
            "Voice channel moved",
            "Channel created",
            "Channel deleted",
            "Member updated",
            "Username changed",
        ]
    );
    assert!(notifier.channel_posts(WELCOME).is_empty());
    assert!(log[5].fields.iter().any(|f| f.value == "Visitor"));

    // Updates that change nothing we render post no notice.
    engine
        .dispatch(Trigger::Server(ServerEvent::VoiceStateChanged {
            guild: GUILD,
            user: member,
            before: Some("Music".to_string()),
            after: Some("Music".to_string()),
        }))
        .await;
    engine
        .dispatch(Trigger::Server(ServerEvent::MemberUpdated {
            guild: GUILD,
            user: member,
            before_nick: Some("Newbie".to_string()),
            after_nick: Some("Newbie".to_string()),
            roles_added: vec![],
            roles_removed: vec![],
        }))
        .await;
    assert_eq!(notifier.channel_posts(LOG).len(), 7);
}

#[tokio::test]
async fn review_validates_site_and_rating() {
    let notifier = RecordingNotifier::new();
    let (engine, _rx) = engine_with(notifier.clone());
    let reviewer = UserId(81);

    engine
        .dispatch(command(
            reviewer,
            REVIEW,
            Command::Review {
                site: "nowhere".to_string(),
                rating: 4,
                feedback: String::new(),
            },
        ))
        .await;
    engine
        .dispatch(command(
            reviewer,
            REVIEW,
            Command::Review {
                site: "trustpilot".to_string(),
                rating: 6,
                feedback: String::new(),
            },
        ))
        .await;
    assert!(notifier.channel_posts(REVIEW).is_empty());

    // Site matching is case-insensitive; the post uses the configured name.
    engine
        .dispatch(command(
            reviewer,
            REVIEW,
            Command::Review {
                site: "TRUSTPILOT".to_string(),
                rating: 4,
                feedback: "Great community".to_string(),
            },
        ))
        .await;

    let posts = notifier.channel_posts(REVIEW);
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].title, "Review: Trustpilot");
    assert_eq!(posts[0].body, "Great community");
    assert!(posts[0].fields.iter().any(|f| f.value == "★★★★☆"));
}
