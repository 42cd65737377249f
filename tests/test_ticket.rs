//! Ticket lifecycle: open, duplicate rejection, close grace, purge.

mod common;

use common::*;
use guildhall::gateway::UserId;
use guildhall::sched::TimerKey;
use guildhall::workflow::Trigger;

const OWNER: UserId = UserId(30);

#[tokio::test]
async fn open_creates_channel_and_registers_owner() {
    let notifier = RecordingNotifier::new();
    let (engine, _rx) = engine_with(notifier.clone());

    engine.dispatch(press(OWNER, TICKET_PANEL, 1, "ticket_open")).await;

    let created = notifier.created_channels.lock().unwrap().clone();
    assert_eq!(created.len(), 1);
    let (channel, request) = &created[0];
    assert_eq!(request.owner, OWNER);
    assert_eq!(request.category, TICKET_CATEGORY);
    assert_eq!(engine.open_ticket(GUILD, OWNER), Some(*channel));

    // Welcome in the new channel carries the close button.
    let welcome = notifier.channel_posts(*channel);
    assert_eq!(welcome.len(), 1);
    assert_eq!(welcome[0].buttons[0].custom_id, "ticket_close");

    // The presser got a confirmation naming the channel.
    let replies = notifier.ephemeral_posts(OWNER);
    assert!(replies[0].body.contains(&channel.to_string()));
}

#[tokio::test]
async fn duplicate_open_names_existing_channel() {
    let notifier = RecordingNotifier::new();
    let (engine, _rx) = engine_with(notifier.clone());

    engine.dispatch(press(OWNER, TICKET_PANEL, 1, "ticket_open")).await;
    let channel = engine.open_ticket(GUILD, OWNER).unwrap();

    engine.dispatch(press(OWNER, TICKET_PANEL, 1, "ticket_open")).await;

    assert_eq!(notifier.created_channels.lock().unwrap().len(), 1);
    let replies = notifier.ephemeral_posts(OWNER);
    let rejection = replies.last().unwrap();
    assert_eq!(rejection.title, "Can't do that");
    assert!(rejection.body.contains(&channel.to_string()));
}

#[tokio::test]
async fn close_is_gated_and_single_shot() {
    let notifier = RecordingNotifier::new();
    let (engine, _rx) = engine_with(notifier.clone());
    engine.dispatch(press(OWNER, TICKET_PANEL, 1, "ticket_open")).await;
    let channel = engine.open_ticket(GUILD, OWNER).unwrap();

    // A stranger cannot close someone else's ticket.
    engine.dispatch(press(UserId(31), channel, 2, "ticket_close")).await;
    assert!(!engine.ticket_at(channel).unwrap().closing);

    // The owner can; the second press bounces off the closing flag.
    engine.dispatch(press(OWNER, channel, 2, "ticket_close")).await;
    assert!(engine.ticket_at(channel).unwrap().closing);
    engine.dispatch(press(OWNER, channel, 2, "ticket_close")).await;

    assert_eq!(notifier.count_titled(channel, "Ticket closing"), 1);
    let replies = notifier.ephemeral_posts(OWNER);
    assert!(replies.last().unwrap().body.contains("already closing"));
}

#[tokio::test]
async fn purge_deletes_channel_and_frees_the_owner() {
    let notifier = RecordingNotifier::new();
    let (engine, _rx) = engine_with(notifier.clone());
    engine.dispatch(press(OWNER, TICKET_PANEL, 1, "ticket_open")).await;
    let channel = engine.open_ticket(GUILD, OWNER).unwrap();
    engine.dispatch(press(OWNER, channel, 2, "ticket_close")).await;

    engine.dispatch(Trigger::Timer(TimerKey::TicketPurge { channel })).await;

    assert_eq!(*notifier.deleted_channels.lock().unwrap(), vec![channel]);
    assert_eq!(engine.open_ticket(GUILD, OWNER), None);

    // A stale second fire is a no-op.
    engine.dispatch(Trigger::Timer(TimerKey::TicketPurge { channel })).await;
    assert_eq!(notifier.deleted_channels.lock().unwrap().len(), 1);

    // The owner can open a fresh ticket afterwards.
    engine.dispatch(press(OWNER, TICKET_PANEL, 1, "ticket_open")).await;
    assert!(engine.open_ticket(GUILD, OWNER).is_some());
}

#[tokio::test]
async fn close_outside_a_ticket_channel_is_rejected() {
    let notifier = RecordingNotifier::new();
    let (engine, _rx) = engine_with(notifier.clone());

    engine.dispatch(press(OWNER, TICKET_PANEL, 1, "ticket_close")).await;

    let replies = notifier.ephemeral_posts(OWNER);
    assert!(replies[0].body.contains("not a ticket channel"));
    assert!(notifier.deleted_channels.lock().unwrap().is_empty());
}
