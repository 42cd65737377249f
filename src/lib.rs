//! Guildhall — ephemeral-state workflow engine for community chat automation.
//!
//! This library provides the stores, workflows, and timers behind a
//! chat-platform bot: timed giveaways, support tickets, staff-application
//! intake, a number-guessing game, and formatted server-event notices.
//! The chat platform itself is reached only through the [`gateway`]
//! traits; the bundled binary speaks newline-delimited JSON over stdio.

pub mod cli;
pub mod config;
pub mod duration;
pub mod error;
pub mod gateway;
pub mod observability;
pub mod sched;
pub mod store;
pub mod workflow;
