//! Workflows and the dispatch engine.
//!
//! Each submodule owns one workflow's entities and `Engine` handlers;
//! [`engine`] holds the stores and routes triggers to them.

pub mod application;
pub mod engine;
pub mod giveaway;
pub mod numbergame;
pub mod panel;
pub mod review;
pub mod server_log;
pub mod ticket;
pub mod trigger;

pub use engine::Engine;
pub use trigger::{
    ButtonAction, ButtonPress, Command, CommandInvocation, InboundMessage, ServerEvent, Trigger,
};
