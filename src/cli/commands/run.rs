//! The `run` command: the engine's main loop.
//!
//! Wires the stdio gateway, static permissions, and the engine
//! together, then multiplexes gateway triggers and timer fires into
//! sequential dispatch. The loop ends when stdin closes.

use std::sync::Arc;

use tracing::info;

use crate::cli::args::RunArgs;
use crate::config::load_config;
use crate::error::GuildhallError;
use crate::gateway::stdio::StdioGateway;
use crate::gateway::{Notifier, StaticPermissions};
use crate::workflow::{Engine, Trigger};

/// Runs the engine until the gateway closes.
///
/// # Errors
///
/// Returns an error for a bad configuration or a gateway I/O failure.
pub async fn run(args: &RunArgs) -> Result<(), GuildhallError> {
    let config = load_config(&args.config)?;
    let guild = config.guild;

    let gateway = Arc::new(StdioGateway::new());
    let perms = Arc::new(StaticPermissions {
        admins: config.permissions.admins.clone(),
        staff: config.permissions.staff.clone(),
    });
    let notifier: Arc<dyn Notifier> = gateway.clone();
    let (engine, mut timer_rx) = Engine::new(config, notifier, perms);

    info!(%guild, "engine starting");
    engine.dispatch(Trigger::Startup { guild }).await;

    loop {
        tokio::select! {
            inbound = gateway.next_trigger() => match inbound? {
                Some(trigger) => engine.dispatch(trigger).await,
                None => break,
            },
            fired = timer_rx.recv() => {
                // The engine owns the sender, so recv cannot return None
                // while the engine is alive; guard anyway.
                let Some(key) = fired else { break };
                engine.dispatch(Trigger::Timer(key)).await;
            }
        }
    }

    engine.shutdown();
    info!("gateway closed, engine stopping");
    Ok(())
}
