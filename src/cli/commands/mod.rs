//! CLI command dispatch and handlers.
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod completions;
pub mod run;
pub mod validate;
pub mod version;

use crate::cli::args::{Cli, Commands};
use crate::error::GuildhallError;

/// Dispatches a parsed CLI invocation to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli) -> Result<(), GuildhallError> {
    match cli.command {
        Commands::Run(args) => run::run(&args).await,
        Commands::Validate(args) => validate::run(&args),
        Commands::Completions(args) => {
            completions::run(&args);
            Ok(())
        }
        Commands::Version(args) => {
            version::run(&args);
            Ok(())
        }
    }
}
