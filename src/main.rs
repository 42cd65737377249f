//! Guildhall — community automation bot engine.

use clap::Parser;

use guildhall::cli::args::{Cli, Commands, LogFormatChoice};
use guildhall::cli::commands;
use guildhall::error::ExitCode;
use guildhall::observability::{LogFormat, init_logging};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if !cli.quiet {
        let format = match &cli.command {
            Commands::Run(args) => match args.log_format {
                LogFormatChoice::Human => LogFormat::Human,
                LogFormatChoice::Json => LogFormat::Json,
            },
            _ => LogFormat::Human,
        };
        init_logging(format, cli.verbose, cli.color);
    }

    // Spawn signal handler for graceful shutdown
    tokio::spawn(async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }

        eprintln!("\nShutting down gracefully... (press Ctrl+C again to force)");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => std::process::exit(ExitCode::INTERRUPTED),
            _ = sigterm.recv() => std::process::exit(ExitCode::TERMINATED),
        }
    });

    let result = commands::dispatch(cli).await;

    match result {
        Ok(()) => std::process::exit(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
