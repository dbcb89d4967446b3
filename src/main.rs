//! sigcalc - signal-notified multi-process calculator.

mod cli;
mod dispatch;
mod error;
mod logging;
mod repl;

use anyhow::{Context, Result};
use clap::Parser;
use owo_colors::{OwoColorize, Stream::Stderr};

use cli::{Cli, Commands};
use dispatch::Supervisor;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    match cli.command {
        // Never returns: the worker loop runs until terminated.
        Some(Commands::Worker(args)) => dispatch::run_worker(args.operation.into()),
        Some(Commands::Run) | None => {}
    }

    if let Err(e) = cmd_run() {
        eprintln!(
            "{}: {}",
            "error"
                .if_supports_color(Stderr, |text| text.red())
                .if_supports_color(Stderr, |text| text.bold()),
            e
        );
        for cause in e.chain().skip(1) {
            eprintln!(
                "  {}: {}",
                "caused by".if_supports_color(Stderr, |text| text.yellow()),
                cause
            );
        }
        std::process::exit(1);
    }
}

/// Spawn the worker pool, run the request loop, and tear everything down.
fn cmd_run() -> Result<()> {
    let program = std::env::current_exe().context("Failed to locate own executable")?;

    let mut supervisor = Supervisor::spawn(&program).context("Failed to start worker pool")?;
    repl::run(&mut supervisor).context("Request loop failed")?;
    supervisor.shutdown();

    Ok(())
}
