//! Command-line interface definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};

use crate::dispatch::OperationTag;

/// Signal-notified multi-process calculator.
#[derive(Parser, Debug)]
#[command(name = "sigcalc")]
#[command(author, version, long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v for info, -vv for debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the interactive calculator (default).
    Run,

    /// Internal worker entry point, spawned by the supervisor.
    #[command(hide = true)]
    Worker(WorkerArgs),
}

/// Arguments for the internal worker subcommand.
#[derive(Parser, Debug)]
pub struct WorkerArgs {
    /// Operation this worker is permanently bound to.
    #[arg(long, value_enum)]
    pub operation: OperationArg,
}

/// CLI-facing operation names.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationArg {
    Add,
    Subtract,
    Multiply,
}

impl From<OperationArg> for OperationTag {
    fn from(arg: OperationArg) -> Self {
        match arg {
            OperationArg::Add => OperationTag::Add,
            OperationArg::Subtract => OperationTag::Subtract,
            OperationArg::Multiply => OperationTag::Multiply,
        }
    }
}
