//! CLI command definitions for the `parley` binary.
//!
//! Uses clap derive macros for argument parsing. Every command takes the
//! topic it operates on as its first positional argument.

pub mod chat;
pub mod history;
pub mod records;
pub mod status;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use parley_types::session::SessionStatus;

/// Keep conversations going across restarts.
#[derive(Parser)]
#[command(name = "parley", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for info, -vv for debug, -vvv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans to stdout via OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    /// Keep activity records in memory only; nothing survives the process.
    #[arg(long, global = true)]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive conversation in a topic.
    Chat {
        /// Topic to talk in.
        topic: String,

        /// Open this past session instead of continuing the latest one.
        #[arg(long)]
        session: Option<String>,
    },

    /// List past sessions of a topic.
    #[command(alias = "ls")]
    History {
        topic: String,

        /// Maximum sessions to show (capped at 30).
        #[arg(short, long)]
        limit: Option<u32>,

        /// Only sessions with this status.
        #[arg(long, value_enum)]
        status: Option<StatusFilter>,

        /// Hide sessions the server no longer considers current.
        #[arg(long)]
        active_only: bool,
    },

    /// Show the local activity record of a topic.
    Status { topic: String },

    /// Delete the local activity record of a topic.
    Forget { topic: String },

    /// Remove every expired local activity record.
    Sweep,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusFilter {
    Active,
    Expired,
    Archived,
}

impl From<StatusFilter> for SessionStatus {
    fn from(filter: StatusFilter) -> Self {
        match filter {
            StatusFilter::Active => SessionStatus::Active,
            StatusFilter::Expired => SessionStatus::Expired,
            StatusFilter::Archived => SessionStatus::Archived,
        }
    }
}
