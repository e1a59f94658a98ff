//! Parley CLI entry point.
//!
//! Binary name: `parley`
//!
//! Parses CLI arguments, sets up tracing, wires the engine to SQLite and
//! the HTTP session API, then dispatches to a command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;

use parley_observe::{LogFormat, TracingOptions, init_tracing, shutdown_tracing};
use parley_types::history::HistoryQuery;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need tracing or app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "parley", &mut std::io::stdout());
        return Ok(());
    }

    init_tracing(&TracingOptions {
        verbosity: cli.verbose,
        quiet: cli.quiet,
        format: if cli.json { LogFormat::Json } else { LogFormat::Pretty },
        otel: cli.otel,
    })
    .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    let state = AppState::init(cli.ephemeral).await?;
    let result = run(&state, cli).await;

    state.close().await;
    shutdown_tracing();
    result
}

async fn run(state: &AppState, cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Chat { topic, session } => {
            cli::chat::run_chat_loop(state, &topic, session).await?;
        }

        Commands::History {
            topic,
            limit,
            status,
            active_only,
        } => {
            let query = HistoryQuery {
                limit,
                status: status.map(Into::into),
                include_inactive: active_only.then_some(false),
            };
            cli::history::list_history(state, &topic, query, cli.json).await?;
        }

        Commands::Status { topic } => {
            cli::status::status(state, &topic, cli.json).await?;
        }

        Commands::Forget { topic } => {
            cli::records::forget(state, &topic, cli.json).await?;
        }

        Commands::Sweep => {
            cli::records::sweep(state, cli.json).await?;
        }

        Commands::Completions { .. } => unreachable!("handled in main"),
    }

    Ok(())
}
