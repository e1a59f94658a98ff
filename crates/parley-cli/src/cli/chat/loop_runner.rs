//! Main chat loop orchestration.
//!
//! Opens the topic through the controller, prints the transcript, then
//! reads lines until Ctrl+D. Plain lines are sent optimistically; slash
//! commands switch, rename and delete sessions.

use std::future::Future;
use std::io::Write;
use std::time::Duration;

use anyhow::Context;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use rustyline_async::SharedWriter;
use tracing::{info, warn};

use parley_core::negotiator::NegotiationState;
use parley_types::activity::ActivityEvent;
use parley_types::error::{HistoryError, SendError, SessionError};
use parley_types::history::HistoryQuery;
use parley_types::session::{Session, SessionId, TopicId};

use crate::cli::history::history_table;
use crate::state::{AppState, ConcreteController};

use super::banner::{print_welcome_banner, session_banner};
use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};
use super::renderer::{render_message, render_transcript};

fn progress_message(state: &NegotiationState) -> &'static str {
    match state {
        NegotiationState::Idle => "connecting...",
        NegotiationState::Validating => "checking your last session...",
        NegotiationState::Resumed => "resuming...",
        NegotiationState::Recreating => "starting a session...",
        NegotiationState::Ready(_) => "loading messages...",
        NegotiationState::Failed(_) => "giving up...",
    }
}

/// Await a negotiation while a spinner follows the controller's state.
async fn with_progress<F>(controller: &ConcreteController, negotiation: F) -> Result<Session, SessionError>
where
    F: Future<Output = Result<Session, SessionError>>,
{
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("  {spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(progress_message(&controller.state()));
    spinner.enable_steady_tick(Duration::from_millis(80));

    let mut states = controller.subscribe();
    tokio::pin!(negotiation);
    let result = loop {
        tokio::select! {
            result = &mut negotiation => break result,
            changed = states.changed() => {
                if changed.is_err() {
                    break (&mut negotiation).await;
                }
                spinner.set_message(progress_message(&states.borrow_and_update()));
            }
        }
    };
    spinner.finish_and_clear();
    result
}

/// Run the interactive chat loop for `topic`.
pub async fn run_chat_loop(
    state: &AppState,
    topic: &str,
    session_id: Option<String>,
) -> anyhow::Result<()> {
    let topic = TopicId::new(topic);
    let controller = state.controller();

    let selection = session_id.map(SessionId::new);
    let note = if selection.is_some() { "Opened a past session" } else { "Ready" };
    let session = with_progress(
        &controller,
        controller.open_topic_with_selection(topic.clone(), selection.clone()),
    )
    .await;
    let session = match (session, selection) {
        (Ok(session), _) => session,
        (Err(e), Some(id)) => {
            controller.shutdown().await;
            return Err(e).with_context(|| format!("Could not open session {id} of topic '{topic}'"));
        }
        (Err(e), None) => {
            controller.shutdown().await;
            return Err(e).with_context(|| format!("Could not open topic '{topic}'"));
        }
    };

    print_welcome_banner(&topic, &session, note);
    let transcript = render_transcript(&controller.messages());
    if !transcript.is_empty() {
        println!("{transcript}");
        println!();
    }

    let (mut input, mut out) =
        ChatInput::new(prompt()).context("Failed to initialize terminal input")?;

    loop {
        let line = match input.read_line().await {
            InputEvent::Line(line) => line,
            InputEvent::Interrupted => {
                let _ = writeln!(out, "  {}", style("(Ctrl+D to exit)").dim());
                continue;
            }
            InputEvent::Eof => break,
        };
        if line.is_empty() {
            continue;
        }
        controller.record_activity(ActivityEvent::KeyPress);

        let Some(command) = commands::parse(&line) else {
            send_line(&controller, &mut out, &line).await;
            continue;
        };

        match command {
            ChatCommand::Help => {
                let _ = write!(out, "{}", commands::help_text());
            }
            ChatCommand::Clear => input.clear(),
            ChatCommand::Exit => break,
            ChatCommand::History => show_history(&controller, &mut out).await,
            ChatCommand::New => {
                let result = controller.start_new_conversation().await;
                report_switch(&controller, &topic, &mut out, result, "Started a new conversation");
            }
            ChatCommand::Resume(id) => {
                let result = controller.select_history_session(SessionId::new(id)).await;
                report_switch(&controller, &topic, &mut out, result, "Opened a past session");
            }
            ChatCommand::Latest => {
                let result = controller.clear_history_selection().await;
                report_switch(&controller, &topic, &mut out, result, "Back on the latest session");
            }
            ChatCommand::Rename(title) => rename_current(&controller, &mut out, &title).await,
            ChatCommand::Delete(id) => delete_session(&controller, &mut out, id).await,
            ChatCommand::Unknown(cmd) => {
                let _ = writeln!(
                    out,
                    "  {} Unknown command: {cmd}. Type /help for commands.",
                    style("?").yellow().bold()
                );
            }
        }
    }

    input.flush();
    controller.shutdown().await;
    info!(topic = %topic, "Chat ended");
    println!();
    println!("  {}", style("Session remembered. See you soon.").dim());
    Ok(())
}

fn prompt() -> String {
    format!("{} › ", style("you").cyan().bold())
}

async fn send_line(controller: &ConcreteController, out: &mut SharedWriter, line: &str) {
    let _ = writeln!(out, "  {}", style("thinking...").dim());
    match controller.send(line).await {
        Ok(outcome) => {
            if let Some(moved) = &outcome.moved_to {
                let _ = writeln!(
                    out,
                    "  {} Conversation moved to session {}",
                    style("i").blue().bold(),
                    style(&moved.id).bold()
                );
            }
            let _ = writeln!(out, "\n{}\n", render_message(&outcome.assistant_message));
        }
        Err(SendError::NoSession) => {
            let _ = writeln!(
                out,
                "  {} No session is open. Use /latest or /new.",
                style("!").yellow().bold()
            );
        }
        Err(e) => {
            warn!(error = %e, "Send failed");
            let _ = writeln!(
                out,
                "  {} {e}. Your message was not saved; try again.",
                style("✗").red().bold()
            );
        }
    }
}

async fn show_history(controller: &ConcreteController, out: &mut SharedWriter) {
    match controller.list_history(&HistoryQuery::default()).await {
        Ok(history) if history.sessions.is_empty() => {
            let _ = writeln!(out, "  {}", style("No past sessions.").dim());
        }
        Ok(history) => {
            let table = history_table(&history.sessions, chrono::Utc::now());
            let _ = writeln!(out, "\n{table}");
            let _ = writeln!(
                out,
                "  {}\n",
                style("Switch with /resume <id>, return with /latest").dim()
            );
        }
        Err(e) => {
            let _ = writeln!(out, "  {} {e}", style("✗").red().bold());
        }
    }
}

async fn rename_current(controller: &ConcreteController, out: &mut SharedWriter, title: &str) {
    let Some(session) = controller.current_session() else {
        let _ = writeln!(out, "  {} No session is open to rename.", style("!").yellow().bold());
        return;
    };
    match controller.rename_session(&session.id, title).await {
        Ok(renamed) => {
            let _ = writeln!(
                out,
                "  {} Session {} is now \"{}\"",
                style("✓").green().bold(),
                style(&renamed.id).bold(),
                renamed.display_title()
            );
        }
        Err(e) => report_history_error(out, &e),
    }
}

async fn delete_session(controller: &ConcreteController, out: &mut SharedWriter, id: Option<String>) {
    let Some(target) = id
        .map(SessionId::new)
        .or_else(|| controller.current_session().map(|s| s.id))
    else {
        let _ = writeln!(out, "  {} No session is open. Use /delete <id>.", style("!").yellow().bold());
        return;
    };
    match controller.delete_session(&target).await {
        Ok(()) => {
            let _ = writeln!(
                out,
                "  {} Deleted session {}",
                style("✓").green().bold(),
                style(&target).bold()
            );
            if controller.current_session().is_none() {
                let _ = writeln!(
                    out,
                    "  {}",
                    style("Use /latest to continue the latest session or /new to start over.").dim()
                );
            }
        }
        Err(e) => report_history_error(out, &e),
    }
}

fn report_history_error(out: &mut SharedWriter, error: &HistoryError) {
    warn!(error = %error, "Session management failed");
    let _ = writeln!(out, "  {} {error}", style("✗").red().bold());
}

fn report_switch(
    controller: &ConcreteController,
    topic: &TopicId,
    out: &mut SharedWriter,
    result: Result<Session, SessionError>,
    note: &str,
) {
    match result {
        Ok(session) => {
            let _ = write!(out, "{}", session_banner(topic, &session, note));
            let transcript = render_transcript(&controller.messages());
            if !transcript.is_empty() {
                let _ = writeln!(out, "{transcript}\n");
            }
        }
        Err(e) => {
            let _ = writeln!(out, "  {} {e}", style("✗").red().bold());
            if controller.current_session().is_none() {
                let _ = writeln!(
                    out,
                    "  {}",
                    style("Use /latest to continue the latest session or /new to start over.").dim()
                );
            }
        }
    }
}
