//! `parley history`: browse a topic's past sessions.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use parley_types::history::{HistoryQuery, SessionHistory};
use parley_types::session::{Session, SessionStatus, TopicId};

use crate::state::AppState;

/// List past sessions, most recently updated first.
///
/// # Examples
///
/// ```bash
/// parley history 7
/// parley history 7 --status archived --json
/// ```
pub async fn list_history(
    state: &AppState,
    topic: &str,
    query: HistoryQuery,
    json: bool,
) -> Result<()> {
    let topic = TopicId::new(topic);
    let history = state
        .history_browser()
        .list_sessions(&topic, &query)
        .await
        .with_context(|| format!("Could not load history for topic '{topic}'"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    if history.sessions.is_empty() {
        println!();
        println!(
            "  {} No sessions found for topic '{}'. Start one with: {}",
            style("i").blue().bold(),
            style(&topic).cyan(),
            style(format!("parley chat {topic}")).yellow()
        );
        println!();
        return Ok(());
    }

    println!();
    println!("  Sessions for topic '{}'", style(&topic).cyan().bold());
    println!();
    println!("{}", history_table(&history.sessions, Utc::now()));
    println!();
    print_counts(&history);
    println!();

    Ok(())
}

pub fn history_table(sessions: &[Session], now: DateTime<Utc>) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Title").fg(Color::White),
        Cell::new("Updated").fg(Color::White),
        Cell::new("Messages").fg(Color::White),
        Cell::new("Status").fg(Color::White),
    ]);

    for session in sessions {
        let status_cell = match session.status {
            SessionStatus::Active if session.is_active => Cell::new("active").fg(Color::Green),
            SessionStatus::Active => Cell::new("inactive").fg(Color::Yellow),
            SessionStatus::Expired => Cell::new("expired").fg(Color::DarkGrey),
            SessionStatus::Archived => Cell::new("archived").fg(Color::DarkGrey),
        };

        table.add_row(vec![
            Cell::new(session.id.as_str()).fg(Color::DarkGrey),
            Cell::new(truncate(session.display_title(), 40)).fg(Color::Cyan),
            Cell::new(format_ago(now - session.updated_at)).fg(Color::White),
            Cell::new(session.message_count.to_string()).fg(Color::White),
            status_cell,
        ]);
    }
    table
}

fn print_counts(history: &SessionHistory) {
    let shown = history.sessions.len();
    println!(
        "  {} of {} session{} shown, {} active",
        style(shown).bold(),
        history.total_count,
        if history.total_count == 1 { "" } else { "s" },
        style(history.active_count).green()
    );
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let kept: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    } else {
        text.to_string()
    }
}

/// Format an elapsed time as a coarse "N units ago".
pub fn format_ago(elapsed: chrono::Duration) -> String {
    let secs = elapsed.num_seconds().max(0);
    if secs < 60 {
        "just now".to_string()
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else if secs < 86_400 {
        format!("{}h ago", secs / 3600)
    } else {
        format!("{}d ago", secs / 86_400)
    }
}
