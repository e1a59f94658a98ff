//! Banners printed when a chat opens or switches session.

use console::style;

use parley_types::session::{Session, TopicId};

/// Session header shown at chat start and after every switch.
pub fn session_banner(topic: &TopicId, session: &Session, note: &str) -> String {
    format!(
        "\n  {} {}\n  {}  {}\n  {}  {} ({} message{})\n  {}\n",
        style("*").bold(),
        style(format!("Topic {topic}")).cyan().bold(),
        style("Session:").bold(),
        style(session.display_title()).dim(),
        style("ID:").bold(),
        style(&session.id).dim(),
        session.message_count,
        if session.message_count == 1 { "" } else { "s" },
        style(note).dim(),
    )
}

pub fn print_welcome_banner(topic: &TopicId, session: &Session, note: &str) {
    print!("{}", session_banner(topic, session, note));
    println!(
        "  {}",
        style("Type /help for commands, Ctrl+D to exit").dim()
    );
    println!("  {}", style("---").dim());
    println!();
}
