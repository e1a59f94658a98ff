//! Terminal rendering of chat messages.

use console::style;

use parley_types::message::{Message, MessageRole};

/// Render one message as a prefixed, indented block.
pub fn render_message(message: &Message) -> String {
    let prefix = match message.role {
        MessageRole::User => style("you").cyan().bold(),
        MessageRole::Assistant => style("assistant").magenta().bold(),
        MessageRole::System => style("system").dim(),
    };

    let mut lines = message.content.lines();
    let first = lines.next().unwrap_or_default();
    let mut out = format!("  {prefix} › {first}");
    for line in lines {
        out.push_str("\n    ");
        out.push_str(line);
    }
    if message.is_provisional() {
        out.push_str(&format!(" {}", style("(sending…)").dim()));
    }
    out
}

/// Render a transcript, oldest first, separated by blank lines.
pub fn render_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(render_message)
        .collect::<Vec<_>>()
        .join("\n\n")
}
