//! Slash command parsing for the chat loop.
//!
//! Commands start with `/` and control which session the conversation
//! runs in.

use console::style;

/// Available slash commands in the chat loop.
#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    /// Show available commands.
    Help,
    /// Clear the terminal screen.
    Clear,
    /// Leave the chat.
    Exit,
    /// Start a fresh session in this topic.
    New,
    /// List past sessions of this topic.
    History,
    /// Switch to a past session by id.
    Resume(String),
    /// Drop the selected past session and continue the latest one.
    Latest,
    /// Retitle the open session.
    Rename(String),
    /// Delete a session by id, or the open one.
    Delete(Option<String>),
    /// Unknown command or missing argument.
    Unknown(String),
}

/// Parse user input as a slash command.
///
/// Returns `None` if the input doesn't start with `/`.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (cmd, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd.to_lowercase(), arg.trim()),
        None => (trimmed.to_lowercase(), ""),
    };

    let command = match cmd.as_str() {
        "/help" | "/h" | "/?" => ChatCommand::Help,
        "/clear" | "/cls" => ChatCommand::Clear,
        "/exit" | "/quit" | "/q" => ChatCommand::Exit,
        "/new" => ChatCommand::New,
        "/history" | "/sessions" => ChatCommand::History,
        "/latest" => ChatCommand::Latest,
        "/resume" if arg.is_empty() => {
            ChatCommand::Unknown("/resume requires a session id".to_string())
        }
        "/resume" => ChatCommand::Resume(arg.to_string()),
        "/rename" if arg.is_empty() => {
            ChatCommand::Unknown("/rename requires a title".to_string())
        }
        "/rename" => ChatCommand::Rename(arg.to_string()),
        "/delete" => ChatCommand::Delete((!arg.is_empty()).then(|| arg.to_string())),
        other => ChatCommand::Unknown(other.to_string()),
    };
    Some(command)
}

/// Help text listing all available commands.
pub fn help_text() -> String {
    let rows = [
        ("/help", "Show this help message"),
        ("/history", "List past sessions of this topic"),
        ("/resume <id>", "Switch to a past session"),
        ("/latest", "Go back to the latest session"),
        ("/new", "Start a new conversation"),
        ("/rename <title>", "Retitle this session"),
        ("/delete [id]", "Delete a session (default: this one)"),
        ("/clear", "Clear the screen"),
        ("/exit", "Leave the chat"),
    ];

    let mut out = format!("\n  {}\n\n", style("Available commands:").bold());
    for (cmd, desc) in rows {
        out.push_str(&format!("  {:<16} {desc}\n", style(cmd).cyan()));
    }
    out.push_str(&format!(
        "\n  {}\n",
        style("Ctrl+D to exit. Your session is remembered for the next chat.").dim()
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_help() {
        assert_eq!(parse("/help"), Some(ChatCommand::Help));
        assert_eq!(parse("/h"), Some(ChatCommand::Help));
        assert_eq!(parse("/?"), Some(ChatCommand::Help));
    }

    #[test]
    fn test_parse_exit() {
        assert_eq!(parse("/exit"), Some(ChatCommand::Exit));
        assert_eq!(parse("/quit"), Some(ChatCommand::Exit));
        assert_eq!(parse("/Q"), Some(ChatCommand::Exit));
    }

    #[test]
    fn test_parse_session_commands() {
        assert_eq!(parse("/new"), Some(ChatCommand::New));
        assert_eq!(parse("/history"), Some(ChatCommand::History));
        assert_eq!(parse("/latest"), Some(ChatCommand::Latest));
        assert_eq!(
            parse("/resume   42 "),
            Some(ChatCommand::Resume("42".to_string()))
        );
    }

    #[test]
    fn test_resume_requires_id() {
        assert!(matches!(parse("/resume"), Some(ChatCommand::Unknown(_))));
        assert!(matches!(parse("/resume   "), Some(ChatCommand::Unknown(_))));
    }

    #[test]
    fn test_parse_rename_keeps_title_spacing() {
        assert_eq!(
            parse("/rename  Cell   biology "),
            Some(ChatCommand::Rename("Cell   biology".to_string()))
        );
        assert!(matches!(parse("/rename"), Some(ChatCommand::Unknown(_))));
    }

    #[test]
    fn test_parse_delete_with_optional_id() {
        assert_eq!(parse("/delete"), Some(ChatCommand::Delete(None)));
        assert_eq!(
            parse("/DELETE 42"),
            Some(ChatCommand::Delete(Some("42".to_string())))
        );
    }

    #[test]
    fn test_unknown_and_plain_text() {
        assert_eq!(
            parse("/teleport"),
            Some(ChatCommand::Unknown("/teleport".to_string()))
        );
        assert_eq!(parse("what is osmosis?"), None);
        assert_eq!(parse("  "), None);
    }

    #[test]
    fn test_help_mentions_every_command() {
        let help = help_text();
        for cmd in [
            "/help", "/history", "/resume", "/latest", "/new", "/rename", "/delete", "/clear",
            "/exit",
        ] {
            assert!(help.contains(cmd), "missing {cmd}");
        }
    }
}
