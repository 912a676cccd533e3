//! Console command parsing.

use std::fmt;

/// Help shown at startup and on `help`.
pub const HELP_TEXT: &str = "\
Commands:
  restart, r   regenerate and restart all services
  status, s    show service status
  help, h, ?   show this help
  quit, q      stop all services and exit
";

/// A recognized console command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Restart,
    Status,
    Help,
    Quit,
}

impl ConsoleCommand {
    /// Parse one trimmed, case-insensitive word.
    #[must_use]
    pub fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "restart" | "r" => Some(Self::Restart),
            "status" | "s" => Some(Self::Status),
            "help" | "h" | "?" => Some(Self::Help),
            "quit" | "q" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

impl fmt::Display for ConsoleCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Restart => "restart",
            Self::Status => "status",
            Self::Help => "help",
            Self::Quit => "quit",
        })
    }
}

/// One line of console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    Empty,
    Command(ConsoleCommand),
    Unknown(String),
}

/// Classify a raw input line.
#[must_use]
pub fn parse_line(line: &str) -> ConsoleInput {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ConsoleInput::Empty;
    }
    ConsoleCommand::parse(trimmed).map_or_else(
        || ConsoleInput::Unknown(trimmed.to_string()),
        ConsoleInput::Command,
    )
}
