//! Console command language.

use std::str::FromStr;

use leftwatch_core::types::EventId;
use leftwatch_core::StatusFilter;

/// Usage text printed by `help` and after an unknown command.
pub const HELP: &str = "\
Commands:
  tab <all|new|confirmed|dismissed>  switch the status filter
  confirm <id>                       mark an event confirmed
  dismiss <id>                       mark an event dismissed
  open <id>                          show event details
  close                              close the detail view
  refresh                            reload the event list
  reconnect                          reconnect the live stream
  show                               redraw the panels
  help                               show this help
  quit                               exit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Tab(StatusFilter),
    Confirm(EventId),
    Dismiss(EventId),
    Open(EventId),
    Close,
    Refresh,
    Reconnect,
    Show,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command '{0}'")]
    Unknown(String),

    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),

    #[error("'{command}' takes one argument, got '{extra}'")]
    UnexpectedArgument { command: &'static str, extra: String },

    #[error("Invalid event id '{0}'")]
    InvalidId(String),

    #[error("Unknown tab '{0}'")]
    InvalidTab(String),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let name = words.next().ok_or(CommandError::Empty)?.to_ascii_lowercase();
        let arg = words.next();
        if let Some(extra) = words.next() {
            return Err(CommandError::UnexpectedArgument {
                command: command_name(&name),
                extra: extra.to_string(),
            });
        }

        let command = match name.as_str() {
            "tab" => {
                let value = arg.ok_or(CommandError::MissingArgument("tab"))?;
                let filter = value
                    .to_ascii_lowercase()
                    .parse::<StatusFilter>()
                    .map_err(|_| CommandError::InvalidTab(value.to_string()))?;
                return Ok(Command::Tab(filter));
            }
            "confirm" => return Ok(Command::Confirm(event_id("confirm", arg)?)),
            "dismiss" => return Ok(Command::Dismiss(event_id("dismiss", arg)?)),
            "open" => return Ok(Command::Open(event_id("open", arg)?)),
            "close" => Command::Close,
            "refresh" => Command::Refresh,
            "reconnect" => Command::Reconnect,
            "show" => Command::Show,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            _ => return Err(CommandError::Unknown(name)),
        };

        if let Some(extra) = arg {
            return Err(CommandError::UnexpectedArgument {
                command: command_name(&name),
                extra: extra.to_string(),
            });
        }
        Ok(command)
    }
}

fn event_id(command: &'static str, arg: Option<&str>) -> Result<EventId, CommandError> {
    let raw = arg.ok_or(CommandError::MissingArgument(command))?;
    raw.trim_start_matches('#')
        .parse()
        .map_err(|_| CommandError::InvalidId(raw.to_string()))
}

/// Static name for error messages.
fn command_name(name: &str) -> &'static str {
    match name {
        "tab" => "tab",
        "confirm" => "confirm",
        "dismiss" => "dismiss",
        "open" => "open",
        "close" => "close",
        "refresh" => "refresh",
        "reconnect" => "reconnect",
        "show" => "show",
        "help" | "?" => "help",
        "quit" | "exit" => "quit",
        _ => "command",
    }
}
