//! UI commands typed at the console and their parsing.

use client_core::FailPoint;
use shared::domain::PersonField;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    List,
    Create,
    Set { field: PersonField, value: String },
    Escape,
    Select { row: usize },
    Delete,
    Search { text: String },
    Sort,
    Save,
    Reset,
    Refresh,
    ResetSource,
    Technical { message: String },
    Dismiss,
    Fail { point: FailPoint, message: String },
    State,
    Help,
    Quit,
}

impl UiCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Create => "create",
            Self::Set { .. } => "set",
            Self::Escape => "escape",
            Self::Select { .. } => "select",
            Self::Delete => "delete",
            Self::Search { .. } => "search",
            Self::Sort => "sort",
            Self::Save => "save",
            Self::Reset => "reset",
            Self::Refresh => "refresh",
            Self::ResetSource => "reset-source",
            Self::Technical { .. } => "technical",
            Self::Dismiss => "dismiss",
            Self::Fail { .. } => "fail",
            Self::State => "state",
            Self::Help => "help",
            Self::Quit => "quit",
        }
    }
}

pub const HELP: &str = "\
commands:
  list                      show the rows in display order
  create                    append a blank row
  set <field> <value>       edit the selected row (UserName, FirstName, LastName, Age)
  escape                    cancel the current edit
  select <n>                select row n (1-based) and open the detail pane
  delete                    delete the selected row immediately
  search <text>             filter on last name; no text clears the filter
  sort                      cycle none / ascending / descending
  save                      submit the pending batch
  reset                     discard pending changes
  refresh                   reload the list (only without pending changes)
  reset-source              restore the service's seed data
  technical <text>          push a technical message from the service
  dismiss                   close the open error alert
  fail <op> <message>       fail the next submit|delete|refresh|reset-source
  state                     print the view state
  quit";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command '{0}'; type 'help'")]
    Unknown(String),
    #[error("'{command}' needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    #[error("unknown field '{0}'")]
    InvalidField(String),
    #[error("'{0}' is not a row number")]
    InvalidRow(String),
    #[error("unknown failure point '{0}'")]
    InvalidFailPoint(String),
}

/// Parses one input line. Blank lines and `#` comments yield `None`.
pub fn parse_command(line: &str) -> Result<Option<UiCommand>, CommandError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "list" | "ls" => UiCommand::List,
        "create" | "new" => UiCommand::Create,
        "set" => {
            let (field, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            if field.is_empty() {
                return Err(CommandError::MissingArgument {
                    command: "set",
                    argument: "a field name",
                });
            }
            let field = PersonField::parse(field)
                .ok_or_else(|| CommandError::InvalidField(field.to_string()))?;
            UiCommand::Set {
                field,
                value: value.trim().to_string(),
            }
        }
        "escape" | "esc" => UiCommand::Escape,
        "select" => {
            if rest.is_empty() {
                return Err(CommandError::MissingArgument {
                    command: "select",
                    argument: "a row number",
                });
            }
            let row = rest
                .parse::<usize>()
                .ok()
                .filter(|row| *row > 0)
                .ok_or_else(|| CommandError::InvalidRow(rest.to_string()))?;
            UiCommand::Select { row }
        }
        "delete" | "rm" => UiCommand::Delete,
        "search" => UiCommand::Search {
            text: rest.to_string(),
        },
        "sort" => UiCommand::Sort,
        "save" => UiCommand::Save,
        "reset" => UiCommand::Reset,
        "refresh" => UiCommand::Refresh,
        "reset-source" => UiCommand::ResetSource,
        "technical" => {
            if rest.is_empty() {
                return Err(CommandError::MissingArgument {
                    command: "technical",
                    argument: "a message",
                });
            }
            UiCommand::Technical {
                message: rest.to_string(),
            }
        }
        "dismiss" | "close" => UiCommand::Dismiss,
        "fail" => {
            let (point, message) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let point = match point {
                "submit" | "save" => FailPoint::Submit,
                "delete" => FailPoint::Delete,
                "refresh" => FailPoint::Refresh,
                "reset-source" => FailPoint::ResetSource,
                "" => {
                    return Err(CommandError::MissingArgument {
                        command: "fail",
                        argument: "an operation",
                    })
                }
                other => return Err(CommandError::InvalidFailPoint(other.to_string())),
            };
            let message = match message.trim() {
                "" => "Simulated service failure".to_string(),
                text => text.to_string(),
            };
            UiCommand::Fail { point, message }
        }
        "state" => UiCommand::State,
        "help" | "?" => UiCommand::Help,
        "quit" | "exit" => UiCommand::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

#[cfg(test)]
#[path = "../tests/events_tests.rs"]
mod tests;
