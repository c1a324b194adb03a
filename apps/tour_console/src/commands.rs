use shared::domain::{LocationId, TourId};
use thiserror::Error;

pub const HELP: &str = "\
commands:
  tours                 list tours
  select <id>           load a tour (-1 clears the selection)
  create <name>         create a tour and select it
  delete                delete the selected tour
  search <query>        geocode a place
  add <n>               add search result n to the selected tour
  close                 dismiss search results
  remove <location id>  detach a location from the selected tour
  show                  print the selected tour
  route                 plan a round trip through the selected tour
  help                  show this text
  quit                  exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Tours,
    Select(TourId),
    Create(String),
    Delete,
    Search(String),
    Add(usize),
    Close,
    Remove(LocationId),
    Show,
    Route,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}` (try `help`)")]
    Unknown(String),
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
    #[error("`{command}` expects a number, got `{value}`")]
    BadNumber { command: &'static str, value: String },
}

pub fn parse(line: &str) -> Result<Command, ParseError> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word {
        "" => Err(ParseError::Empty),
        "tours" | "ls" => Ok(Command::Tours),
        "select" => number("select", rest).map(|id| Command::Select(TourId(id))),
        "create" => text("create", rest).map(Command::Create),
        "delete" => Ok(Command::Delete),
        "search" => text("search", rest).map(Command::Search),
        "add" => number("add", rest).and_then(|n| {
            usize::try_from(n).map(Command::Add).map_err(|_| ParseError::BadNumber {
                command: "add",
                value: rest.to_string(),
            })
        }),
        "close" => Ok(Command::Close),
        "remove" => number("remove", rest).map(|id| Command::Remove(LocationId(id))),
        "show" => Ok(Command::Show),
        "route" => Ok(Command::Route),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(ParseError::Unknown(other.to_string())),
    }
}

fn text(command: &'static str, rest: &str) -> Result<String, ParseError> {
    if rest.is_empty() {
        return Err(ParseError::MissingArgument(command));
    }
    Ok(rest.to_string())
}

fn number(command: &'static str, rest: &str) -> Result<i64, ParseError> {
    if rest.is_empty() {
        return Err(ParseError::MissingArgument(command));
    }
    rest.parse().map_err(|_| ParseError::BadNumber {
        command,
        value: rest.to_string(),
    })
}

#[cfg(test)]
#[path = "tests/commands_tests.rs"]
mod tests;
