use std::fmt;
use std::str::FromStr;

/// One line typed at the prompt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Train(f32),
    Skip,
    Predict,
    Help,
    Quit,
    /// Blank line; nothing to do.
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandError {
    MissingRating,
    InvalidRating(String),
    Unknown(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::MissingRating => write!(f, "train needs a rating, e.g. `train 7.5`"),
            CommandError::InvalidRating(raw) => write!(f, "`{raw}` is not a number"),
            CommandError::Unknown(raw) => write!(f, "unknown command `{raw}`, try `help`"),
        }
    }
}

impl std::error::Error for CommandError {}

fn parse_rating(raw: &str) -> Result<f32, CommandError> {
    raw.parse::<f32>()
        .map_err(|_| CommandError::InvalidRating(raw.to_string()))
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let Some(head) = parts.next() else {
            return Ok(Command::Empty);
        };
        let arg = parts.next();
        if let Some(extra) = parts.next() {
            return Err(CommandError::Unknown(format!("{head} ... {extra}")));
        }

        match (head.to_ascii_lowercase().as_str(), arg) {
            ("train" | "t", Some(raw)) => parse_rating(raw).map(Command::Train),
            ("train" | "t", None) => Err(CommandError::MissingRating),
            ("skip" | "s", None) => Ok(Command::Skip),
            ("predict" | "p", None) => Ok(Command::Predict),
            ("help" | "h" | "?", None) => Ok(Command::Help),
            ("quit" | "q" | "exit", None) => Ok(Command::Quit),
            (_, None) if head.parse::<f32>().is_ok() => parse_rating(head).map(Command::Train),
            _ => Err(CommandError::Unknown(line.trim().to_string())),
        }
    }
}

pub const HELP: &str = "\
commands:
  <rating>, train <rating>, t <rating>   rate the current color and learn from it
  skip, s                               show another color without training
  predict, p                            show the model's rating for this color
  help, h, ?                            this message
  quit, q                               save and exit (also Ctrl-D)";
