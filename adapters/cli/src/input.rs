//! Line-oriented player input.

use std::{str::FromStr, time::Duration};

use gridmerge_core::{CellId, Direction, LatLng};
use thiserror::Error;

/// Usage text printed by the `help` action.
pub const HELP: &str = "\
n | s | e | w          step one cell north, south, east, or west
goto <lat> <lng>       jump to an absolute position
follow                 apply the next fix from the live position feed
tap <di> <dj>          interact with the cell offset from yours (north, east)
click <i> <j>          interact with an absolute cell
wait <ms>              let time pass for notices
status                 show position, inventory, and counters
export                 print the session as a transfer string
import <string>        replace the session with a transfer string
reset                  erase all progress
help                   show this text
quit                   leave the game";

/// Action requested by a single input line.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// Step one cell.
    Step(Direction),
    /// Jump to an absolute position.
    Goto(LatLng),
    /// Apply the next live position fix.
    Follow,
    /// Interact relative to the player's cell.
    Tap {
        /// Rows north of the player.
        di: i32,
        /// Columns east of the player.
        dj: i32,
    },
    /// Interact with an absolute cell.
    Click(CellId),
    /// Let time pass.
    Wait(Duration),
    /// Print the status summary.
    Status,
    /// Print the transfer string.
    Export,
    /// Install a transfer string.
    Import(String),
    /// Erase all progress.
    Reset,
    /// Print usage.
    Help,
    /// Leave the game.
    Quit,
}

/// Errors raised while parsing an input line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    /// The line contained no command.
    #[error("enter a command, or 'help'")]
    Empty,
    /// The command word is unknown.
    #[error("unknown command '{0}'")]
    Unknown(String),
    /// The command was missing an argument.
    #[error("'{command}' expects {expected}")]
    MissingArgument {
        /// Command word.
        command: &'static str,
        /// Description of the expected arguments.
        expected: &'static str,
    },
    /// An argument could not be parsed.
    #[error("could not parse '{0}'")]
    InvalidArgument(String),
}

impl FromStr for Action {
    type Err = InputError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = words.next().ok_or(InputError::Empty)?.to_ascii_lowercase();

        let action = match command.as_str() {
            "n" | "north" => Self::Step(Direction::North),
            "s" | "south" => Self::Step(Direction::South),
            "e" | "east" => Self::Step(Direction::East),
            "w" | "west" => Self::Step(Direction::West),
            "goto" => {
                let (lat, lng) = pair(&mut words, "goto", "<lat> <lng>")?;
                let position = LatLng::new(lat, lng);
                if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
                    return Err(InputError::InvalidArgument(format!("{lat} {lng}")));
                }
                Self::Goto(position)
            }
            "follow" => Self::Follow,
            "tap" => {
                let (di, dj) = pair(&mut words, "tap", "<di> <dj>")?;
                Self::Tap { di, dj }
            }
            "click" => {
                let (i, j) = pair(&mut words, "click", "<i> <j>")?;
                Self::Click(CellId::new(i, j))
            }
            "wait" => {
                let millis: u64 = argument(&mut words, "wait", "<ms>")?;
                Self::Wait(Duration::from_millis(millis))
            }
            "status" => Self::Status,
            "export" => Self::Export,
            "import" => {
                let payload = words.next().ok_or(InputError::MissingArgument {
                    command: "import",
                    expected: "<string>",
                })?;
                Self::Import(payload.to_owned())
            }
            "reset" => Self::Reset,
            "help" | "?" => Self::Help,
            "quit" | "q" | "exit" => Self::Quit,
            _ => return Err(InputError::Unknown(command)),
        };

        match words.next() {
            Some(extra) => Err(InputError::InvalidArgument(extra.to_owned())),
            None => Ok(action),
        }
    }
}

fn argument<'a, T: FromStr>(
    words: &mut impl Iterator<Item = &'a str>,
    command: &'static str,
    expected: &'static str,
) -> Result<T, InputError> {
    let word = words
        .next()
        .ok_or(InputError::MissingArgument { command, expected })?;
    word.parse()
        .map_err(|_| InputError::InvalidArgument(word.to_owned()))
}

fn pair<'a, T: FromStr>(
    words: &mut impl Iterator<Item = &'a str>,
    command: &'static str,
    expected: &'static str,
) -> Result<(T, T), InputError> {
    Ok((
        argument(words, command, expected)?,
        argument(words, command, expected)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_steps_in_any_case() {
        assert_eq!("N".parse(), Ok(Action::Step(Direction::North)));
        assert_eq!(" west ".parse(), Ok(Action::Step(Direction::West)));
    }

    #[test]
    fn parses_positional_commands() {
        assert_eq!(
            "goto 36.9979 -122.0570".parse(),
            Ok(Action::Goto(LatLng::new(36.9979, -122.0570)))
        );
        assert_eq!("tap -1 2".parse(), Ok(Action::Tap { di: -1, dj: 2 }));
        assert_eq!(
            "click 369979 -1220571".parse(),
            Ok(Action::Click(CellId::new(369_979, -1_220_571)))
        );
        assert_eq!(
            "wait 1500".parse(),
            Ok(Action::Wait(Duration::from_millis(1500)))
        );
    }

    #[test]
    fn import_keeps_payload_verbatim() {
        assert_eq!(
            "import gridmerge:eyJ9".parse(),
            Ok(Action::Import("gridmerge:eyJ9".into()))
        );
    }

    #[test]
    fn reports_malformed_lines() {
        assert_eq!("".parse::<Action>(), Err(InputError::Empty));
        assert_eq!(
            "jump".parse::<Action>(),
            Err(InputError::Unknown("jump".into()))
        );
        assert_eq!(
            "tap 1".parse::<Action>(),
            Err(InputError::MissingArgument {
                command: "tap",
                expected: "<di> <dj>",
            })
        );
        assert_eq!(
            "click a b".parse::<Action>(),
            Err(InputError::InvalidArgument("a".into()))
        );
        assert_eq!(
            "n 3".parse::<Action>(),
            Err(InputError::InvalidArgument("3".into()))
        );
        assert!(matches!(
            "goto NaN 0".parse::<Action>(),
            Err(InputError::InvalidArgument(_))
        ));
    }

    #[test]
    fn goto_rejects_positions_off_the_globe() {
        for line in ["goto 90.5 0", "goto -91 10", "goto 10 180.01", "goto 0 -200", "goto 0 inf"] {
            assert!(
                matches!(line.parse::<Action>(), Err(InputError::InvalidArgument(_))),
                "{line} should be rejected"
            );
        }
        assert_eq!(
            "goto -90 180".parse(),
            Ok(Action::Goto(LatLng::new(-90.0, 180.0)))
        );
    }
}
