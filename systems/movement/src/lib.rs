#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Movement system that normalizes every input source into player moves.
//!
//! Manual cardinal steps and live position fixes are both expressed as
//! [`MovementInput`] values. The [`Movement`] system turns them into
//! [`Command::MovePlayer`], so the world never learns which source moved the
//! player.

use std::{
    collections::VecDeque,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use gridmerge_core::{Command, Direction, LatLng};
use thiserror::Error;
use tracing::{debug, warn};

/// Discrete movement request produced by any position source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MovementInput {
    /// A single cell step in a cardinal direction.
    Step(Direction),
    /// An absolute position fix in degrees.
    Fix(LatLng),
}

/// Capability shared by every source of player movement.
pub trait PositionSource {
    /// Returns the next pending movement request, if one is available.
    fn poll(&mut self) -> Option<MovementInput>;

    /// Reports whether the source delivers live absolute positions.
    fn is_live(&self) -> bool;
}

/// Errors raised while acquiring a position source.
#[derive(Debug, Error)]
pub enum PositionSourceError {
    /// The device or feed cannot supply live position updates.
    #[error("live position updates are unavailable: {reason}")]
    Unsupported {
        /// Human-readable reason reported by the source.
        reason: String,
    },
    /// A fix could not be parsed.
    #[error("malformed position fix on line {line}: {text:?}")]
    MalformedFix {
        /// One-based line number of the malformed fix.
        line: usize,
        /// Offending text.
        text: String,
    },
}

/// Source fed by keyboard or button presses.
#[derive(Debug, Default)]
pub struct ManualSteps {
    pending: VecDeque<Direction>,
}

impl ManualSteps {
    /// Creates a source without pending presses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a directional press.
    pub fn press(&mut self, direction: Direction) {
        self.pending.push_back(direction);
    }
}

impl PositionSource for ManualSteps {
    fn poll(&mut self) -> Option<MovementInput> {
        self.pending.pop_front().map(MovementInput::Step)
    }

    fn is_live(&self) -> bool {
        false
    }
}

/// Source replaying a sequence of absolute geolocation fixes.
#[derive(Debug, Default)]
pub struct FixFeed {
    fixes: VecDeque<LatLng>,
}

impl FixFeed {
    /// Creates a feed from already-parsed fixes.
    #[must_use]
    pub fn new(fixes: impl IntoIterator<Item = LatLng>) -> Self {
        Self {
            fixes: fixes.into_iter().collect(),
        }
    }

    /// Opens a feed file containing one `lat,lng` fix per line.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PositionSourceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|error| PositionSourceError::Unsupported {
            reason: format!("cannot open {}: {error}", path.display()),
        })?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parses fixes from a reader; blank lines and `#` comments are skipped.
    pub fn from_reader(reader: impl BufRead) -> Result<Self, PositionSourceError> {
        let mut fixes = VecDeque::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|error| PositionSourceError::Unsupported {
                reason: error.to_string(),
            })?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let fix = parse_fix(trimmed).ok_or_else(|| PositionSourceError::MalformedFix {
                line: index + 1,
                text: trimmed.to_owned(),
            })?;
            fixes.push_back(fix);
        }
        debug!(fixes = fixes.len(), "loaded position feed");
        Ok(Self { fixes })
    }

    /// Number of fixes not yet delivered.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.fixes.len()
    }
}

impl PositionSource for FixFeed {
    fn poll(&mut self) -> Option<MovementInput> {
        self.fixes.pop_front().map(MovementInput::Fix)
    }

    fn is_live(&self) -> bool {
        true
    }
}

/// Source selected for a session: live when available, manual otherwise.
#[derive(Debug)]
pub enum ActiveSource {
    /// Live absolute fixes.
    Live(FixFeed),
    /// Manual cardinal steps.
    Manual(ManualSteps),
}

impl ActiveSource {
    /// Picks the live feed when it was acquired, falling back to manual steps.
    ///
    /// The acquisition error is handed back so callers can surface a notice.
    pub fn live_or_manual(
        feed: Result<FixFeed, PositionSourceError>,
    ) -> (Self, Option<PositionSourceError>) {
        match feed {
            Ok(feed) => (Self::Live(feed), None),
            Err(error) => {
                warn!(%error, "falling back to manual movement");
                (Self::Manual(ManualSteps::new()), Some(error))
            }
        }
    }
}

impl Default for ActiveSource {
    fn default() -> Self {
        Self::Manual(ManualSteps::new())
    }
}

impl PositionSource for ActiveSource {
    fn poll(&mut self) -> Option<MovementInput> {
        match self {
            Self::Live(feed) => feed.poll(),
            Self::Manual(steps) => steps.poll(),
        }
    }

    fn is_live(&self) -> bool {
        matches!(self, Self::Live(_))
    }
}

/// Pure system that converts movement inputs into world commands.
#[derive(Debug, Default)]
pub struct Movement;

impl Movement {
    /// Creates a new movement system.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Emits one [`Command::MovePlayer`] per input.
    ///
    /// Steps are applied relative to the position produced by the previous
    /// input in the same batch, starting from `current`.
    pub fn handle(&self, inputs: &[MovementInput], current: LatLng, out: &mut Vec<Command>) {
        let mut position = current;
        for input in inputs {
            position = match *input {
                MovementInput::Step(direction) => {
                    let (lat_cells, lng_cells) = direction.offset();
                    position.offset_by_cells(lat_cells, lng_cells)
                }
                MovementInput::Fix(fix) => fix,
            };
            out.push(Command::MovePlayer { position });
        }
    }

    /// Drains every pending input from the source and emits the matching commands.
    pub fn drain<S>(&self, source: &mut S, current: LatLng, out: &mut Vec<Command>)
    where
        S: PositionSource + ?Sized,
    {
        let mut inputs = Vec::new();
        while let Some(input) = source.poll() {
            inputs.push(input);
        }
        self.handle(&inputs, current, out);
    }
}

fn parse_fix(text: &str) -> Option<LatLng> {
    let (lat, lng) = text.split_once(',')?;
    let fix = LatLng::new(lat.trim().parse().ok()?, lng.trim().parse().ok()?);
    fix.is_finite().then_some(fix)
}
