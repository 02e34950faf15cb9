#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Gridmerge engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically.
//!
//! The grid is anchored at a fixed global origin: a [`CellId`] is derived from
//! a continuous [`LatLng`] by flooring each axis in [`TILE_DEGREES`] steps, so
//! the same position maps to the same cell in every session.

use std::{collections::BTreeSet, fmt, iter::FusedIterator};

use serde::{Deserialize, Serialize};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Gridmerge.";

/// Edge length of a single cell measured in degrees of latitude and longitude.
pub const TILE_DEGREES: f64 = 1e-4;

/// Fixed global origin every cell index is measured from.
pub const ORIGIN: LatLng = LatLng::new(0.0, 0.0);

/// Position the player starts from when no snapshot exists.
pub const DEFAULT_START: LatLng = LatLng::new(36.989_493_795_784_01, -122.062_771_285_485_04);

/// Largest Chebyshev distance at which a cell can be interacted with.
pub const INTERACTION_RADIUS: u32 = 3;

/// Probability that an unmodified cell naturally holds a token.
pub const SPAWN_PROBABILITY: f64 = 0.3;

/// Token values a cell may naturally hold.
pub const NATURAL_TOKENS: [Token; 3] = [Token(1), Token(2), Token(4)];

/// Token value whose creation through a merge raises a celebration.
pub const MILESTONE_TOKEN: Token = Token(128);

/// Highest token value the game recognises.
pub const MAX_TOKEN: Token = Token(128);

/// Continuous geographic position measured in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude in degrees, positive towards the north.
    pub lat: f64,
    /// Longitude in degrees, positive towards the east.
    pub lng: f64,
}

impl LatLng {
    /// Creates a new position from latitude and longitude in degrees.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns the position shifted by a whole number of cells along each axis.
    #[must_use]
    pub fn offset_by_cells(self, lat_cells: i32, lng_cells: i32) -> Self {
        Self {
            lat: self.lat + f64::from(lat_cells) * TILE_DEGREES,
            lng: self.lng + f64::from(lng_cells) * TILE_DEGREES,
        }
    }

    /// Reports whether both components are finite numbers.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}

/// Axis-aligned rectangle expressed in continuous degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    south_west: LatLng,
    north_east: LatLng,
}

impl GeoBounds {
    /// Creates bounds spanning the two provided corners in any order.
    #[must_use]
    pub fn new(corner: LatLng, opposite: LatLng) -> Self {
        Self {
            south_west: LatLng::new(corner.lat.min(opposite.lat), corner.lng.min(opposite.lng)),
            north_east: LatLng::new(corner.lat.max(opposite.lat), corner.lng.max(opposite.lng)),
        }
    }

    /// Creates bounds centred on `center` extending `half_extent` cells in every direction.
    #[must_use]
    pub fn around(center: LatLng, half_extent: u32) -> Self {
        let cells = i32::try_from(half_extent).unwrap_or(i32::MAX);
        Self::new(
            center.offset_by_cells(-cells, -cells),
            center.offset_by_cells(cells, cells),
        )
    }

    /// South-western corner of the bounds.
    #[must_use]
    pub const fn south_west(&self) -> LatLng {
        self.south_west
    }

    /// North-eastern corner of the bounds.
    #[must_use]
    pub const fn north_east(&self) -> LatLng {
        self.north_east
    }

    /// Midpoint of the bounds.
    #[must_use]
    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south_west.lat + self.north_east.lat) / 2.0,
            (self.south_west.lng + self.north_east.lng) / 2.0,
        )
    }

    /// Reports whether the position lies inside the bounds, edges included.
    #[must_use]
    pub fn contains(&self, position: LatLng) -> bool {
        position.lat >= self.south_west.lat
            && position.lat <= self.north_east.lat
            && position.lng >= self.south_west.lng
            && position.lng <= self.north_east.lng
    }
}

/// Identifier of a single grid cell measured in whole steps from [`ORIGIN`].
///
/// `i` indexes latitude bands and `j` indexes longitude bands. A cell has no
/// identity beyond this pair; its state is always looked up by key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId {
    i: i32,
    j: i32,
}

impl CellId {
    /// Creates a new cell identifier.
    #[must_use]
    pub const fn new(i: i32, j: i32) -> Self {
        Self { i, j }
    }

    /// Latitude band index of the cell.
    #[must_use]
    pub const fn i(&self) -> i32 {
        self.i
    }

    /// Longitude band index of the cell.
    #[must_use]
    pub const fn j(&self) -> i32 {
        self.j
    }

    /// Returns the cell containing the provided position.
    #[must_use]
    pub fn containing(position: LatLng) -> Self {
        Self {
            i: ((position.lat - ORIGIN.lat) / TILE_DEGREES).floor() as i32,
            j: ((position.lng - ORIGIN.lng) / TILE_DEGREES).floor() as i32,
        }
    }

    /// Continuous bounds covered by the cell.
    #[must_use]
    pub fn bounds(&self) -> GeoBounds {
        GeoBounds {
            south_west: LatLng::new(
                ORIGIN.lat + f64::from(self.i) * TILE_DEGREES,
                ORIGIN.lng + f64::from(self.j) * TILE_DEGREES,
            ),
            north_east: LatLng::new(
                ORIGIN.lat + (f64::from(self.i) + 1.0) * TILE_DEGREES,
                ORIGIN.lng + (f64::from(self.j) + 1.0) * TILE_DEGREES,
            ),
        }
    }

    /// Midpoint of the cell's bounds.
    #[must_use]
    pub fn center(&self) -> LatLng {
        self.bounds().center()
    }

    /// Returns the neighbouring cell in the provided direction.
    #[must_use]
    pub fn step(self, direction: Direction) -> Self {
        let (di, dj) = direction.offset();
        Self {
            i: self.i.saturating_add(di),
            j: self.j.saturating_add(dj),
        }
    }

    /// Computes the Chebyshev distance between two cells.
    #[must_use]
    pub fn chebyshev_distance(self, other: CellId) -> u32 {
        self.i.abs_diff(other.i).max(self.j.abs_diff(other.j))
    }

    /// Reports whether `other` lies within [`INTERACTION_RADIUS`] of this cell.
    #[must_use]
    pub fn within_reach(self, other: CellId) -> bool {
        self.chebyshev_distance(other) <= INTERACTION_RADIUS
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.i, self.j)
    }
}

/// Inclusive rectangle of cells expressed in [`CellId`] space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellRegion {
    min: CellId,
    max: CellId,
}

impl CellRegion {
    /// Creates the smallest region containing both cells.
    #[must_use]
    pub fn spanning(corner: CellId, opposite: CellId) -> Self {
        Self {
            min: CellId::new(corner.i.min(opposite.i), corner.j.min(opposite.j)),
            max: CellId::new(corner.i.max(opposite.i), corner.j.max(opposite.j)),
        }
    }

    /// Region of cells touched by the provided continuous bounds.
    #[must_use]
    pub fn covering(bounds: GeoBounds) -> Self {
        Self::spanning(
            CellId::containing(bounds.south_west()),
            CellId::containing(bounds.north_east()),
        )
    }

    /// Returns the region grown by `margin` cells on every side.
    #[must_use]
    pub fn expanded(self, margin: u32) -> Self {
        let margin = i32::try_from(margin).unwrap_or(i32::MAX);
        Self {
            min: CellId::new(
                self.min.i.saturating_sub(margin),
                self.min.j.saturating_sub(margin),
            ),
            max: CellId::new(
                self.max.i.saturating_add(margin),
                self.max.j.saturating_add(margin),
            ),
        }
    }

    /// Cell with the lowest indices in the region.
    #[must_use]
    pub const fn min(&self) -> CellId {
        self.min
    }

    /// Cell with the highest indices in the region.
    #[must_use]
    pub const fn max(&self) -> CellId {
        self.max
    }

    /// Number of latitude bands covered by the region.
    #[must_use]
    pub fn rows(&self) -> u32 {
        self.max.i.abs_diff(self.min.i).saturating_add(1)
    }

    /// Number of longitude bands covered by the region.
    #[must_use]
    pub fn columns(&self) -> u32 {
        self.max.j.abs_diff(self.min.j).saturating_add(1)
    }

    /// Total number of cells contained in the region.
    #[must_use]
    pub fn len(&self) -> u64 {
        u64::from(self.rows()) * u64::from(self.columns())
    }

    /// Regions always contain at least one cell.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Reports whether the cell lies inside the region.
    #[must_use]
    pub fn contains(&self, cell: CellId) -> bool {
        cell.i >= self.min.i && cell.i <= self.max.i && cell.j >= self.min.j && cell.j <= self.max.j
    }

    /// Iterates the region's cells row by row in ascending order.
    #[must_use]
    pub fn iter(&self) -> CellRegionIter {
        CellRegionIter {
            region: *self,
            next: Some(self.min),
        }
    }
}

impl IntoIterator for CellRegion {
    type Item = CellId;
    type IntoIter = CellRegionIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the cells of a [`CellRegion`].
#[derive(Clone, Debug)]
pub struct CellRegionIter {
    region: CellRegion,
    next: Option<CellId>,
}

impl Iterator for CellRegionIter {
    type Item = CellId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = if current.j < self.region.max.j {
            Some(CellId::new(current.i, current.j + 1))
        } else if current.i < self.region.max.i {
            Some(CellId::new(current.i + 1, self.region.min.j))
        } else {
            None
        };
        Some(current)
    }
}

impl FusedIterator for CellRegionIter {}

/// Cardinal directions used for manual movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Towards increasing latitude.
    North,
    /// Towards increasing longitude.
    East,
    /// Towards decreasing latitude.
    South,
    /// Towards decreasing longitude.
    West,
}

impl Direction {
    /// Offset in `(i, j)` cell space produced by a single step.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::North => (1, 0),
            Self::East => (0, 1),
            Self::South => (-1, 0),
            Self::West => (0, -1),
        }
    }
}

/// Mergeable numeric token: a power of two between 1 and [`MAX_TOKEN`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Token(u32);

impl Token {
    /// Creates a token, rejecting values outside the recognised set.
    #[must_use]
    pub const fn new(value: u32) -> Option<Self> {
        if value.is_power_of_two() && value <= MAX_TOKEN.0 {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Numeric value carried by the token.
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Token produced by merging two tokens of this value, if still in range.
    #[must_use]
    pub const fn doubled(self) -> Option<Self> {
        Self::new(self.0 * 2)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for Token {
    type Error = InvalidToken;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidToken(value))
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

/// Error raised when a number is not a recognised token value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvalidToken(pub u32);

impl fmt::Display for InvalidToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is not a token value", self.0)
    }
}

impl std::error::Error for InvalidToken {}

/// Contents of a single cell: at most one token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellState(Option<Token>);

impl CellState {
    /// A cell without a token.
    pub const EMPTY: Self = Self(None);

    /// A cell holding the provided token.
    #[must_use]
    pub const fn holding(token: Token) -> Self {
        Self(Some(token))
    }

    /// Token held by the cell, if any.
    #[must_use]
    pub const fn token(&self) -> Option<Token> {
        self.0
    }

    /// Reports whether the cell holds no token.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

impl From<Option<Token>> for CellState {
    fn from(token: Option<Token>) -> Self {
        Self(token)
    }
}

/// Recorded deviation of a cell from its natural state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellOverride {
    /// Cell whose state was modified by the player.
    pub cell: CellId,
    /// State the cell holds after the modification.
    pub state: CellState,
}

/// Immutable representation of a materialized cell used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellSnapshot {
    /// Identifier of the cell.
    pub cell: CellId,
    /// Effective state: the override if present, otherwise the natural state.
    pub state: CellState,
    /// Advisory flag set when the cell lies within [`INTERACTION_RADIUS`] of the player.
    pub in_range: bool,
}

/// Read-only view into the set of materialized cells.
#[derive(Clone, Copy, Debug)]
pub struct MaterializedView<'a> {
    cells: &'a BTreeSet<CellId>,
}

impl<'a> MaterializedView<'a> {
    /// Captures a new view backed by the provided set.
    #[must_use]
    pub fn new(cells: &'a BTreeSet<CellId>) -> Self {
        Self { cells }
    }

    /// Reports whether the cell is currently materialized.
    #[must_use]
    pub fn contains(&self, cell: CellId) -> bool {
        self.cells.contains(&cell)
    }

    /// Iterates materialized cells in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = CellId> + 'a {
        self.cells.iter().copied()
    }

    /// Number of materialized cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether no cell is materialized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Classification of a single interaction attempt on a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionOutcome {
    /// The cell lies beyond [`INTERACTION_RADIUS`]; nothing changed.
    OutOfRange,
    /// Both the inventory and the cell were empty; nothing changed.
    NothingToDo,
    /// The cell's token moved into the inventory.
    PickedUp {
        /// Token that was picked up.
        token: Token,
    },
    /// The inventory token was placed on an empty cell.
    Placed {
        /// Token that was placed.
        token: Token,
    },
    /// The inventory token merged with an equal token on the cell.
    Merged {
        /// Token produced by the merge.
        token: Token,
    },
    /// The inventory and cell combination matches no transition; nothing changed.
    NoValidInteraction,
}

impl InteractionOutcome {
    /// Reports whether the outcome changed the target cell.
    #[must_use]
    pub const fn mutates_cell(&self) -> bool {
        matches!(
            self,
            Self::PickedUp { .. } | Self::Placed { .. } | Self::Merged { .. }
        )
    }
}

impl fmt::Display for InteractionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange => write!(f, "that cell is out of reach"),
            Self::NothingToDo => write!(f, "nothing to do here"),
            Self::PickedUp { token } => write!(f, "picked up {token}"),
            Self::Placed { token } => write!(f, "placed {token}"),
            Self::Merged { token } => write!(f, "merged into {token}"),
            Self::NoValidInteraction => write!(f, "those tokens do not match"),
        }
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Moves the player to an absolute position.
    MovePlayer {
        /// Destination in degrees.
        position: LatLng,
    },
    /// Records the bounds currently visible to the renderer.
    ReportViewport {
        /// Visible bounds in degrees.
        bounds: GeoBounds,
    },
    /// Adds cells to the materialized set.
    MaterializeCells {
        /// Cells that must become visible.
        cells: Vec<CellId>,
    },
    /// Removes cells from the materialized set.
    EvictCells {
        /// Cells that may be forgotten.
        cells: Vec<CellId>,
    },
    /// Attempts a pickup, placement, or merge on a cell.
    Interact {
        /// Target cell of the interaction.
        cell: CellId,
    },
    /// Installs previously persisted player state and overrides.
    RestoreSession {
        /// Token held by the player.
        inventory: Option<Token>,
        /// Player position in degrees.
        position: LatLng,
        /// Every recorded cell override.
        overrides: Vec<CellOverride>,
    },
    /// Clears all overrides and player state, returning the player to `start`.
    ResetGame {
        /// Position the player restarts from.
        start: LatLng,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// The player's continuous position changed.
    PlayerMoved {
        /// Position before the move.
        from: LatLng,
        /// Position after the move.
        to: LatLng,
    },
    /// The player crossed into a different cell.
    PlayerCellChanged {
        /// Cell occupied before the move.
        from: CellId,
        /// Cell occupied after the move.
        to: CellId,
    },
    /// The renderer reported new visible bounds.
    ViewportChanged {
        /// Newly visible bounds.
        bounds: GeoBounds,
    },
    /// Cells joined the materialized set.
    CellsMaterialized {
        /// Cells that were added, in command order.
        cells: Vec<CellId>,
    },
    /// Cells left the materialized set.
    CellsEvicted {
        /// Cells that were removed, in command order.
        cells: Vec<CellId>,
    },
    /// An interaction attempt finished.
    InteractionResolved {
        /// Target cell of the interaction.
        cell: CellId,
        /// Classification of the attempt.
        outcome: InteractionOutcome,
    },
    /// A cell's effective state changed and an override was recorded.
    CellStateChanged {
        /// Cell that changed.
        cell: CellId,
        /// State after the change.
        state: CellState,
    },
    /// The player's inventory changed.
    InventoryChanged {
        /// Token now held, if any.
        inventory: Option<Token>,
    },
    /// A merge produced [`MILESTONE_TOKEN`].
    MilestoneReached {
        /// Cell that holds the milestone token.
        cell: CellId,
        /// Token that was produced.
        token: Token,
    },
    /// A persisted session was installed.
    SessionRestored {
        /// Number of overrides installed.
        overrides: usize,
    },
    /// All overrides and player state were cleared.
    GameReset,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn cell_center_round_trips_to_same_cell() {
        for i in [-100_000, -1_337, -1, 0, 1, 7, 369_894, 1_000_000] {
            for j in [-1_220_627, -42, -1, 0, 1, 99, 500_000] {
                let cell = CellId::new(i, j);
                assert_eq!(CellId::containing(cell.center()), cell, "cell {cell}");
            }
        }
    }

    #[test]
    fn containing_floors_towards_negative_infinity() {
        assert_eq!(
            CellId::containing(LatLng::new(-0.000_05, 0.000_05)),
            CellId::new(-1, 0)
        );
        assert_eq!(
            CellId::containing(LatLng::new(36.997_95, -122.057_05)),
            CellId::new(369_979, -1_220_571)
        );
    }

    #[test]
    fn bounds_are_anchored_at_origin() {
        let bounds = CellId::new(2, -3).bounds();
        assert!((bounds.south_west().lat - 2.0 * TILE_DEGREES).abs() < 1e-12);
        assert!((bounds.south_west().lng + 3.0 * TILE_DEGREES).abs() < 1e-12);
        assert!((bounds.north_east().lat - 3.0 * TILE_DEGREES).abs() < 1e-12);
        assert!((bounds.north_east().lng + 2.0 * TILE_DEGREES).abs() < 1e-12);
    }

    #[test]
    fn chebyshev_distance_takes_larger_axis() {
        let origin = CellId::new(0, 0);
        assert_eq!(origin.chebyshev_distance(CellId::new(3, -2)), 3);
        assert_eq!(origin.chebyshev_distance(CellId::new(-1, 4)), 4);
        assert!(origin.within_reach(CellId::new(3, 3)));
        assert!(!origin.within_reach(CellId::new(4, 0)));
    }

    #[test]
    fn region_iterates_every_cell_once_in_row_order() {
        let region = CellRegion::spanning(CellId::new(1, 1), CellId::new(-1, 0));
        let cells: Vec<_> = region.iter().collect();
        assert_eq!(cells.len() as u64, region.len());
        assert_eq!(cells.first(), Some(&CellId::new(-1, 0)));
        assert_eq!(cells.last(), Some(&CellId::new(1, 1)));
        assert_eq!(cells[1], CellId::new(-1, 1));
    }

    #[test]
    fn token_rejects_values_outside_the_set() {
        assert!(Token::new(0).is_none());
        assert!(Token::new(3).is_none());
        assert!(Token::new(256).is_none());
        assert_eq!(Token::new(64).and_then(Token::doubled), Some(MAX_TOKEN));
        assert!(MAX_TOKEN.doubled().is_none());
    }

    #[test]
    fn token_deserialization_validates_value() {
        assert!(serde_json::from_str::<Token>("12").is_err());
        let state: CellState = serde_json::from_str("8").expect("valid token");
        assert_eq!(state.token().map(|token| token.value()), Some(8));
        let empty: CellState = serde_json::from_str("null").expect("empty cell");
        assert!(empty.is_empty());
    }

    #[test]
    fn cell_id_round_trips_through_bincode() {
        assert_round_trip(&CellId::new(-369_979, 1_220_570));
    }

    #[test]
    fn cell_override_round_trips_through_bincode() {
        assert_round_trip(&CellOverride {
            cell: CellId::new(0, 0),
            state: CellState::holding(Token(8)),
        });
    }

    #[test]
    fn only_state_changing_outcomes_mutate() {
        assert!(InteractionOutcome::Merged { token: Token(4) }.mutates_cell());
        assert!(!InteractionOutcome::OutOfRange.mutates_cell());
        assert!(!InteractionOutcome::NoValidInteraction.mutates_cell());
    }
}
