#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Viewport scheduler that keeps the materialized cell set in step with the view.
//!
//! The system never touches cell state. It derives the region that must be on
//! screen from the player's cell and the renderer's bounds, diffs it against
//! the materialized set, and emits eviction and materialization commands.

use gridmerge_core::{CellId, CellRegion, Command, Event, GeoBounds, MaterializedView};
use tracing::debug;

/// Cells added around the visible region to avoid pop-in at the edges.
pub const DEFAULT_MARGIN: u32 = 1;

/// Half extent, in cells, of the region used before any bounds are reported.
pub const DEFAULT_HALF_EXTENT: u32 = 8;

/// Widest region, in cells per axis, that will ever be materialized.
pub const MAX_SPAN: u32 = 256;

/// Configuration parameters required to construct the viewport system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    margin: u32,
    half_extent: u32,
    max_span: u32,
}

impl Config {
    /// Creates a configuration with explicit margin, fallback extent, and span limit.
    #[must_use]
    pub const fn new(margin: u32, half_extent: u32, max_span: u32) -> Self {
        Self {
            margin,
            half_extent,
            max_span: if max_span == 0 { 1 } else { max_span },
        }
    }

    /// Returns a copy using the provided fallback half extent.
    #[must_use]
    pub const fn with_half_extent(self, half_extent: u32) -> Self {
        Self::new(self.margin, half_extent, self.max_span)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_MARGIN, DEFAULT_HALF_EXTENT, MAX_SPAN)
    }
}

/// Pure system that emits materialize and evict commands for the current view.
#[derive(Debug, Default)]
pub struct Viewport {
    config: Config,
    last_required: Option<CellRegion>,
}

impl Viewport {
    /// Creates a new viewport system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            last_required: None,
        }
    }

    /// Consumes world events and immutable views to emit synchronisation commands.
    ///
    /// Synchronisation only runs when the batch contains a position, viewport,
    /// reset, or restore event; all other batches are ignored.
    pub fn handle(
        &mut self,
        events: &[Event],
        player_cell: CellId,
        bounds: Option<GeoBounds>,
        materialized: MaterializedView<'_>,
        out: &mut Vec<Command>,
    ) {
        let triggered = events.iter().any(|event| {
            matches!(
                event,
                Event::PlayerMoved { .. }
                    | Event::ViewportChanged { .. }
                    | Event::GameReset
                    | Event::SessionRestored { .. }
            )
        });
        if !triggered {
            return;
        }

        let required = self.required_region(player_cell, bounds);
        self.last_required = Some(required);
        sync(required, materialized, out);
    }

    /// Region of cells that must be materialized for the provided view.
    #[must_use]
    pub fn required_region(&self, player_cell: CellId, bounds: Option<GeoBounds>) -> CellRegion {
        let visible = match bounds {
            Some(bounds) => CellRegion::covering(bounds),
            None => square_around(player_cell, self.config.half_extent),
        };
        let required = visible.expanded(self.config.margin);

        if required.rows() > self.config.max_span || required.columns() > self.config.max_span {
            debug!(
                rows = required.rows(),
                columns = required.columns(),
                "clamping oversized viewport around player"
            );
            return square_around(player_cell, (self.config.max_span - 1) / 2);
        }

        required
    }

    /// Region computed by the most recent synchronisation, if any.
    #[must_use]
    pub fn last_required(&self) -> Option<CellRegion> {
        self.last_required
    }
}

/// Emits the commands that turn `materialized` into exactly `required`.
///
/// Evictions come first so that renderers release handles before new cells
/// arrive. When the sets already match nothing is emitted.
pub fn sync(required: CellRegion, materialized: MaterializedView<'_>, out: &mut Vec<Command>) {
    let evict: Vec<CellId> = materialized
        .iter()
        .filter(|cell| !required.contains(*cell))
        .collect();
    let materialize: Vec<CellId> = required
        .iter()
        .filter(|cell| !materialized.contains(*cell))
        .collect();

    if !evict.is_empty() {
        out.push(Command::EvictCells { cells: evict });
    }
    if !materialize.is_empty() {
        out.push(Command::MaterializeCells { cells: materialize });
    }
}

fn square_around(center: CellId, half_extent: u32) -> CellRegion {
    let half = i32::try_from(half_extent).unwrap_or(i32::MAX);
    CellRegion::spanning(
        CellId::new(center.i().saturating_sub(half), center.j().saturating_sub(half)),
        CellId::new(center.i().saturating_add(half), center.j().saturating_add(half)),
    )
}
