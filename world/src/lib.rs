#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Gridmerge.
//!
//! The world owns the cell store, the player, and the last viewport reported
//! by the renderer. Every mutation arrives as a [`Command`] through [`apply`],
//! which broadcasts the resulting [`Event`] values for systems and adapters.

mod cells;
mod interaction;

use std::collections::VecDeque;

use gridmerge_core::{
    CellId, Command, Event, GeoBounds, InteractionOutcome, LatLng, Token, DEFAULT_START,
    MILESTONE_TOKEN, WELCOME_BANNER,
};
use tracing::{debug, info, warn};

use crate::cells::CellStore;

/// Number of recent player positions retained for the movement trail.
pub const TRAIL_CAPACITY: usize = 256;

#[derive(Debug)]
struct Player {
    position: LatLng,
    inventory: Option<Token>,
}

impl Player {
    fn at(position: LatLng) -> Self {
        Self {
            position,
            inventory: None,
        }
    }

    fn cell(&self) -> CellId {
        CellId::containing(self.position)
    }
}

/// Represents the authoritative Gridmerge world state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    cells: CellStore,
    player: Player,
    viewport: Option<GeoBounds>,
    trail: VecDeque<LatLng>,
}

impl World {
    /// Creates a fresh world with the player at [`DEFAULT_START`].
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(DEFAULT_START)
    }

    /// Creates a fresh world with the player at the provided position.
    #[must_use]
    pub fn starting_at(start: LatLng) -> Self {
        let mut trail = VecDeque::with_capacity(TRAIL_CAPACITY);
        trail.push_back(start);
        Self {
            banner: WELCOME_BANNER,
            cells: CellStore::new(),
            player: Player::at(start),
            viewport: None,
            trail,
        }
    }

    fn relocate(&mut self, position: LatLng, out_events: &mut Vec<Event>) {
        let from = self.player.position;
        let from_cell = self.player.cell();
        self.player.position = position;
        self.remember(position);

        out_events.push(Event::PlayerMoved { from, to: position });
        let to_cell = self.player.cell();
        if to_cell != from_cell {
            debug!(from = %from_cell, to = %to_cell, "player changed cell");
            out_events.push(Event::PlayerCellChanged {
                from: from_cell,
                to: to_cell,
            });
        }
    }

    fn remember(&mut self, position: LatLng) {
        if self.trail.len() == TRAIL_CAPACITY {
            let _ = self.trail.pop_front();
        }
        self.trail.push_back(position);
    }

    fn interact(&mut self, cell: CellId, out_events: &mut Vec<Event>) {
        let state = self.cells.effective_state(cell);
        let transition =
            interaction::resolve(self.player.cell(), cell, self.player.inventory, state);

        if transition.outcome.mutates_cell() {
            self.cells.record(cell, transition.state);
            out_events.push(Event::CellStateChanged {
                cell,
                state: transition.state,
            });
        }

        if transition.inventory != self.player.inventory {
            self.player.inventory = transition.inventory;
            out_events.push(Event::InventoryChanged {
                inventory: transition.inventory,
            });
        }

        info!(%cell, outcome = ?transition.outcome, "interaction resolved");
        out_events.push(Event::InteractionResolved {
            cell,
            outcome: transition.outcome,
        });

        if let InteractionOutcome::Merged { token } = transition.outcome {
            if token == MILESTONE_TOKEN {
                info!(%cell, %token, "milestone token created");
                out_events.push(Event::MilestoneReached { cell, token });
            }
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::MovePlayer { position } => {
            if !position.is_finite() {
                warn!(?position, "ignoring non-finite player position");
                return;
            }
            world.relocate(position, out_events);
        }
        Command::ReportViewport { bounds } => {
            if world.viewport == Some(bounds) {
                return;
            }
            world.viewport = Some(bounds);
            out_events.push(Event::ViewportChanged { bounds });
        }
        Command::MaterializeCells { cells } => {
            let added: Vec<CellId> = cells
                .into_iter()
                .filter(|cell| world.cells.materialize(*cell))
                .collect();
            if !added.is_empty() {
                debug!(count = added.len(), "materialized cells");
                out_events.push(Event::CellsMaterialized { cells: added });
            }
        }
        Command::EvictCells { cells } => {
            let removed: Vec<CellId> = cells
                .into_iter()
                .filter(|cell| world.cells.evict(*cell))
                .collect();
            if !removed.is_empty() {
                debug!(count = removed.len(), "evicted cells");
                out_events.push(Event::CellsEvicted { cells: removed });
            }
        }
        Command::Interact { cell } => world.interact(cell, out_events),
        Command::RestoreSession {
            inventory,
            position,
            overrides,
        } => {
            let count = overrides.len();
            world.cells.install(overrides);
            world.player.inventory = inventory;
            out_events.push(Event::SessionRestored { overrides: count });
            out_events.push(Event::InventoryChanged { inventory });
            if position.is_finite() {
                world.relocate(position, out_events);
            }
            info!(overrides = count, "session restored");
        }
        Command::ResetGame { start } => {
            let evicted = world.cells.reset();
            world.player = Player::at(start);
            world.trail.clear();
            world.trail.push_back(start);
            info!("game reset");
            out_events.push(Event::GameReset);
            if !evicted.is_empty() {
                out_events.push(Event::CellsEvicted { cells: evicted });
            }
            out_events.push(Event::InventoryChanged { inventory: None });
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use gridmerge_core::{
        CellId, CellOverride, CellSnapshot, CellState, GeoBounds, LatLng, MaterializedView, Token,
    };

    use super::World;

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Current continuous position of the player.
    #[must_use]
    pub fn player_position(world: &World) -> LatLng {
        world.player.position
    }

    /// Cell currently occupied by the player.
    #[must_use]
    pub fn player_cell(world: &World) -> CellId {
        world.player.cell()
    }

    /// Token held in the player's single inventory slot.
    #[must_use]
    pub fn inventory(world: &World) -> Option<Token> {
        world.player.inventory
    }

    /// Bounds most recently reported by the renderer, if any.
    #[must_use]
    pub fn viewport(world: &World) -> Option<GeoBounds> {
        world.viewport
    }

    /// Effective state of any cell, materialized or not.
    #[must_use]
    pub fn effective_state(world: &World, cell: CellId) -> CellState {
        world.cells.effective_state(cell)
    }

    /// Reports whether the player ever modified the cell.
    #[must_use]
    pub fn is_overridden(world: &World, cell: CellId) -> bool {
        world.cells.is_overridden(cell)
    }

    /// Exposes a read-only view of the materialized cell set.
    #[must_use]
    pub fn materialized_view(world: &World) -> MaterializedView<'_> {
        world.cells.materialized()
    }

    /// Captures every materialized cell with its effective state and range flag.
    #[must_use]
    pub fn materialized_cells(world: &World) -> Vec<CellSnapshot> {
        let player = world.player.cell();
        world
            .cells
            .materialized()
            .iter()
            .map(|cell| CellSnapshot {
                cell,
                state: world.cells.effective_state(cell),
                in_range: player.within_reach(cell),
            })
            .collect()
    }

    /// Every recorded override in ascending cell order.
    #[must_use]
    pub fn overrides(world: &World) -> Vec<CellOverride> {
        world.cells.overrides().collect()
    }

    /// Number of recorded overrides.
    #[must_use]
    pub fn override_count(world: &World) -> usize {
        world.cells.override_count()
    }

    /// Recent player positions, oldest first.
    #[must_use]
    pub fn trail(world: &World) -> Vec<LatLng> {
        world.trail.iter().copied().collect()
    }
}
