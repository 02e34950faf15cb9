//! Session context tying the world, its systems, and the adapters together.

use std::time::Duration;

use gridmerge_core::{
    CellId, Command, Direction, Event, GeoBounds, InteractionOutcome, LatLng, Token,
};
use gridmerge_rendering::{InteractionFeedback, NoticeBoard, Presentation, Scene};
use gridmerge_storage::{Persistence, SessionSnapshot, SnapshotStore, StorageError};
use gridmerge_system_autosave::{Autosave, SaveDirective};
use gridmerge_system_movement::{
    ActiveSource, FixFeed, Movement, MovementInput, PositionSource, PositionSourceError,
};
use gridmerge_system_viewport::{Config as ViewportConfig, Viewport};
use gridmerge_world::{self as world, query, World};
use tracing::{debug, info, warn};

use crate::{
    config::GameConfig,
    transfer::{self, TransferError},
};

/// Message posted when the live position source cannot be used.
pub const MANUAL_FALLBACK_NOTICE: &str = "live position unavailable; use n/s/e/w to move";

/// Message posted when the snapshot could not be written.
///
/// The world keeps the change; the next move or mutation saves again.
pub const SAVE_FAILED_NOTICE: &str = "could not save progress; will retry";

/// Message posted when a merge produces the milestone token.
pub const MILESTONE_NOTICE: &str = "You forged a 128! Legendary.";

/// Parameters required to start a session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionSettings {
    /// Position a fresh game starts from.
    pub start: LatLng,
    /// Cells visible on each side of the player.
    pub view_half_extent: u32,
    /// Lifetime of advisory notices.
    pub notice_lifetime: Duration,
}

impl From<&GameConfig> for SessionSettings {
    fn from(config: &GameConfig) -> Self {
        Self {
            start: config.start,
            view_half_extent: config.view_half_extent,
            notice_lifetime: config.notice_lifetime(),
        }
    }
}

/// Summary of the session for status queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionStatus {
    /// Continuous player position.
    pub position: LatLng,
    /// Cell occupied by the player.
    pub cell: CellId,
    /// Token held by the player.
    pub inventory: Option<Token>,
    /// Number of recorded overrides.
    pub overrides: usize,
    /// Number of materialized cells.
    pub materialized: usize,
    /// Whether positions come from a live feed.
    pub live: bool,
}

/// Owns the world, every system, and the adapters for one play session.
///
/// All mutations run to completion through [`world::apply`]; the viewport
/// scheduler and autosave observe the resulting events before control returns.
#[derive(Debug)]
pub struct GameSession<S> {
    world: World,
    settings: SessionSettings,
    viewport: Viewport,
    movement: Movement,
    source: ActiveSource,
    autosave: Autosave,
    persistence: Persistence<S>,
    notices: NoticeBoard,
    feedback: Option<InteractionFeedback>,
    milestones: u32,
}

impl<S: SnapshotStore> GameSession<S> {
    /// Starts a session, restoring the durable snapshot unless `fresh` is set.
    ///
    /// A corrupt snapshot is discarded and a new game starts instead.
    pub fn start(settings: SessionSettings, store: S, fresh: bool) -> Result<Self, StorageError> {
        let mut persistence = Persistence::new(store);
        let restored = if fresh {
            persistence.reset()?;
            None
        } else {
            persistence.load()?
        };

        let mut session = Self {
            world: World::starting_at(settings.start),
            settings,
            viewport: Viewport::new(
                ViewportConfig::default().with_half_extent(settings.view_half_extent),
            ),
            movement: Movement::new(),
            source: ActiveSource::default(),
            autosave: Autosave::new(),
            persistence,
            notices: NoticeBoard::new(settings.notice_lifetime),
            feedback: None,
            milestones: 0,
        };

        let commands = match restored {
            Some(snapshot) => session.restore_commands(snapshot),
            None => vec![session.view_around(settings.start)],
        };
        // The restored state stays in play even when re-saving it fails.
        if session.dispatch(commands).is_err() {
            debug!("session started without a fresh snapshot");
        }
        Ok(session)
    }

    /// Installs the position source, falling back to manual steps on failure.
    pub fn attach_feed(&mut self, feed: Result<FixFeed, PositionSourceError>) {
        let (source, error) = ActiveSource::live_or_manual(feed);
        self.source = source;
        if error.is_some() {
            self.notices.post(MANUAL_FALLBACK_NOTICE);
        }
    }

    /// Moves the player one cell in the provided direction.
    pub fn step(&mut self, direction: Direction) -> Result<(), StorageError> {
        let current = query::player_position(&self.world);
        let mut commands = Vec::new();
        match &mut self.source {
            ActiveSource::Manual(steps) => {
                steps.press(direction);
                self.movement.drain(&mut self.source, current, &mut commands);
            }
            ActiveSource::Live(_) => {
                self.movement
                    .handle(&[MovementInput::Step(direction)], current, &mut commands);
            }
        }
        self.dispatch_movement(commands)
    }

    /// Moves the player to an absolute position.
    pub fn move_to(&mut self, position: LatLng) -> Result<(), StorageError> {
        let mut commands = Vec::new();
        self.movement.handle(
            &[MovementInput::Fix(position)],
            query::player_position(&self.world),
            &mut commands,
        );
        self.dispatch_movement(commands)
    }

    /// Applies the next fix from the live feed.
    ///
    /// Returns `false` when no live fix was available.
    pub fn follow_feed(&mut self) -> Result<bool, StorageError> {
        if !self.source.is_live() {
            self.notices.post(MANUAL_FALLBACK_NOTICE);
            return Ok(false);
        }
        let Some(input) = self.source.poll() else {
            self.notices.post("position feed exhausted");
            return Ok(false);
        };

        let mut commands = Vec::new();
        self.movement
            .handle(&[input], query::player_position(&self.world), &mut commands);
        self.dispatch_movement(commands)?;
        Ok(true)
    }

    /// Records the bounds currently visible to the renderer.
    pub fn report_viewport(&mut self, bounds: GeoBounds) -> Result<(), StorageError> {
        let _ = self.dispatch(vec![Command::ReportViewport { bounds }])?;
        Ok(())
    }

    /// Interacts with the provided cell and reports the outcome.
    pub fn interact(&mut self, cell: CellId) -> Result<InteractionOutcome, StorageError> {
        let events = self.dispatch(vec![Command::Interact { cell }])?;
        let outcome = events.iter().find_map(|event| match event {
            Event::InteractionResolved { outcome, .. } => Some(*outcome),
            _ => None,
        });
        debug_assert!(outcome.is_some(), "interact always resolves");
        Ok(outcome.unwrap_or(InteractionOutcome::NothingToDo))
    }

    /// Interacts with the cell offset from the player's cell.
    pub fn interact_relative(
        &mut self,
        di: i32,
        dj: i32,
    ) -> Result<InteractionOutcome, StorageError> {
        let here = query::player_cell(&self.world);
        self.interact(CellId::new(
            here.i().saturating_add(di),
            here.j().saturating_add(dj),
        ))
    }

    /// Clears all progress and returns the player to the configured start.
    pub fn reset(&mut self) -> Result<(), StorageError> {
        let start = self.settings.start;
        let commands = vec![Command::ResetGame { start }, self.view_around(start)];
        let _ = self.dispatch(commands)?;
        self.feedback = None;
        self.notices.post("game reset");
        Ok(())
    }

    /// Encodes the current snapshot as a transfer string.
    pub fn export(&self) -> Result<String, TransferError> {
        transfer::encode(&self.snapshot())
    }

    /// Replaces the session state with a transfer string.
    pub fn import(&mut self, value: &str) -> Result<(), TransferError> {
        let snapshot = transfer::decode(value)?;
        let commands = self.restore_commands(snapshot);
        let _ = self.dispatch(commands)?;
        self.feedback = None;
        self.notices.post("session imported");
        Ok(())
    }

    /// Advances time for transient notices.
    pub fn tick(&mut self, dt: Duration) {
        self.notices.advance(dt);
    }

    /// Captures the persisted portion of the session.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            inventory: query::inventory(&self.world),
            position: query::player_position(&self.world),
            overrides: query::overrides(&self.world),
        }
    }

    /// Captures the scene for the renderer.
    #[must_use]
    pub fn scene(&self) -> Scene {
        Scene::new(
            query::player_position(&self.world),
            query::inventory(&self.world),
            query::materialized_cells(&self.world),
        )
        .with_trail(query::trail(&self.world))
        .with_notice(self.notices.message().map(str::to_owned))
        .with_feedback(self.feedback)
    }

    /// Wraps the scene in a titled presentation.
    #[must_use]
    pub fn presentation(&self) -> Presentation {
        Presentation::new(query::welcome_banner(&self.world), self.scene())
    }

    /// Summarises the session.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            position: query::player_position(&self.world),
            cell: query::player_cell(&self.world),
            inventory: query::inventory(&self.world),
            overrides: query::override_count(&self.world),
            materialized: query::materialized_view(&self.world).len(),
            live: self.source.is_live(),
        }
    }

    /// Number of milestone celebrations shown this session.
    #[must_use]
    pub fn milestones(&self) -> u32 {
        self.milestones
    }

    /// Read-only access to the authoritative world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Read-only access to the storage medium.
    #[must_use]
    pub fn store(&self) -> &S {
        self.persistence.store()
    }

    fn view_around(&self, center: LatLng) -> Command {
        Command::ReportViewport {
            bounds: GeoBounds::around(center, self.settings.view_half_extent),
        }
    }

    fn restore_commands(&self, snapshot: SessionSnapshot) -> Vec<Command> {
        let view = self.view_around(snapshot.position);
        vec![
            Command::RestoreSession {
                inventory: snapshot.inventory,
                position: snapshot.position,
                overrides: snapshot.overrides,
            },
            view,
        ]
    }

    fn dispatch_movement(&mut self, mut commands: Vec<Command>) -> Result<(), StorageError> {
        let destination = commands.iter().rev().find_map(|command| match command {
            Command::MovePlayer { position } if position.is_finite() => Some(*position),
            _ => None,
        });
        if let Some(destination) = destination {
            commands.push(self.view_around(destination));
        }
        let _ = self.dispatch(commands)?;
        Ok(())
    }

    fn dispatch(&mut self, commands: Vec<Command>) -> Result<Vec<Event>, StorageError> {
        let mut pending = commands;
        let mut history = Vec::new();

        while !pending.is_empty() {
            let mut events = Vec::new();
            for command in pending.drain(..) {
                world::apply(&mut self.world, command, &mut events);
            }
            self.viewport.handle(
                &events,
                query::player_cell(&self.world),
                query::viewport(&self.world),
                query::materialized_view(&self.world),
                &mut pending,
            );
            history.extend(events);
        }

        self.observe(&history);
        let directive = self.autosave.handle(&history);
        debug!(events = history.len(), ?directive, "dispatched command batch");
        let stored = match directive {
            SaveDirective::Skip => Ok(()),
            SaveDirective::Snapshot => self.persistence.save(&self.snapshot()),
            SaveDirective::Erase => self.persistence.reset(),
        };
        if let Err(error) = stored {
            warn!(%error, "progress not saved; retrying on next change");
            self.notices.post(SAVE_FAILED_NOTICE);
            return Err(error);
        }
        Ok(history)
    }

    fn observe(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::InteractionResolved { cell, outcome } => {
                    self.feedback = Some(InteractionFeedback {
                        cell: *cell,
                        outcome: *outcome,
                    });
                    if !outcome.mutates_cell() {
                        self.notices.post(outcome.to_string());
                    }
                }
                Event::MilestoneReached { cell, token } => {
                    self.milestones += 1;
                    info!(%cell, %token, "milestone celebrated");
                    self.notices.post(MILESTONE_NOTICE);
                }
                _ => {}
            }
        }
    }
}
