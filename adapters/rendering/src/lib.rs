#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Gridmerge adapters.
//!
//! Renderers never read the world directly. Adapters capture a [`Scene`] from
//! world queries and hand it to a [`RenderingBackend`] inside a
//! [`Presentation`].

use std::time::Duration;

use anyhow::Result as AnyResult;
use gridmerge_core::{CellId, CellRegion, CellSnapshot, InteractionOutcome, LatLng, Token};

/// Default time an advisory notice stays visible.
pub const DEFAULT_NOTICE_LIFETIME: Duration = Duration::from_secs(3);

/// Result of the most recent interaction, reported back to the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InteractionFeedback {
    /// Target cell of the interaction.
    pub cell: CellId,
    /// Classification of the attempt.
    pub outcome: InteractionOutcome,
}

/// Immutable snapshot of everything a renderer needs for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Continuous player position.
    pub player: LatLng,
    /// Cell occupied by the player.
    pub player_cell: CellId,
    /// Token held by the player.
    pub inventory: Option<Token>,
    /// Materialized cells in ascending order.
    pub cells: Vec<CellSnapshot>,
    /// Recent player positions, oldest first.
    pub trail: Vec<LatLng>,
    /// Advisory message currently on display.
    pub notice: Option<String>,
    /// Outcome of the most recent interaction, if any.
    pub feedback: Option<InteractionFeedback>,
}

impl Scene {
    /// Creates a scene for the provided player and cells.
    #[must_use]
    pub fn new(player: LatLng, inventory: Option<Token>, cells: Vec<CellSnapshot>) -> Self {
        Self {
            player,
            player_cell: CellId::containing(player),
            inventory,
            cells,
            trail: Vec::new(),
            notice: None,
            feedback: None,
        }
    }

    /// Attaches the movement trail.
    #[must_use]
    pub fn with_trail(mut self, trail: Vec<LatLng>) -> Self {
        self.trail = trail;
        self
    }

    /// Attaches the advisory notice.
    #[must_use]
    pub fn with_notice(mut self, notice: Option<String>) -> Self {
        self.notice = notice;
        self
    }

    /// Attaches the latest interaction feedback.
    #[must_use]
    pub fn with_feedback(mut self, feedback: Option<InteractionFeedback>) -> Self {
        self.feedback = feedback;
        self
    }

    /// Looks up a materialized cell.
    #[must_use]
    pub fn cell(&self, cell: CellId) -> Option<&CellSnapshot> {
        self.cells
            .binary_search_by(|snapshot| snapshot.cell.cmp(&cell))
            .ok()
            .and_then(|index| self.cells.get(index))
    }

    /// Smallest region containing every materialized cell.
    #[must_use]
    pub fn extent(&self) -> Option<CellRegion> {
        let first = self.cells.first()?.cell;
        Some(self.cells.iter().fold(
            CellRegion::spanning(first, first),
            |region, snapshot| {
                CellRegion::spanning(
                    CellId::new(
                        region.min().i().min(snapshot.cell.i()),
                        region.min().j().min(snapshot.cell.j()),
                    ),
                    CellId::new(
                        region.max().i().max(snapshot.cell.i()),
                        region.max().j().max(snapshot.cell.j()),
                    ),
                )
            },
        ))
    }
}

/// Presentation descriptor consumed by rendering backends.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Title shown above the scene.
    pub title: String,
    /// Scene content that should be displayed.
    pub scene: Scene,
}

impl Presentation {
    /// Constructs a new presentation descriptor.
    #[must_use]
    pub fn new<T>(title: T, scene: Scene) -> Self
    where
        T: Into<String>,
    {
        Self {
            title: title.into(),
            scene,
        }
    }
}

/// Rendering backend capable of presenting Gridmerge scenes.
pub trait RenderingBackend {
    /// Draws a single frame.
    fn present(&mut self, presentation: &Presentation) -> AnyResult<()>;
}

/// Single advisory message that expires after a fixed lifetime.
///
/// Time only advances through [`NoticeBoard::advance`], keeping the board
/// deterministic under test.
#[derive(Clone, Debug)]
pub struct NoticeBoard {
    lifetime: Duration,
    current: Option<(String, Duration)>,
}

impl NoticeBoard {
    /// Creates a board whose notices live for `lifetime`.
    #[must_use]
    pub fn new(lifetime: Duration) -> Self {
        Self {
            lifetime,
            current: None,
        }
    }

    /// Replaces the current notice.
    pub fn post(&mut self, message: impl Into<String>) {
        self.current = Some((message.into(), self.lifetime));
    }

    /// Advances time, expiring the notice once its lifetime elapsed.
    pub fn advance(&mut self, dt: Duration) {
        let expired = match self.current.as_mut() {
            Some((_, remaining)) => {
                *remaining = remaining.saturating_sub(dt);
                remaining.is_zero()
            }
            None => false,
        };
        if expired {
            self.current = None;
        }
    }

    /// Message currently on display.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.current.as_ref().map(|(message, _)| message.as_str())
    }
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new(DEFAULT_NOTICE_LIFETIME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridmerge_core::CellState;

    fn snapshot(i: i32, j: i32) -> CellSnapshot {
        CellSnapshot {
            cell: CellId::new(i, j),
            state: CellState::EMPTY,
            in_range: false,
        }
    }

    #[test]
    fn notice_expires_after_lifetime() {
        let mut board = NoticeBoard::new(Duration::from_millis(500));
        board.post("live position unavailable");

        board.advance(Duration::from_millis(499));
        assert_eq!(board.message(), Some("live position unavailable"));

        board.advance(Duration::from_millis(1));
        assert_eq!(board.message(), None);
    }

    #[test]
    fn posting_restarts_lifetime() {
        let mut board = NoticeBoard::new(Duration::from_millis(100));
        board.post("first");
        board.advance(Duration::from_millis(90));
        board.post("second");
        board.advance(Duration::from_millis(90));

        assert_eq!(board.message(), Some("second"));
    }

    #[test]
    fn scene_extent_covers_all_cells() {
        let scene = Scene::new(
            CellId::new(0, 0).center(),
            None,
            vec![snapshot(-2, 1), snapshot(0, -3), snapshot(4, 0)],
        );

        let extent = scene.extent().expect("cells present");
        assert_eq!(extent.min(), CellId::new(-2, -3));
        assert_eq!(extent.max(), CellId::new(4, 1));
        assert_eq!(scene.player_cell, CellId::new(0, 0));
    }

    #[test]
    fn scene_cell_lookup_uses_sorted_cells() {
        let scene = Scene::new(
            CellId::new(0, 0).center(),
            None,
            vec![snapshot(-1, 0), snapshot(0, 0), snapshot(0, 5)],
        );

        assert!(scene.cell(CellId::new(0, 5)).is_some());
        assert!(scene.cell(CellId::new(1, 1)).is_none());
    }
}
