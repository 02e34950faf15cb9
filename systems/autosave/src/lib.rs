#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure autosave system deciding when the durable snapshot must change.

use gridmerge_core::Event;

/// Action the persistence adapter should take after an event batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveDirective {
    /// Nothing persisted changed.
    Skip,
    /// Overwrite the durable snapshot with the current state.
    Snapshot,
    /// Delete the durable snapshot.
    Erase,
}

/// Observes world events and requests snapshots after moves and mutations.
#[derive(Debug, Default)]
pub struct Autosave {
    snapshots_requested: u64,
}

impl Autosave {
    /// Creates a new autosave system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of snapshots requested since the system was created.
    #[must_use]
    pub fn snapshots_requested(&self) -> u64 {
        self.snapshots_requested
    }

    /// Consumes a batch of world events and returns the persistence action.
    ///
    /// A reset in the batch always wins: the snapshot is erased and the fresh
    /// game is only persisted by the next move or mutation.
    pub fn handle(&mut self, events: &[Event]) -> SaveDirective {
        if events.iter().any(|event| matches!(event, Event::GameReset)) {
            return SaveDirective::Erase;
        }

        let dirty = events.iter().any(|event| {
            matches!(
                event,
                Event::PlayerMoved { .. }
                    | Event::CellStateChanged { .. }
                    | Event::InventoryChanged { .. }
            )
        });
        if !dirty {
            return SaveDirective::Skip;
        }

        self.snapshots_requested = self.snapshots_requested.saturating_add(1);
        SaveDirective::Snapshot
    }
}
