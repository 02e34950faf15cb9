#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Durable persistence for Gridmerge sessions.
//!
//! A snapshot holds the player's inventory, position, and the full override
//! map. Snapshots are whole-state overwrites encoded as JSON:
//!
//! ```json
//! { "inventory": 4, "position": { "lat": 36.9979, "lng": -122.057 },
//!   "overrides": [[0, 0, 8], [3, -1, null]] }
//! ```
//!
//! The medium is abstracted behind [`SnapshotStore`]; [`Persistence`] layers
//! the codec and the fail-open load policy on top of it.

mod store;

use std::collections::BTreeSet;

use gridmerge_core::{CellId, CellOverride, CellState, LatLng, Token};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub use crate::store::{FileStore, MemoryStore, SnapshotStore};

/// Player state and overrides captured for durable storage.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSnapshot {
    /// Token held by the player.
    pub inventory: Option<Token>,
    /// Continuous player position.
    pub position: LatLng,
    /// Every recorded cell override.
    pub overrides: Vec<CellOverride>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireSnapshot {
    inventory: Option<Token>,
    position: LatLng,
    overrides: Vec<(i32, i32, CellState)>,
}

/// Errors raised by the storage medium.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading, writing, or deleting the snapshot failed.
    #[error("snapshot storage at {location} failed: {source}")]
    Io {
        /// Description of the storage location.
        location: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The snapshot could not be encoded.
    #[error("could not encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Reasons a persisted snapshot is rejected as corrupt.
#[derive(Debug, Error)]
pub enum CorruptSnapshot {
    /// The payload is not valid JSON of the expected shape.
    #[error("snapshot does not parse: {0}")]
    Parse(#[source] serde_json::Error),
    /// The stored position is not a finite coordinate.
    #[error("snapshot position is not finite")]
    NonFinitePosition,
    /// The same cell appears more than once in the override list.
    #[error("snapshot lists cell {0} more than once")]
    DuplicateOverride(CellId),
}

impl SessionSnapshot {
    /// Encodes the snapshot into its JSON representation.
    pub fn encode(&self) -> Result<String, StorageError> {
        let wire = WireSnapshot {
            inventory: self.inventory,
            position: self.position,
            overrides: self
                .overrides
                .iter()
                .map(|entry| (entry.cell.i(), entry.cell.j(), entry.state))
                .collect(),
        };
        serde_json::to_string(&wire).map_err(StorageError::Encode)
    }

    /// Decodes and validates a snapshot from its JSON representation.
    pub fn decode(contents: &str) -> Result<Self, CorruptSnapshot> {
        let wire: WireSnapshot = serde_json::from_str(contents).map_err(CorruptSnapshot::Parse)?;
        if !wire.position.is_finite() {
            return Err(CorruptSnapshot::NonFinitePosition);
        }

        let mut seen = BTreeSet::new();
        let mut overrides = Vec::with_capacity(wire.overrides.len());
        for (i, j, state) in wire.overrides {
            let cell = CellId::new(i, j);
            if !seen.insert(cell) {
                return Err(CorruptSnapshot::DuplicateOverride(cell));
            }
            overrides.push(CellOverride { cell, state });
        }

        Ok(Self {
            inventory: wire.inventory,
            position: wire.position,
            overrides,
        })
    }
}

/// Snapshot codec bound to a storage medium.
#[derive(Debug)]
pub struct Persistence<S> {
    store: S,
}

impl<S: SnapshotStore> Persistence<S> {
    /// Wraps the provided storage medium.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Overwrites the durable snapshot.
    pub fn save(&mut self, snapshot: &SessionSnapshot) -> Result<(), StorageError> {
        let contents = snapshot.encode()?;
        self.store.write(&contents)?;
        debug!(overrides = snapshot.overrides.len(), "snapshot saved");
        Ok(())
    }

    /// Loads the durable snapshot.
    ///
    /// Corrupt data is discarded: the store is cleared and `Ok(None)` is
    /// returned so that the caller starts a fresh game.
    pub fn load(&mut self) -> Result<Option<SessionSnapshot>, StorageError> {
        let Some(contents) = self.store.read()? else {
            return Ok(None);
        };

        match SessionSnapshot::decode(&contents) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(error) => {
                warn!(%error, "discarding corrupt snapshot");
                self.store.clear()?;
                Ok(None)
            }
        }
    }

    /// Deletes the durable snapshot.
    pub fn reset(&mut self) -> Result<(), StorageError> {
        self.store.clear()
    }

    /// Provides read-only access to the storage medium.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }
}
