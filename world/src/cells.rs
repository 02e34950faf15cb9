use std::collections::{BTreeMap, BTreeSet};

use gridmerge_core::{CellId, CellOverride, CellState, MaterializedView};
use gridmerge_system_generation::natural;

/// Flyweight cell storage: materialized keys plus a sparse override map.
///
/// The materialized set only records which identifiers are on screen; no
/// per-cell state is kept for it. Overrides are written the moment a cell is
/// mutated and are never garbage-collected, even when a later mutation
/// happens to restore the natural state.
#[derive(Debug, Default)]
pub(crate) struct CellStore {
    materialized: BTreeSet<CellId>,
    overrides: BTreeMap<CellId, CellState>,
}

impl CellStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn effective_state(&self, cell: CellId) -> CellState {
        self.overrides
            .get(&cell)
            .copied()
            .unwrap_or_else(|| natural(cell))
    }

    /// Returns `true` when the cell was not materialized before.
    pub(crate) fn materialize(&mut self, cell: CellId) -> bool {
        self.materialized.insert(cell)
    }

    /// Returns `true` when the cell was materialized before.
    ///
    /// Overrides were already written at mutation time, so eviction only
    /// discards the rendering handle.
    pub(crate) fn evict(&mut self, cell: CellId) -> bool {
        self.materialized.remove(&cell)
    }

    pub(crate) fn record(&mut self, cell: CellId, state: CellState) {
        let _ = self.overrides.insert(cell, state);
    }

    pub(crate) fn is_overridden(&self, cell: CellId) -> bool {
        self.overrides.contains_key(&cell)
    }

    pub(crate) fn install(&mut self, overrides: impl IntoIterator<Item = CellOverride>) {
        self.overrides = overrides
            .into_iter()
            .map(|entry| (entry.cell, entry.state))
            .collect();
    }

    /// Clears overrides and materialized cells, returning the evicted keys.
    pub(crate) fn reset(&mut self) -> Vec<CellId> {
        self.overrides.clear();
        std::mem::take(&mut self.materialized).into_iter().collect()
    }

    pub(crate) fn materialized(&self) -> MaterializedView<'_> {
        MaterializedView::new(&self.materialized)
    }

    pub(crate) fn overrides(&self) -> impl Iterator<Item = CellOverride> + '_ {
        self.overrides
            .iter()
            .map(|(cell, state)| CellOverride {
                cell: *cell,
                state: *state,
            })
    }

    pub(crate) fn override_count(&self) -> usize {
        self.overrides.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridmerge_core::Token;

    fn token(value: u32) -> Token {
        Token::new(value).expect("valid token")
    }

    #[test]
    fn effective_state_falls_back_to_natural() {
        let store = CellStore::new();
        let cell = CellId::new(5, 9);
        assert_eq!(store.effective_state(cell), natural(cell));
    }

    #[test]
    fn materialize_does_not_write_overrides() {
        let mut store = CellStore::new();
        for i in 0..10 {
            assert!(store.materialize(CellId::new(i, 0)));
        }
        assert!(!store.materialize(CellId::new(0, 0)));
        assert_eq!(store.override_count(), 0);
    }

    #[test]
    fn eviction_keeps_recorded_override() {
        let mut store = CellStore::new();
        let cell = CellId::new(-3, 4);
        let _ = store.materialize(cell);
        store.record(cell, CellState::holding(token(16)));

        assert!(store.evict(cell));
        assert!(!store.evict(cell));
        assert_eq!(store.effective_state(cell), CellState::holding(token(16)));
    }

    #[test]
    fn override_equal_to_natural_is_retained() {
        let mut store = CellStore::new();
        let cell = CellId::new(1, 1);
        store.record(cell, natural(cell));

        assert!(store.is_overridden(cell));
        assert_eq!(store.override_count(), 1);
    }

    #[test]
    fn reset_clears_everything() {
        let mut store = CellStore::new();
        let _ = store.materialize(CellId::new(0, 0));
        let _ = store.materialize(CellId::new(0, 1));
        store.record(CellId::new(0, 0), CellState::EMPTY);

        let evicted = store.reset();
        assert_eq!(evicted, vec![CellId::new(0, 0), CellId::new(0, 1)]);
        assert!(store.materialized().is_empty());
        assert_eq!(store.override_count(), 0);
    }
}
