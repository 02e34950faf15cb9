use gridmerge_core::{CellId, CellState, InteractionOutcome, Token};

/// Result of evaluating the interaction rules against a single cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Transition {
    pub(crate) outcome: InteractionOutcome,
    pub(crate) inventory: Option<Token>,
    pub(crate) state: CellState,
}

impl Transition {
    fn unchanged(outcome: InteractionOutcome, inventory: Option<Token>, state: CellState) -> Self {
        Self {
            outcome,
            inventory,
            state,
        }
    }
}

/// Evaluates the pickup, placement, and merge rules.
///
/// The range check runs before any inventory or cell inspection.
pub(crate) fn resolve(
    player: CellId,
    target: CellId,
    inventory: Option<Token>,
    state: CellState,
) -> Transition {
    if !player.within_reach(target) {
        return Transition::unchanged(InteractionOutcome::OutOfRange, inventory, state);
    }

    match (inventory, state.token()) {
        (None, None) => Transition::unchanged(InteractionOutcome::NothingToDo, inventory, state),
        (None, Some(token)) => Transition {
            outcome: InteractionOutcome::PickedUp { token },
            inventory: Some(token),
            state: CellState::EMPTY,
        },
        (Some(token), None) => Transition {
            outcome: InteractionOutcome::Placed { token },
            inventory: None,
            state: CellState::holding(token),
        },
        (Some(held), Some(present)) if held == present => match held.doubled() {
            Some(merged) => Transition {
                outcome: InteractionOutcome::Merged { token: merged },
                inventory: None,
                state: CellState::holding(merged),
            },
            None => Transition::unchanged(InteractionOutcome::NoValidInteraction, inventory, state),
        },
        (Some(_), Some(_)) => {
            Transition::unchanged(InteractionOutcome::NoValidInteraction, inventory, state)
        }
    }
}
