use crate::state::{ActivationState, SlotIndex, SwapPolicy};
use strum::{Display as StrumDisplay, EnumString};

/// Cursor affordance, named after the CSS cursor keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, StrumDisplay)]
#[strum(serialize_all = "kebab-case")]
pub enum Cursor {
    Pointer,
    NotAllowed,
    #[default]
    Default,
}

/// Whether a slot takes pointer input this frame, and how to show it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
    pub accepts: bool,
    pub cursor: Cursor,
}

impl Gate {
    pub fn evaluate(
        state: &ActivationState,
        policy: SwapPolicy,
        slot: SlotIndex,
        has_handler: bool,
        pointer_over: bool,
    ) -> Self {
        let accepts = match state.active_slot() {
            None => true,
            Some(active) => active == slot || policy.allows_replace(),
        };

        let cursor = match (accepts, pointer_over) {
            (true, _) if has_handler => Cursor::Pointer,
            (false, true) => Cursor::NotAllowed,
            _ => Cursor::Default,
        };

        Self { accepts, cursor }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active(slot: usize) -> ActivationState {
        let mut state = ActivationState::default();
        state.begin_activation(SlotIndex::new(slot));
        state.finish_activation(SlotIndex::new(slot));
        state
    }

    #[test]
    fn test_everyone_accepts_when_nothing_is_active() {
        let state = ActivationState::default();
        let gate = Gate::evaluate(&state, SwapPolicy::Exclusive, SlotIndex::new(3), true, false);
        assert!(gate.accepts);
        assert_eq!(gate.cursor, Cursor::Pointer);
    }

    #[test]
    fn test_exclusive_rejects_other_slots() {
        let state = active(1);
        let own = Gate::evaluate(&state, SwapPolicy::Exclusive, SlotIndex::new(1), true, true);
        let other = Gate::evaluate(&state, SwapPolicy::Exclusive, SlotIndex::new(2), true, true);
        let away = Gate::evaluate(&state, SwapPolicy::Exclusive, SlotIndex::new(2), true, false);

        assert!(own.accepts);
        assert!(!other.accepts);
        assert_eq!(other.cursor, Cursor::NotAllowed);
        assert_eq!(away.cursor, Cursor::Default);
    }

    #[test]
    fn test_replace_policies_accept_other_slots() {
        let state = active(1);
        for policy in [SwapPolicy::LastWins, SwapPolicy::FirstWins] {
            assert!(Gate::evaluate(&state, policy, SlotIndex::new(0), true, true).accepts);
        }
    }

    #[test]
    fn test_no_handler_shows_default_cursor() {
        let state = ActivationState::default();
        let gate = Gate::evaluate(&state, SwapPolicy::LastWins, SlotIndex::new(0), false, true);
        assert!(gate.accepts);
        assert_eq!(gate.cursor, Cursor::Default);
    }

    #[test]
    fn test_cursor_names() {
        assert_eq!(Cursor::NotAllowed.to_string(), "not-allowed");
        assert_eq!(Cursor::Pointer.to_string(), "pointer");
    }
}
