use crate::geometry::{Point3, Pose};
use crate::screen::ContentUrl;
use derive_more::{Deref, Display, From, Into};
use serde::{Deserialize, Serialize};
use serde_with::DeserializeFromStr;
use std::collections::BTreeSet;
use strum::{Display as StrumDisplay, EnumString};
use thiserror::Error;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    Deref,
    From,
    Into,
)]
#[serde(transparent)]
pub struct SlotIndex(usize);

impl SlotIndex {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }
}

/// One cartridge bay. Everything here is fixed for the life of the process.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub index: SlotIndex,
    pub rest_position: Point3,
    pub rotation: Point3,
    pub scale: f64,
    /// What the screen shows while this cartridge is inserted. A slot
    /// without content has no click handler.
    pub content: Option<ContentUrl>,
}

impl Slot {
    pub fn new(index: usize, rest_position: Point3) -> Self {
        Self {
            index: SlotIndex(index),
            rest_position,
            rotation: Point3::default(),
            scale: 1.0,
            content: None,
        }
    }

    pub fn with_content(mut self, content: ContentUrl) -> Self {
        self.content = Some(content);
        self
    }

    pub fn has_handler(&self) -> bool {
        self.content.is_some()
    }

    pub fn pose_at(&self, position: Point3) -> Pose {
        Pose {
            position,
            rotation: self.rotation,
            scale: self.scale,
        }
    }
}

/// What a click on a resting slot does while another slot holds the
/// active position.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    DeserializeFromStr,
    EnumString,
    StrumDisplay,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum SwapPolicy {
    /// Rejected outright. Only the active slot accepts input.
    #[strum(to_string = "exclusive", serialize = "locked")]
    Exclusive,
    /// Eject the active slot and queue the clicked one; a later click
    /// replaces the queued target.
    #[default]
    #[strum(to_string = "last-wins", serialize = "last", serialize = "replace")]
    LastWins,
    /// As `LastWins`, but a queued target is never replaced.
    #[strum(to_string = "first-wins", serialize = "first")]
    FirstWins,
}

impl SwapPolicy {
    pub fn allows_replace(self) -> bool {
        !matches!(self, Self::Exclusive)
    }
}

/// Activation status of one slot, derived from [`ActivationState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay)]
#[strum(serialize_all = "lowercase")]
pub enum SlotStatus {
    Resting,
    Activating,
    Active,
    Deactivating,
    Queued,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("slot {active} is active while slot {activating} is being inserted")]
    ActiveWhileActivating {
        active: SlotIndex,
        activating: SlotIndex,
    },
    #[error("activating slot {0} is not animating")]
    ActivatingNotAnimating(SlotIndex),
    #[error("pending slot {0} is already active or animating")]
    PendingConflict(SlotIndex),
    #[error("{0} slots are animating at once")]
    ConcurrentMotion(usize),
}

/// Who holds the active position and who is moving. Only the coordinator
/// writes this; everything else reads a clone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationState {
    active_slot: Option<SlotIndex>,
    animating_slots: BTreeSet<SlotIndex>,
    activating_slot: Option<SlotIndex>,
    pending_slot: Option<SlotIndex>,
}

impl ActivationState {
    pub fn active_slot(&self) -> Option<SlotIndex> {
        self.active_slot
    }

    pub fn animating_slots(&self) -> &BTreeSet<SlotIndex> {
        &self.animating_slots
    }

    pub fn activating_slot(&self) -> Option<SlotIndex> {
        self.activating_slot
    }

    pub fn pending_slot(&self) -> Option<SlotIndex> {
        self.pending_slot
    }

    pub fn is_animating(&self, slot: SlotIndex) -> bool {
        self.animating_slots.contains(&slot)
    }

    pub fn status(&self, slot: SlotIndex) -> SlotStatus {
        if self.activating_slot == Some(slot) {
            SlotStatus::Activating
        } else if self.active_slot == Some(slot) {
            if self.is_animating(slot) {
                SlotStatus::Deactivating
            } else {
                SlotStatus::Active
            }
        } else if self.pending_slot == Some(slot) {
            SlotStatus::Queued
        } else {
            SlotStatus::Resting
        }
    }

    pub(crate) fn begin_activation(&mut self, slot: SlotIndex) {
        self.animating_slots.insert(slot);
        self.activating_slot = Some(slot);
    }

    pub(crate) fn begin_deactivation(&mut self, slot: SlotIndex) {
        self.animating_slots.insert(slot);
        self.activating_slot = None;
    }

    pub(crate) fn finish_activation(&mut self, slot: SlotIndex) {
        self.active_slot = Some(slot);
        self.activating_slot = None;
        self.animating_slots.remove(&slot);
    }

    pub(crate) fn finish_deactivation(&mut self, slot: SlotIndex) {
        self.active_slot = None;
        self.animating_slots.remove(&slot);
    }

    pub(crate) fn set_pending(&mut self, slot: Option<SlotIndex>) {
        self.pending_slot = slot;
    }

    pub(crate) fn take_pending(&mut self) -> Option<SlotIndex> {
        self.pending_slot.take()
    }

    pub fn validate(&self) -> Result<(), InvariantViolation> {
        if let Some(activating) = self.activating_slot {
            if let Some(active) = self.active_slot
                && (active != activating || self.is_animating(active))
            {
                return Err(InvariantViolation::ActiveWhileActivating { active, activating });
            }
            if !self.is_animating(activating) {
                return Err(InvariantViolation::ActivatingNotAnimating(activating));
            }
        }
        if let Some(pending) = self.pending_slot
            && (self.active_slot == Some(pending) || self.is_animating(pending))
        {
            return Err(InvariantViolation::PendingConflict(pending));
        }
        if self.animating_slots.len() > 1 {
            return Err(InvariantViolation::ConcurrentMotion(self.animating_slots.len()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_policy_deserialization() {
        let cases = vec![
            ("\"exclusive\"", SwapPolicy::Exclusive),
            ("\"Locked\"", SwapPolicy::Exclusive),
            ("\"last-wins\"", SwapPolicy::LastWins),
            ("\"REPLACE\"", SwapPolicy::LastWins),
            ("\"first-wins\"", SwapPolicy::FirstWins),
            ("\"first\"", SwapPolicy::FirstWins),
        ];

        for (json, expected) in cases {
            let deserialized: SwapPolicy = serde_json::from_str(json).unwrap();
            assert_eq!(deserialized, expected);
        }
    }

    #[test]
    fn test_status_derivation() {
        let a = SlotIndex::new(0);
        let b = SlotIndex::new(1);
        let mut state = ActivationState::default();
        assert_eq!(state.status(a), SlotStatus::Resting);

        state.begin_activation(a);
        assert_eq!(state.status(a), SlotStatus::Activating);

        state.finish_activation(a);
        assert_eq!(state.status(a), SlotStatus::Active);

        state.begin_deactivation(a);
        state.set_pending(Some(b));
        assert_eq!(state.status(a), SlotStatus::Deactivating);
        assert_eq!(state.status(b), SlotStatus::Queued);
        assert_eq!(state.validate(), Ok(()));
    }

    #[test]
    fn test_validate_flags_pending_conflict() {
        let a = SlotIndex::new(2);
        let mut state = ActivationState::default();
        state.begin_activation(a);
        state.set_pending(Some(a));
        assert_eq!(state.validate(), Err(InvariantViolation::PendingConflict(a)));
    }

    #[test]
    fn test_validate_flags_second_mover() {
        let mut state = ActivationState::default();
        state.begin_activation(SlotIndex::new(0));
        state.finish_activation(SlotIndex::new(0));
        state.begin_activation(SlotIndex::new(1));
        assert!(matches!(
            state.validate(),
            Err(InvariantViolation::ActiveWhileActivating { .. })
        ));
    }
}
