//! The activation arbiter.
//!
//! [`Coordinator`] is the only writer of [`ActivationState`]. Pointer events
//! and clicks are applied between frames; [`Coordinator::advance`] then runs
//! one frame against a snapshot of that state, and applies the motion
//! completions it produced only after every slot has been stepped.

use crate::gate::Gate;
use crate::geometry::{MachineGeometry, Point3, Pose};
use crate::motion::{Direction, SlotMotion, SlotPhase};
use crate::overlay::Overlay;
use crate::screen::ContentUrl;
use crate::state::{ActivationState, Slot, SlotIndex, SlotStatus, SwapPolicy};
use crate::tween::{Tuning, Tween};
use std::time::Instant;

/// Live per-slot state. Written only by its own slot's motion and overlay.
#[derive(Debug, Clone)]
pub struct CartridgeRuntime {
    current_position: Point3,
    motion: Option<SlotMotion>,
    overlay: Overlay,
    pointer_over: bool,
}

impl CartridgeRuntime {
    fn new(rest_position: Point3, tuning: &Tuning) -> Self {
        Self {
            current_position: rest_position,
            motion: None,
            overlay: Overlay::new(tuning),
            pointer_over: false,
        }
    }

    pub fn current_position(&self) -> Point3 {
        self.current_position
    }

    pub fn phase(&self) -> SlotPhase {
        self.motion
            .as_ref()
            .map(SlotMotion::phase)
            .unwrap_or_default()
    }

    pub fn is_hovered(&self) -> bool {
        self.overlay.is_hovered()
    }

    pub fn is_pressed(&self) -> bool {
        self.overlay.is_pressed()
    }

    pub fn is_hover_settling(&self) -> bool {
        self.overlay.is_settling()
    }

    pub fn pointer_over(&self) -> bool {
        self.pointer_over
    }

    fn clear_feedback(&mut self) {
        let residual = self.overlay.clear();
        self.current_position = self.current_position.offset_depth(residual);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Gate refused the click; nothing changed.
    Rejected,
    /// Accepted but nothing to do in the current state.
    Ignored,
    Activating,
    Deactivating,
    /// Recorded as the slot to insert once the active one is out.
    Queued,
    /// Took the place of an earlier queued request.
    Replaced { previous: SlotIndex },
    /// Clicking the ejecting slot dropped the queued follow-up.
    PendingCancelled(SlotIndex),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotFrame {
    pub slot: SlotIndex,
    pub pose: Pose,
    pub phase: SlotPhase,
    pub gate: Gate,
}

/// Output of one render tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub slots: Vec<SlotFrame>,
    /// Slots whose phase program finished this frame.
    pub completed: Vec<SlotIndex>,
    /// Queued slot whose insertion started after the settle delay.
    pub started: Option<SlotIndex>,
}

pub struct Coordinator {
    slots: Vec<Slot>,
    geometry: MachineGeometry,
    tuning: Tuning,
    policy: SwapPolicy,
    state: ActivationState,
    runtime: Vec<CartridgeRuntime>,
    settle_deadline: Option<Instant>,
}

impl Coordinator {
    pub fn new(
        slots: Vec<Slot>,
        geometry: MachineGeometry,
        tuning: Tuning,
        policy: SwapPolicy,
    ) -> Self {
        for (i, slot) in slots.iter().enumerate() {
            assert_eq!(*slot.index, i, "slot list must be ordered by index");
        }
        let runtime = slots
            .iter()
            .map(|s| CartridgeRuntime::new(s.rest_position, &tuning))
            .collect();

        Self {
            slots,
            geometry,
            tuning,
            policy,
            state: ActivationState::default(),
            runtime,
            settle_deadline: None,
        }
    }

    pub fn state(&self) -> &ActivationState {
        &self.state
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot(&self, slot: SlotIndex) -> &Slot {
        &self.slots[self.check(slot)]
    }

    pub fn runtime(&self, slot: SlotIndex) -> &CartridgeRuntime {
        &self.runtime[self.check(slot)]
    }

    pub fn status(&self, slot: SlotIndex) -> SlotStatus {
        self.check(slot);
        self.state.status(slot)
    }

    pub fn policy(&self) -> SwapPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: SwapPolicy) {
        if policy != self.policy {
            log::info!("swap policy {} -> {}", self.policy, policy);
            self.policy = policy;
        }
    }

    pub fn set_content(&mut self, slot: SlotIndex, content: Option<ContentUrl>) {
        let i = self.check(slot);
        self.slots[i].content = content;
    }

    pub fn active_content(&self) -> Option<&ContentUrl> {
        self.state
            .active_slot()
            .and_then(|s| self.slots[*s].content.as_ref())
    }

    pub fn settle_deadline(&self) -> Option<Instant> {
        self.settle_deadline
    }

    /// Nothing moving, nothing queued.
    pub fn is_settled(&self) -> bool {
        self.state.animating_slots().is_empty()
            && self.state.pending_slot().is_none()
            && self.settle_deadline.is_none()
    }

    pub fn gate(&self, slot: SlotIndex) -> Gate {
        let i = self.check(slot);
        Gate::evaluate(
            &self.state,
            self.policy,
            slot,
            self.slots[i].has_handler(),
            self.runtime[i].pointer_over,
        )
    }

    fn check(&self, slot: SlotIndex) -> usize {
        assert!(
            *slot < self.slots.len(),
            "slot {slot} does not exist ({} slots)",
            self.slots.len()
        );
        *slot
    }

    fn takes_feedback(&self, slot: SlotIndex) -> bool {
        !self.state.is_animating(slot)
            && self.state.pending_slot() != Some(slot)
            && self.gate(slot).accepts
    }

    pub fn pointer_enter(&mut self, slot: SlotIndex) {
        let i = self.check(slot);
        self.runtime[i].pointer_over = true;
        if self.takes_feedback(slot) {
            self.runtime[i].overlay.enter();
        }
    }

    pub fn pointer_leave(&mut self, slot: SlotIndex) {
        let i = self.check(slot);
        let rt = &mut self.runtime[i];
        rt.pointer_over = false;
        rt.overlay.leave();
    }

    pub fn pointer_down(&mut self, slot: SlotIndex) {
        let i = self.check(slot);
        if self.takes_feedback(slot) {
            self.runtime[i].overlay.press();
        }
    }

    pub fn pointer_up(&mut self, slot: SlotIndex) {
        let i = self.check(slot);
        self.runtime[i].overlay.release();
    }

    pub fn click(&mut self, slot: SlotIndex) -> ClickOutcome {
        self.check(slot);

        let outcome = if !self.gate(slot).accepts {
            ClickOutcome::Rejected
        } else {
            match self.state.status(slot) {
                SlotStatus::Active => {
                    self.state.set_pending(None);
                    self.start(slot, Direction::Eject);
                    ClickOutcome::Deactivating
                }
                SlotStatus::Deactivating => match self.state.take_pending() {
                    Some(pending) => ClickOutcome::PendingCancelled(pending),
                    None => ClickOutcome::Ignored,
                },
                SlotStatus::Activating | SlotStatus::Queued => ClickOutcome::Ignored,
                SlotStatus::Resting => self.request(slot),
            }
        };

        log::debug!("click on slot {slot}: {outcome:?}");
        debug_assert_eq!(self.state.validate(), Ok(()));
        outcome
    }

    fn request(&mut self, slot: SlotIndex) -> ClickOutcome {
        if let Some(active) = self.state.active_slot() {
            if self.state.status(active) == SlotStatus::Active {
                self.start(active, Direction::Eject);
            }
            self.enqueue(slot)
        } else if self.state.activating_slot().is_some() {
            ClickOutcome::Ignored
        } else if self.state.pending_slot().is_some() {
            // between an ejection and the delayed insertion
            self.enqueue(slot)
        } else {
            self.start(slot, Direction::Insert);
            ClickOutcome::Activating
        }
    }

    fn enqueue(&mut self, slot: SlotIndex) -> ClickOutcome {
        let outcome = match (self.state.pending_slot(), self.policy) {
            (None, _) => ClickOutcome::Queued,
            (Some(previous), SwapPolicy::LastWins) => ClickOutcome::Replaced { previous },
            (Some(_), SwapPolicy::FirstWins | SwapPolicy::Exclusive) => {
                return ClickOutcome::Ignored;
            }
        };
        self.state.set_pending(Some(slot));
        // stays on its bay until inserted, so the offset eases out in place
        self.runtime[*slot].overlay.withdraw();
        outcome
    }

    fn start(&mut self, slot: SlotIndex, direction: Direction) {
        let rest = self.slots[*slot].rest_position;
        let tween = Tween::phase(self.tuning.phase_speed);
        let clearance = self.geometry.clearance_depth;
        let active = self.geometry.active_position;

        let rt = &mut self.runtime[*slot];
        rt.clear_feedback();
        rt.motion = Some(match direction {
            Direction::Insert => SlotMotion::insert(rest, active, clearance, tween),
            Direction::Eject => SlotMotion::eject(rest, active, clearance, tween),
        });

        match direction {
            Direction::Insert => self.state.begin_activation(slot),
            Direction::Eject => self.state.begin_deactivation(slot),
        }
        log::debug!("slot {slot}: {direction} started");
    }

    fn complete(&mut self, slot: SlotIndex, now: Instant) {
        self.runtime[*slot].motion = None;

        if self.state.activating_slot() == Some(slot) {
            self.state.finish_activation(slot);
            log::info!("slot {slot} inserted");
        } else if self.state.active_slot() == Some(slot) {
            self.state.finish_deactivation(slot);
            log::info!("slot {slot} ejected");
            if let Some(pending) = self.state.pending_slot() {
                self.settle_deadline = Some(now + self.tuning.settle_delay);
                log::debug!("slot {pending} waits {:?}", self.tuning.settle_delay);
            }
        } else {
            log::warn!("slot {slot} finished a program it was not running");
        }
        debug_assert_eq!(self.state.validate(), Ok(()));
    }

    fn poll_settle(&mut self, now: Instant) -> Option<SlotIndex> {
        let deadline = self.settle_deadline?;
        if now < deadline {
            return None;
        }
        self.settle_deadline = None;
        let next = self.state.take_pending()?;
        self.start(next, Direction::Insert);
        Some(next)
    }

    /// Runs one render tick.
    ///
    /// Motion, overlay and gate all read the same snapshot; completions and
    /// the settle timer are applied after the whole frame is composed.
    pub fn advance(&mut self, now: Instant) -> Frame {
        let snapshot = self.state.clone();
        let mut completed = Vec::new();
        let mut frames = Vec::with_capacity(self.slots.len());

        for (slot, rt) in self.slots.iter().zip(self.runtime.iter_mut()) {
            let index = slot.index;
            let offset = if snapshot.is_animating(index) {
                if let Some(motion) = rt.motion.as_mut() {
                    let step = motion.advance(rt.current_position);
                    rt.current_position = step.position;
                    if step.completed {
                        completed.push(index);
                    }
                }
                0.0
            } else {
                rt.overlay.advance()
            };

            frames.push(SlotFrame {
                slot: index,
                pose: slot.pose_at(rt.current_position.offset_depth(offset)),
                phase: rt.phase(),
                gate: Gate::evaluate(
                    &snapshot,
                    self.policy,
                    index,
                    slot.has_handler(),
                    rt.pointer_over,
                ),
            });
        }

        for &slot in &completed {
            self.complete(slot, now);
        }
        let started = self.poll_settle(now);

        Frame {
            slots: frames,
            completed,
            started,
        }
    }
}
