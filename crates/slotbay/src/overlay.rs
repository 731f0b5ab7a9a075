use crate::tween::{Tuning, Tween};

/// Pointer feedback of an idle slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Feedback {
    #[default]
    Rest,
    Hover,
    Press,
    /// Pointer has left; the offset is still easing back to zero.
    Settling,
}

/// Transient depth offset drawn on top of a slot's resting position.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    feedback: Feedback,
    offset: f64,
    hover_offset: f64,
    press_offset: f64,
    tween: Tween,
}

impl Overlay {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            feedback: Feedback::Rest,
            offset: 0.0,
            hover_offset: tuning.hover_offset,
            press_offset: tuning.press_offset,
            tween: Tween::settle(tuning.overlay_speed),
        }
    }

    pub fn feedback(&self) -> Feedback {
        self.feedback
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn is_hovered(&self) -> bool {
        matches!(self.feedback, Feedback::Hover | Feedback::Press)
    }

    pub fn is_pressed(&self) -> bool {
        self.feedback == Feedback::Press
    }

    pub fn is_settling(&self) -> bool {
        self.feedback == Feedback::Settling
    }

    pub fn enter(&mut self) {
        if matches!(self.feedback, Feedback::Rest | Feedback::Settling) {
            self.feedback = Feedback::Hover;
        }
    }

    pub fn leave(&mut self) {
        if self.is_hovered() {
            self.feedback = Feedback::Settling;
        }
    }

    pub fn press(&mut self) {
        if self.feedback == Feedback::Hover {
            self.feedback = Feedback::Press;
        }
    }

    pub fn release(&mut self) {
        if self.feedback == Feedback::Press {
            self.feedback = Feedback::Hover;
        }
    }

    /// Drops hover and press, letting whatever offset is still applied ease
    /// back to zero.
    pub fn withdraw(&mut self) {
        self.feedback = if self.offset == 0.0 {
            Feedback::Rest
        } else {
            Feedback::Settling
        };
    }

    /// Drops all feedback and returns the offset that was still applied, so
    /// the caller can fold it into the base position.
    pub fn clear(&mut self) -> f64 {
        self.feedback = Feedback::Rest;
        std::mem::take(&mut self.offset)
    }

    fn target(&self) -> f64 {
        match self.feedback {
            Feedback::Press => self.press_offset,
            Feedback::Hover => self.hover_offset,
            Feedback::Rest | Feedback::Settling => 0.0,
        }
    }

    /// Eases the offset one frame toward its target and returns it.
    pub fn advance(&mut self) -> f64 {
        let target = self.target();
        if self.offset != target {
            let step = self.tween.step(self.offset, target);
            self.offset = if step.arrived { target } else { step.value };
        }
        if self.offset == target && self.feedback == Feedback::Settling {
            self.feedback = Feedback::Rest;
        }
        self.offset
    }
}
