//! Cartridge slot state machine: which cartridge is inserted, how each one
//! moves between its bay and the shared insertion point, and how pointer
//! feedback is layered on top of that motion.

mod macros;

pub mod coordinator;
pub mod gate;
pub mod geometry;
pub mod motion;
pub mod overlay;
pub mod screen;
pub mod state;
pub mod tween;

pub use coordinator::{CartridgeRuntime, ClickOutcome, Coordinator, Frame, SlotFrame};
pub use gate::{Cursor, Gate};
pub use geometry::{MachineGeometry, Point3, Pose};
pub use motion::{Direction, SlotMotion, SlotPhase};
pub use overlay::{Feedback, Overlay};
pub use screen::{AccessKey, ContentUrl, ScreenSource};
pub use state::{ActivationState, InvariantViolation, Slot, SlotIndex, SlotStatus, SwapPolicy};
pub use tween::{Tuning, Tween};
