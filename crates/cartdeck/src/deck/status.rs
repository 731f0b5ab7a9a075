use parking_lot::RwLock;
use slotbay::SlotIndex;
use std::fmt;
use std::sync::Arc;

/// Read-only view of the deck published after every frame, for the control
/// socket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeckStatus {
    pub active: Option<SlotIndex>,
    pub pending: Option<SlotIndex>,
    pub animating: Vec<SlotIndex>,
    pub screen_url: String,
    pub frame: u64,
}

pub type SharedStatus = Arc<RwLock<DeckStatus>>;

fn slot_or_dash(slot: Option<SlotIndex>) -> String {
    slot.map_or_else(|| "-".to_string(), |s| s.to_string())
}

impl fmt::Display for DeckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let animating: Vec<_> = self.animating.iter().map(ToString::to_string).collect();
        write!(
            f,
            "active={} pending={} animating=[{}] frame={} screen={}",
            slot_or_dash(self.active),
            slot_or_dash(self.pending),
            animating.join(","),
            self.frame,
            self.screen_url
        )
    }
}
