use slotbay::{Cursor, Pose, SlotIndex};
use std::collections::HashMap;

/// The scene side of the deck: owns the cartridge bodies and the screen.
pub trait Renderer {
    fn register_body(&mut self, slot: SlotIndex, pose: &Pose);

    /// A body may still be loading; poses sent before it is ready are lost.
    fn is_body_ready(&self, slot: SlotIndex) -> bool;

    fn set_pose(&mut self, slot: SlotIndex, pose: &Pose);

    fn set_cursor(&mut self, slot: SlotIndex, cursor: Cursor);

    fn load_screen(&mut self, url: &str);

    /// Called once at the end of every frame.
    fn present(&mut self) {}
}

#[derive(Debug, Clone)]
pub struct Body {
    pub pose: Pose,
    pub cursor: Cursor,
    registered_at: u64,
}

/// Renderer without a display. Bodies become ready after `warmup_frames`
/// presented frames, standing in for asynchronous mesh loading.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    warmup_frames: u64,
    frames: u64,
    bodies: HashMap<SlotIndex, Body>,
    screen_url: Option<String>,
    screen_loads: usize,
}

impl HeadlessRenderer {
    pub fn new(warmup_frames: u32) -> Self {
        Self {
            warmup_frames: u64::from(warmup_frames),
            ..Self::default()
        }
    }

    pub fn body(&self, slot: SlotIndex) -> Option<&Body> {
        self.bodies.get(&slot)
    }

    pub fn screen_url(&self) -> Option<&str> {
        self.screen_url.as_deref()
    }

    pub fn screen_loads(&self) -> usize {
        self.screen_loads
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Renderer for HeadlessRenderer {
    fn register_body(&mut self, slot: SlotIndex, pose: &Pose) {
        self.bodies.insert(
            slot,
            Body {
                pose: *pose,
                cursor: Cursor::Default,
                registered_at: self.frames,
            },
        );
    }

    fn is_body_ready(&self, slot: SlotIndex) -> bool {
        self.bodies
            .get(&slot)
            .is_some_and(|b| self.frames - b.registered_at >= self.warmup_frames)
    }

    fn set_pose(&mut self, slot: SlotIndex, pose: &Pose) {
        if let Some(body) = self.bodies.get_mut(&slot)
            && body.pose != *pose
        {
            log::trace!(
                "slot {slot} -> ({:.2}, {:.2}, {:.2})",
                pose.position.x,
                pose.position.y,
                pose.position.z
            );
            body.pose = *pose;
        }
    }

    fn set_cursor(&mut self, slot: SlotIndex, cursor: Cursor) {
        if let Some(body) = self.bodies.get_mut(&slot)
            && body.cursor != cursor
        {
            log::trace!("slot {slot} cursor {cursor}");
            body.cursor = cursor;
        }
    }

    fn load_screen(&mut self, url: &str) {
        log::info!("screen: {url}");
        self.screen_url = Some(url.to_string());
        self.screen_loads += 1;
    }

    fn present(&mut self) {
        self.frames += 1;
    }
}
