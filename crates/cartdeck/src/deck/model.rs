use crate::config::{self, Config};
use crate::deck::status::{DeckStatus, SharedStatus};
use crate::events::{AppEvent, PointerKind};
use crate::render::Renderer;
use slotbay::{ClickOutcome, ContentUrl, Coordinator, ScreenSource, SlotIndex};
use std::collections::BTreeSet;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// The cartridge machine as seen by the frame loop: the slot coordinator,
/// the renderer it drives, and the screen.
pub struct Deck<R: Renderer> {
    coordinator: Coordinator,
    renderer: R,
    screen: ScreenSource,
    /// Content the screen was last resolved for; `None` forces a reload.
    screen_content: Option<Option<ContentUrl>>,
    screen_url: Option<String>,
    config: Config,
    /// Bodies whose pose is held back until the renderer has them loaded.
    deferred: BTreeSet<SlotIndex>,
    status: SharedStatus,
    frame: u64,
}

impl<R: Renderer> Deck<R> {
    pub fn new(config: &Config, mut renderer: R, status: SharedStatus) -> Self {
        let coordinator = Coordinator::new(
            config.build_slots(),
            config.machine,
            config.tuning,
            config.swap_policy,
        );
        for slot in coordinator.slots() {
            renderer.register_body(slot.index, &slot.pose_at(slot.rest_position));
        }

        Self {
            coordinator,
            renderer,
            screen: config.screen_source(),
            screen_content: None,
            screen_url: None,
            config: config.clone(),
            deferred: BTreeSet::new(),
            status,
            frame: 0,
        }
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn slot_count(&self) -> usize {
        self.coordinator.slots().len()
    }

    pub fn handle(&mut self, event: AppEvent) -> Flow {
        match event {
            AppEvent::Pointer(kind, slot) => self.pointer(kind, slot),
            AppEvent::ConfigReload => match config::load_config() {
                Ok(new_config) => {
                    self.apply_config(&new_config);
                    log::info!("Configuration reloaded");
                }
                Err(e) => log::error!("Failed to reload config: {}", e),
            },
            AppEvent::Shutdown => return Flow::Exit,
        }
        Flow::Continue
    }

    fn pointer(&mut self, kind: PointerKind, slot: SlotIndex) {
        match kind {
            PointerKind::Enter => self.coordinator.pointer_enter(slot),
            PointerKind::Leave => self.coordinator.pointer_leave(slot),
            PointerKind::Down => self.coordinator.pointer_down(slot),
            PointerKind::Up => self.coordinator.pointer_up(slot),
            PointerKind::Click => {
                let gate = self.coordinator.gate(slot);
                if !gate.accepts || !self.coordinator.slot(slot).has_handler() {
                    log::debug!("click on slot {slot} not accepted");
                    return;
                }
                match self.coordinator.click(slot) {
                    ClickOutcome::Ignored | ClickOutcome::Rejected => {}
                    outcome => log::info!("slot {slot}: {outcome:?}"),
                }
            }
        }
    }

    /// Applies the parts of a new config that a running deck can take.
    /// Bays cannot move once the deck is up, and a cartridge that is in the
    /// machine or queued for it keeps its content.
    pub fn apply_config(&mut self, new_config: &Config) {
        if self.config.geometry_differs(new_config) {
            log::warn!("Slot geometry changes are ignored until restart");
        }

        let state = self.coordinator.state();
        let engaged = [
            state.active_slot(),
            state.activating_slot(),
            state.pending_slot(),
        ];

        let mut slots = std::mem::take(&mut self.config.slots);
        for (i, (slot_cfg, new)) in slots.iter_mut().zip(&new_config.slots).enumerate() {
            let index = SlotIndex::new(i);
            if new.content.is_none() && engaged.contains(&Some(index)) {
                log::warn!("slot {index} is in use, keeping its content");
                continue;
            }
            slot_cfg.content = new.content.clone();
            self.coordinator.set_content(index, slot_cfg.content.clone());
        }
        self.coordinator.set_policy(new_config.swap_policy);
        self.screen = new_config.screen_source();
        self.screen_content = None;

        self.config = Config {
            machine: self.config.machine,
            tuning: self.config.tuning,
            slots,
            ..new_config.clone()
        };
    }

    /// One render tick: step the state machine, push poses for bodies that
    /// are ready, and swap the screen if the active cartridge changed.
    pub fn frame(&mut self, now: Instant) {
        let frame = self.coordinator.advance(now);

        for slot_frame in &frame.slots {
            let slot = slot_frame.slot;
            if self.renderer.is_body_ready(slot) {
                if self.deferred.remove(&slot) {
                    log::debug!("slot {slot} body ready");
                }
                self.renderer.set_pose(slot, &slot_frame.pose);
                self.renderer.set_cursor(slot, slot_frame.gate.cursor);
            } else if self.deferred.insert(slot) {
                log::debug!("slot {slot} body not ready, holding its pose");
            }
        }

        let content = self.coordinator.active_content().cloned();
        if self.screen_content.as_ref() != Some(&content) {
            match self.screen.url_for(content.as_ref()) {
                Ok(url) if self.screen_url.as_deref() != Some(url.as_str()) => {
                    self.renderer.load_screen(url.as_str());
                    self.screen_url = Some(url.into());
                }
                Ok(_) => {}
                Err(e) => log::error!("Cannot build screen URL: {}", e),
            }
            self.screen_content = Some(content);
        }

        self.renderer.present();
        self.frame += 1;
        self.publish();
    }

    fn publish(&self) {
        let state = self.coordinator.state();
        *self.status.write() = DeckStatus {
            active: state.active_slot(),
            pending: state.pending_slot(),
            animating: state.animating_slots().iter().copied().collect(),
            screen_url: self.screen_url.clone().unwrap_or_default(),
            frame: self.frame,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::HeadlessRenderer;
    use slotbay::{Cursor, SlotStatus, SwapPolicy};
    use std::time::Duration;

    fn deck(warmup: u32) -> Deck<HeadlessRenderer> {
        let config = Config {
            warmup_frames: warmup,
            ..Config::default()
        };
        Deck::new(
            &config,
            HeadlessRenderer::new(warmup),
            SharedStatus::default(),
        )
    }

    fn run(deck: &mut Deck<HeadlessRenderer>, start: Instant, frames: u32) -> Instant {
        let mut now = start;
        for _ in 0..frames {
            now += Duration::from_millis(16);
            deck.frame(now);
        }
        now
    }

    fn click(deck: &mut Deck<HeadlessRenderer>, slot: usize) {
        deck.handle(AppEvent::Pointer(PointerKind::Click, SlotIndex::new(slot)));
    }

    #[test]
    fn test_screen_follows_active_slot() {
        let mut d = deck(0);
        let now = run(&mut d, Instant::now(), 1);
        assert_eq!(d.renderer().screen_url(), Some("https://cartdeck.local/"));

        click(&mut d, 1);
        run(&mut d, now, 1_000);
        assert_eq!(
            d.renderer().screen_url(),
            Some("https://cartdeck.local/cartridge/1")
        );
        assert_eq!(d.status.read().active, Some(SlotIndex::new(1)));
    }

    #[test]
    fn test_poses_held_until_body_ready() {
        let mut d = deck(5);
        let slot = SlotIndex::new(0);
        let rest = d.coordinator().slot(slot).rest_position;

        click(&mut d, 0);
        let now = run(&mut d, Instant::now(), 3);
        assert_eq!(d.renderer().body(slot).unwrap().pose.position, rest);
        assert_eq!(d.coordinator().status(slot), SlotStatus::Activating);

        run(&mut d, now, 5);
        let shown = d.renderer().body(slot).unwrap().pose.position;
        assert_ne!(shown, rest);
        assert_eq!(shown, d.coordinator().runtime(slot).current_position());
    }

    #[test]
    fn test_click_without_handler_is_dropped() {
        let mut d = deck(0);
        d.coordinator.set_content(SlotIndex::new(2), None);

        click(&mut d, 2);
        assert_eq!(d.coordinator().status(SlotIndex::new(2)), SlotStatus::Resting);
    }

    #[test]
    fn test_cursor_reaches_renderer() {
        let mut d = deck(0);
        d.handle(AppEvent::Pointer(PointerKind::Enter, SlotIndex::new(3)));
        run(&mut d, Instant::now(), 1);
        let body = d.renderer().body(SlotIndex::new(3)).unwrap();
        assert_eq!(body.cursor, Cursor::Pointer);
    }

    #[test]
    fn test_apply_config_keeps_geometry() {
        let mut d = deck(0);
        let mut new_config = Config::default();
        new_config.slots[0].rest.x = 999.0;
        new_config.slots[0].content = Some(ContentUrl::new("https://new/0"));
        new_config.access_key = Some("abc".to_string().into());

        d.apply_config(&new_config);
        let slot = d.coordinator().slot(SlotIndex::new(0));
        assert_eq!(slot.rest_position.x, -150.0);
        assert_eq!(slot.content, Some(ContentUrl::new("https://new/0")));

        run(&mut d, Instant::now(), 1);
        assert_eq!(d.renderer().screen_url(), Some("https://cartdeck.local/?key=abc"));
    }

    #[test]
    fn test_reload_keeps_content_of_inserted_cartridge() {
        let config = Config {
            swap_policy: SwapPolicy::Exclusive,
            ..Config::default()
        };
        let mut d = Deck::new(&config, HeadlessRenderer::new(0), SharedStatus::default());
        click(&mut d, 1);
        let now = run(&mut d, Instant::now(), 1_000);
        assert_eq!(d.coordinator().state().active_slot(), Some(SlotIndex::new(1)));

        let mut new_config = config.clone();
        new_config.slots[1].content = None;
        new_config.slots[2].content = None;
        d.apply_config(&new_config);
        assert!(d.coordinator().slot(SlotIndex::new(1)).has_handler());
        assert!(!d.coordinator().slot(SlotIndex::new(2)).has_handler());

        run(&mut d, now, 1);
        assert_eq!(
            d.renderer().screen_url(),
            Some("https://cartdeck.local/cartridge/1")
        );

        click(&mut d, 1);
        assert_eq!(
            d.coordinator().status(SlotIndex::new(1)),
            SlotStatus::Deactivating
        );
    }

    #[test]
    fn test_unchanged_screen_is_not_reloaded() {
        let mut d = deck(0);
        let now = run(&mut d, Instant::now(), 1);
        d.apply_config(&Config::default());
        run(&mut d, now, 1);
        assert_eq!(d.renderer().screen_loads(), 1);
    }

    #[test]
    fn test_shutdown_exits() {
        let mut d = deck(0);
        assert_eq!(d.handle(AppEvent::Shutdown), Flow::Exit);
    }
}
