use chrono::{DateTime, Utc};
use rand::{Rng, rngs::StdRng};

use crate::{
    config::WallConfig,
    export::{Compositor, ExportArtifact, options::ExportOptions, source::ImageSource},
    foundation::{
        core::{Photo, PhotoKey, Point, Viewport},
        error::WallResult,
    },
    wall::{
        drag::DragController,
        live::{LiveEvent, LiveOutcome, LiveStats, LiveUpdateAdapter},
        placement::{Wall, WallCard},
    },
};

/// One viewer's wall.
///
/// Every inbound operation takes `&mut self` and runs to completion, so no caller can
/// observe a half-applied insert, removal or relayout. Views share nothing: two views
/// fed the same events keep independent layouts and z-order counters.
pub struct WallView<R: Rng = StdRng> {
    wall: Wall<R>,
    drag: DragController,
    live: LiveUpdateAdapter,
}

impl WallView<StdRng> {
    pub fn seeded(cfg: WallConfig, viewport: Viewport, seed: u64) -> WallResult<Self> {
        Ok(Self::from_wall(Wall::seeded(cfg, viewport, seed)?))
    }
}

impl<R: Rng> WallView<R> {
    pub fn new(cfg: WallConfig, viewport: Viewport, rng: R) -> WallResult<Self> {
        Ok(Self::from_wall(Wall::new(cfg, viewport, rng)?))
    }

    fn from_wall(wall: Wall<R>) -> Self {
        let cfg = wall.config();
        let drag = DragController::new(cfg.z_base, cfg.click_suppression_ms);
        Self {
            wall,
            drag,
            live: LiveUpdateAdapter::new(),
        }
    }

    pub fn wall(&self) -> &Wall<R> {
        &self.wall
    }

    pub fn live_stats(&self) -> LiveStats {
        self.live.stats()
    }

    pub fn cards(&self) -> Vec<WallCard> {
        self.wall.cards_by_z()
    }

    /// Place the initial photo list, then run the bulk density check.
    pub fn load_initial(&mut self, photos: Vec<Photo>) -> usize {
        let placed = self.wall.load_initial(photos);
        tracing::debug!(placed, scale = self.wall.scale(), "initial photos loaded");
        placed
    }

    pub fn live_event(&mut self, event: LiveEvent) -> LiveOutcome {
        self.live.apply(&mut self.wall, event)
    }

    /// Apply one wire-format live event; malformed input is skipped.
    pub fn live_event_json(&mut self, line: &str) -> Option<LiveOutcome> {
        self.live.apply_json(&mut self.wall, line)
    }

    /// Raw-line variant of [`Self::live_event_json`]; invalid UTF-8 counts as malformed.
    pub fn live_event_bytes(&mut self, line: &[u8]) -> Option<LiveOutcome> {
        self.live.apply_bytes(&mut self.wall, line)
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.wall.resize(Viewport::new(width, height));
    }

    pub fn pointer_down(&mut self, p: Point) -> Option<PhotoKey> {
        self.drag.pointer_down(&mut self.wall, p)
    }

    pub fn pointer_move(&mut self, p: Point) -> bool {
        self.drag.pointer_move(&mut self.wall, p)
    }

    pub fn pointer_up(&mut self, now_ms: f64) {
        self.drag.pointer_up(now_ms);
    }

    /// Full-view request for a clicked card, unless the click ends a drag.
    pub fn click(&mut self, key: &PhotoKey, now_ms: f64) -> Option<Photo> {
        self.drag.click(&self.wall, key, now_ms)
    }

    /// Composite every tracked photo, in placement order.
    pub fn export(
        &self,
        compositor: &mut Compositor,
        source: &dyn ImageSource,
        opts: ExportOptions,
        now: DateTime<Utc>,
    ) -> WallResult<ExportArtifact> {
        compositor.export(&self.wall.snapshot(), source, opts, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(seed: u64) -> WallView {
        let cfg = WallConfig {
            jitter_range: 0.0,
            max_rotation_deg: 0.0,
            ..WallConfig::default()
        };
        WallView::seeded(cfg, Viewport::new(1000.0, 1000.0), seed).unwrap()
    }

    #[test]
    fn z_counters_are_per_view() {
        let mut a = view(1);
        let mut b = view(1);
        let photos = vec![Photo::new("x", "x.png", ""), Photo::new("y", "y.png", "")];
        a.load_initial(photos.clone());
        b.load_initial(photos);

        for _ in 0..3 {
            let p = a.wall().visual(&PhotoKey::from("x")).unwrap().rect().center();
            a.pointer_down(p);
            a.pointer_up(0.0);
        }
        let p = b.wall().visual(&PhotoKey::from("x")).unwrap().rect().center();
        b.pointer_down(p);

        assert_eq!(a.wall().visual(&PhotoKey::from("x")).unwrap().z, 1003);
        assert_eq!(b.wall().visual(&PhotoKey::from("x")).unwrap().z, 1001);
    }

    #[test]
    fn live_events_flow_into_the_wall() {
        let mut v = view(2);
        v.live_event_json(r#"{"event":"photo-added","key":"a","imageRef":"a.png"}"#);
        v.live_event(LiveEvent::PhotoAdded(Photo::new("b", "b.png", "")));
        assert!(v.live_event_json("nope").is_none());
        assert_eq!(v.cards().len(), 2);
        assert_eq!(v.live_stats().malformed, 1);

        v.live_event(LiveEvent::PhotoRemoved {
            key: PhotoKey::from("a"),
        });
        assert_eq!(v.cards().len(), 1);
    }

    #[test]
    fn resize_keeps_cards_in_bounds() {
        let mut v = view(3);
        v.load_initial((0..8).map(|i| Photo::new(format!("k{i}"), "r", "")).collect());
        v.resize(500.0, 500.0);
        v.wall().check_invariants().unwrap();
    }
}
