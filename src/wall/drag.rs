use rand::Rng;

use crate::{
    foundation::core::{Photo, PhotoKey, Point, Vec2},
    wall::placement::Wall,
};

#[derive(Clone, Debug, PartialEq)]
struct Capture {
    key: PhotoKey,
    /// Pointer position relative to the card's top-left corner at pointer-down.
    grab: Vec2,
}

/// Manual repositioning of placed cards.
///
/// Only the visual position and stacking order change; cell ownership, eviction order
/// and occupancy stay as placed. The z counter belongs to this controller, so every
/// wall view stacks its own cards independently.
#[derive(Clone, Debug)]
pub struct DragController {
    z_counter: u32,
    suppression_ms: f64,
    capture: Option<Capture>,
    /// Card whose click-to-expand is ignored until the given time.
    suppressed: Option<(PhotoKey, f64)>,
}

impl DragController {
    pub fn new(z_base: u32, suppression_ms: f64) -> Self {
        Self {
            z_counter: z_base,
            suppression_ms,
            capture: None,
            suppressed: None,
        }
    }

    pub fn dragging(&self) -> Option<&PhotoKey> {
        self.capture.as_ref().map(|c| &c.key)
    }

    /// Capture the topmost card under the pointer and bring it to the front.
    pub fn pointer_down<R: Rng>(&mut self, wall: &mut Wall<R>, p: Point) -> Option<PhotoKey> {
        let key = wall.hit_test(p)?;
        let visual = wall.visual_mut(&key)?;
        self.z_counter = self.z_counter.saturating_add(1);
        visual.z = self.z_counter;
        let grab = Vec2::new(p.x - visual.left, p.y - visual.top);
        self.capture = Some(Capture {
            key: key.clone(),
            grab,
        });
        Some(key)
    }

    /// Follow the pointer. Returns `false` when nothing is being dragged.
    pub fn pointer_move<R: Rng>(&mut self, wall: &mut Wall<R>, p: Point) -> bool {
        let Some(capture) = self.capture.clone() else {
            return false;
        };
        let Some(visual) = wall.visual_mut(&capture.key) else {
            // Removed or evicted mid-drag.
            self.capture = None;
            return false;
        };
        visual.left = p.x - capture.grab.x;
        visual.top = p.y - capture.grab.y;
        true
    }

    pub fn pointer_up(&mut self, now_ms: f64) {
        if let Some(capture) = self.capture.take() {
            self.suppressed = Some((capture.key, now_ms + self.suppression_ms));
        }
    }

    /// Resolve a click into a full-view request.
    ///
    /// Clicks on the card being dragged, or released less than the suppression window
    /// ago, belong to the drag gesture and yield nothing.
    pub fn click<R: Rng>(&mut self, wall: &Wall<R>, key: &PhotoKey, now_ms: f64) -> Option<Photo> {
        if self.dragging() == Some(key) {
            return None;
        }
        match self.suppressed.take() {
            Some((suppressed, until)) if now_ms < until => {
                let blocked = &suppressed == key;
                self.suppressed = Some((suppressed, until));
                if blocked {
                    return None;
                }
            }
            _ => {}
        }
        wall.photo(key).cloned()
    }
}
