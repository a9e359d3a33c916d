use crate::config::WallConfig;

/// Shrink-only zoom policy of the wall.
///
/// The controller only decides; the wall performs the rescale and relayout so that
/// grid state keeps a single owner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DensityController {
    pub min_scale: f64,
    pub zoom_step: f64,
    pub reactive_threshold: f64,
    pub bulk_threshold: f64,
    pub capacity_ratio: f64,
}

impl DensityController {
    pub fn from_config(cfg: &WallConfig) -> Self {
        Self {
            min_scale: cfg.min_scale,
            zoom_step: cfg.zoom_step,
            reactive_threshold: cfg.reactive_threshold,
            bulk_threshold: cfg.bulk_threshold,
            capacity_ratio: cfg.capacity_ratio,
        }
    }

    /// `count / capacity`; an empty wall is 0 and a zero-capacity grid with photos is full.
    pub fn occupancy_ratio(count: usize, capacity: u32) -> f64 {
        if count == 0 {
            return 0.0;
        }
        if capacity == 0 {
            return f64::INFINITY;
        }
        count as f64 / f64::from(capacity)
    }

    pub fn can_shrink(&self, scale: f64) -> bool {
        scale > self.min_scale
    }

    /// Next scale after one zoom-out step, floored at `min_scale`.
    pub fn next_scale(&self, scale: f64) -> f64 {
        (scale * self.zoom_step).max(self.min_scale)
    }

    /// Checked before every placement.
    pub fn should_shrink_before_insert(&self, count: usize, capacity: u32, scale: f64) -> bool {
        self.can_shrink(scale)
            && Self::occupancy_ratio(count, capacity) >= self.reactive_threshold
    }

    /// Checked after the initial load and after a resize.
    pub fn should_shrink_for_bulk(&self, count: usize, capacity: u32, scale: f64) -> bool {
        self.can_shrink(scale) && count as f64 > f64::from(capacity) * self.bulk_threshold
    }

    /// Most photos the grid may hold before the oldest is evicted.
    pub fn max_photos(&self, capacity: u32) -> usize {
        (f64::from(capacity) * self.capacity_ratio).floor() as usize
    }
}

impl Default for DensityController {
    fn default() -> Self {
        Self::from_config(&WallConfig::default())
    }
}
