use std::collections::{HashMap, VecDeque};

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    config::WallConfig,
    foundation::core::{Affine, Cell, Photo, PhotoKey, Point, Rect, Viewport},
    foundation::error::WallResult,
    layout::{density::DensityController, grid::GridState, occupancy::OccupancyTracker},
};

/// On-screen state of one placed card. Purely cosmetic apart from `cell`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CardVisual {
    /// Grid cell owned by the card.
    pub cell: Cell,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    /// Clockwise rotation about the card center.
    pub rotation_deg: f64,
    pub z: u32,
    /// Placed from a live event rather than the initial load or a relayout.
    pub is_new: bool,
}

impl CardVisual {
    pub fn rect(&self) -> Rect {
        Rect::new(
            self.left,
            self.top,
            self.left + self.width,
            self.top + self.height,
        )
    }

    /// Whether `p` falls inside the rotated card.
    pub fn contains(&self, p: Point) -> bool {
        let rect = self.rect();
        let unrotate = Affine::rotate_about(-self.rotation_deg.to_radians(), rect.center());
        rect.contains(unrotate * p)
    }
}

/// A card together with the photo it shows, in a form the host surface can render.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WallCard {
    pub key: PhotoKey,
    pub image_ref: String,
    pub caption: String,
    #[serde(flatten)]
    pub visual: CardVisual,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    Placed { cell: Cell, evicted: Vec<PhotoKey> },
    /// The key was already on the wall.
    Duplicate,
    /// No free cell even after shrinking.
    Dropped,
}

/// Placement engine of one wall view.
///
/// Owns the grid, the occupancy set, the photo map and the placement order. `insert`,
/// `remove` and `resize` are the only mutation entry points and each leaves the wall
/// consistent before returning.
pub struct Wall<R: Rng = StdRng> {
    cfg: WallConfig,
    density: DensityController,
    viewport: Viewport,
    grid: GridState,
    occupancy: OccupancyTracker,
    photos: HashMap<PhotoKey, Photo>,
    visuals: HashMap<PhotoKey, CardVisual>,
    order: VecDeque<PhotoKey>,
    rng: R,
}

impl Wall<StdRng> {
    /// Wall with a reproducible layout.
    pub fn seeded(cfg: WallConfig, viewport: Viewport, seed: u64) -> WallResult<Self> {
        Self::new(cfg, viewport, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Wall<R> {
    pub fn new(cfg: WallConfig, viewport: Viewport, rng: R) -> WallResult<Self> {
        cfg.validate()?;
        let density = DensityController::from_config(&cfg);
        let grid = GridState::new(viewport, cfg.base_cell_size, 1.0);
        Ok(Self {
            cfg,
            density,
            viewport,
            grid,
            occupancy: OccupancyTracker::new(),
            photos: HashMap::new(),
            visuals: HashMap::new(),
            order: VecDeque::new(),
            rng,
        })
    }

    pub fn config(&self) -> &WallConfig {
        &self.cfg
    }

    pub fn grid(&self) -> &GridState {
        &self.grid
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn scale(&self) -> f64 {
        self.grid.scale
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn contains(&self, key: &PhotoKey) -> bool {
        self.photos.contains_key(key)
    }

    pub fn photo(&self, key: &PhotoKey) -> Option<&Photo> {
        self.photos.get(key)
    }

    pub fn visual(&self, key: &PhotoKey) -> Option<&CardVisual> {
        self.visuals.get(key)
    }

    pub(crate) fn visual_mut(&mut self, key: &PhotoKey) -> Option<&mut CardVisual> {
        self.visuals.get_mut(key)
    }

    /// Keys oldest first; the front is the next eviction candidate.
    pub fn keys_in_order(&self) -> impl Iterator<Item = &PhotoKey> + '_ {
        self.order.iter()
    }

    pub fn photos_in_order(&self) -> impl Iterator<Item = &Photo> + '_ {
        self.order.iter().filter_map(|k| self.photos.get(k))
    }

    /// Owned copy of every tracked photo in placement order.
    pub fn snapshot(&self) -> Vec<Photo> {
        self.photos_in_order().cloned().collect()
    }

    /// Cards in paint order: ascending z, then placement order.
    pub fn cards_by_z(&self) -> Vec<WallCard> {
        let mut cards: Vec<(usize, WallCard)> = self
            .order
            .iter()
            .enumerate()
            .filter_map(|(idx, key)| {
                let photo = self.photos.get(key)?;
                let visual = self.visuals.get(key)?;
                Some((
                    idx,
                    WallCard {
                        key: key.clone(),
                        image_ref: photo.image_ref.clone(),
                        caption: photo.display_caption().to_string(),
                        visual: visual.clone(),
                    },
                ))
            })
            .collect();
        cards.sort_by_key(|(idx, card)| (card.visual.z, *idx));
        cards.into_iter().map(|(_, card)| card).collect()
    }

    /// Topmost card under `p`.
    pub fn hit_test(&self, p: Point) -> Option<PhotoKey> {
        self.order
            .iter()
            .enumerate()
            .filter_map(|(idx, key)| {
                let visual = self.visuals.get(key)?;
                visual.contains(p).then_some(((visual.z, idx), key))
            })
            .max_by_key(|(rank, _)| *rank)
            .map(|(_, key)| key.clone())
    }

    /// Place a photo. Idempotent per key.
    pub fn insert(&mut self, photo: Photo, is_new: bool) -> InsertOutcome {
        if self.photos.contains_key(&photo.key) {
            tracing::debug!(key = %photo.key, "duplicate insert ignored");
            return InsertOutcome::Duplicate;
        }

        if self.density.should_shrink_before_insert(
            self.photos.len(),
            self.grid.capacity(),
            self.grid.scale,
        ) {
            self.zoom_out();
        }

        let cell = match self.find_free_cell() {
            Some(cell) => Some(cell),
            None if self.density.can_shrink(self.grid.scale) => {
                self.zoom_out();
                self.find_free_cell()
            }
            None => None,
        };
        let Some(cell) = cell else {
            tracing::warn!(
                key = %photo.key,
                scale = self.grid.scale,
                capacity = self.grid.capacity(),
                "no free cell, photo dropped"
            );
            return InsertOutcome::Dropped;
        };

        self.place_at(photo, cell, is_new);
        let evicted = self.enforce_limit();
        InsertOutcome::Placed { cell, evicted }
    }

    /// Remove a photo. Unknown keys are ignored and return `false`.
    pub fn remove(&mut self, key: &PhotoKey) -> bool {
        if !self.photos.contains_key(key) {
            return false;
        }
        self.detach(key);
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        true
    }

    /// Place the initial photo set, then shrink until it no longer crowds the wall.
    pub fn load_initial<I>(&mut self, photos: I) -> usize
    where
        I: IntoIterator<Item = Photo>,
    {
        let mut placed = 0usize;
        for photo in photos {
            if matches!(self.insert(photo, false), InsertOutcome::Placed { .. }) {
                placed += 1;
            }
        }
        self.fit_bulk();
        placed
    }

    /// Adopt a new viewport. Cards left outside the new bounds force a relayout at the
    /// current scale; afterwards the bulk density check runs against the new capacity.
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.grid
            .rescale(viewport, self.cfg.base_cell_size, self.grid.scale);

        let (rows, cols) = (self.grid.rows, self.grid.cols);
        if self.visuals.values().any(|v| !v.cell.in_bounds(rows, cols)) {
            tracing::debug!(rows, cols, "cards out of bounds after resize, relayout");
            self.relayout();
        }
        self.fit_bulk();
    }

    /// Shrink while the wall holds more than the bulk threshold of its capacity.
    pub fn fit_bulk(&mut self) {
        while self.density.should_shrink_for_bulk(
            self.photos.len(),
            self.grid.capacity(),
            self.grid.scale,
        ) {
            self.zoom_out();
        }
    }

    /// Reposition every tracked photo at the current scale.
    pub fn relayout(&mut self) {
        let snapshot = self.snapshot();

        'restart: loop {
            self.clear_layout();
            for photo in &snapshot {
                if self.density.should_shrink_before_insert(
                    self.photos.len(),
                    self.grid.capacity(),
                    self.grid.scale,
                ) {
                    self.apply_scale(self.density.next_scale(self.grid.scale));
                    continue 'restart;
                }
                match self.find_free_cell() {
                    Some(cell) => self.place_at(photo.clone(), cell, false),
                    None => {
                        tracing::warn!(
                            key = %photo.key,
                            "no free cell during relayout, photo dropped"
                        );
                    }
                }
            }
            break;
        }

        let evicted = self.enforce_limit();
        tracing::debug!(
            placed = self.photos.len(),
            evicted = evicted.len(),
            scale = self.grid.scale,
            "relayout done"
        );
    }

    /// Consistency check over every owned structure.
    pub fn check_invariants(&self) -> Result<(), String> {
        let n = self.photos.len();
        if self.visuals.len() != n || self.occupancy.len() != n || self.order.len() != n {
            return Err(format!(
                "size mismatch: photos={n} visuals={} occupied={} order={}",
                self.visuals.len(),
                self.occupancy.len(),
                self.order.len()
            ));
        }
        for key in &self.order {
            let visual = self
                .visuals
                .get(key)
                .ok_or_else(|| format!("key '{key}' has no visual"))?;
            if !self.photos.contains_key(key) {
                return Err(format!("key '{key}' has no photo"));
            }
            if !visual.cell.in_bounds(self.grid.rows, self.grid.cols) {
                return Err(format!("key '{key}' owns out-of-bounds cell {:?}", visual.cell));
            }
        }
        let mut cells: Vec<Cell> = self.visuals.values().map(|v| v.cell).collect();
        cells.sort();
        cells.dedup();
        if cells.len() != n {
            return Err("two photos share a cell".to_string());
        }
        let mut occupied: Vec<Cell> = self.occupancy.iter().collect();
        occupied.sort();
        if occupied != cells {
            return Err(format!("occupied cells {occupied:?} differ from card cells {cells:?}"));
        }
        if self.grid.scale < self.cfg.min_scale || self.grid.scale > 1.0 {
            return Err(format!("scale {} out of range", self.grid.scale));
        }
        Ok(())
    }

    fn find_free_cell(&mut self) -> Option<Cell> {
        self.occupancy
            .find_free_cell(self.grid.rows, self.grid.cols, &mut self.rng)
    }

    fn zoom_out(&mut self) {
        let next = self.density.next_scale(self.grid.scale);
        self.apply_scale(next);
        tracing::debug!(
            scale = self.grid.scale,
            rows = self.grid.rows,
            cols = self.grid.cols,
            photos = self.photos.len(),
            "zoomed out"
        );
        self.relayout();
    }

    fn apply_scale(&mut self, scale: f64) {
        self.grid
            .rescale(self.viewport, self.cfg.base_cell_size, scale);
    }

    fn clear_layout(&mut self) {
        self.occupancy.clear();
        self.photos.clear();
        self.visuals.clear();
        self.order.clear();
    }

    fn place_at(&mut self, photo: Photo, cell: Cell, is_new: bool) {
        let scale = self.grid.scale;
        let cell_size = self.grid.cell_size;
        let width = self.cfg.card_width * scale;
        let height = self.cfg.card_height * scale;
        let jitter = self.cfg.jitter_range * scale;
        let max_rot = self.cfg.max_rotation_deg;

        let base_x = f64::from(cell.col) * cell_size + (cell_size - width) / 2.0;
        let base_y = f64::from(cell.row) * cell_size + (cell_size - height) / 2.0;
        let offset_x = (self.rng.random::<f64>() - 0.5) * jitter;
        let offset_y = (self.rng.random::<f64>() - 0.5) * jitter;
        let rotation_deg = self.rng.random_range(-max_rot..=max_rot);

        let key = photo.key.clone();
        self.visuals.insert(
            key.clone(),
            CardVisual {
                cell,
                left: base_x + offset_x,
                top: base_y + offset_y,
                width,
                height,
                rotation_deg,
                z: 0,
                is_new,
            },
        );
        self.photos.insert(key.clone(), photo);
        self.occupancy.mark(cell);
        self.order.push_back(key);
    }

    fn enforce_limit(&mut self) -> Vec<PhotoKey> {
        let max = self.density.max_photos(self.grid.capacity());
        let mut evicted = Vec::new();
        while self.photos.len() > max {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.detach(&oldest);
            tracing::debug!(key = %oldest, "evicted oldest photo");
            evicted.push(oldest);
        }
        evicted
    }

    /// Drop a key from the photo map, visuals and occupancy. Order is the caller's job.
    fn detach(&mut self, key: &PhotoKey) {
        if let Some(visual) = self.visuals.remove(key) {
            self.occupancy.unmark(visual.cell);
        }
        self.photos.remove(key);
    }
}
