use crate::foundation::core::Viewport;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GridDims {
    pub rows: u32,
    pub cols: u32,
}

impl GridDims {
    pub fn capacity(self) -> u32 {
        self.rows.saturating_mul(self.cols)
    }
}

/// Grid capacity derived from the viewport and the current cell size.
pub struct GridMetrics;

impl GridMetrics {
    /// `floor(dimension / cell_size)` on each axis. Degenerate inputs yield an empty grid.
    pub fn recompute(viewport_width: f64, viewport_height: f64, cell_size: f64) -> GridDims {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return GridDims::default();
        }
        GridDims {
            rows: cells_along(viewport_height, cell_size),
            cols: cells_along(viewport_width, cell_size),
        }
    }
}

fn cells_along(extent: f64, cell_size: f64) -> u32 {
    if !extent.is_finite() || extent <= 0.0 {
        return 0;
    }
    (extent / cell_size).floor().min(f64::from(u32::MAX)) as u32
}

/// Scale-dependent grid of the live wall.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GridState {
    pub rows: u32,
    pub cols: u32,
    pub cell_size: f64,
    pub scale: f64,
}

impl GridState {
    pub fn new(viewport: Viewport, base_cell_size: f64, scale: f64) -> Self {
        let cell_size = base_cell_size * scale;
        let dims = GridMetrics::recompute(viewport.width, viewport.height, cell_size);
        Self {
            rows: dims.rows,
            cols: dims.cols,
            cell_size,
            scale,
        }
    }

    pub fn dims(&self) -> GridDims {
        GridDims {
            rows: self.rows,
            cols: self.cols,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.dims().capacity()
    }

    /// Recompute `cell_size` and rows/cols for a new scale and/or viewport.
    pub fn rescale(&mut self, viewport: Viewport, base_cell_size: f64, scale: f64) {
        *self = Self::new(viewport, base_cell_size, scale);
    }
}
