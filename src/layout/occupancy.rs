use std::collections::HashSet;

use rand::Rng;

use crate::foundation::core::Cell;

/// Set of grid cells currently owned by a placed photo.
#[derive(Clone, Debug, Default)]
pub struct OccupancyTracker {
    occupied: HashSet<Cell>,
}

impl OccupancyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uniformly pick a free cell inside `rows x cols`, or `None` when every cell is taken.
    ///
    /// Scans the whole grid, so the cost is proportional to capacity.
    pub fn find_free_cell<R: Rng>(&self, rows: u32, cols: u32, rng: &mut R) -> Option<Cell> {
        let mut free = Vec::new();
        for row in 0..rows {
            for col in 0..cols {
                let cell = Cell::new(row, col);
                if !self.occupied.contains(&cell) {
                    free.push(cell);
                }
            }
        }
        if free.is_empty() {
            return None;
        }
        Some(free[rng.random_range(0..free.len())])
    }

    /// Returns `false` when the cell was already occupied.
    pub fn mark(&mut self, cell: Cell) -> bool {
        self.occupied.insert(cell)
    }

    pub fn unmark(&mut self, cell: Cell) -> bool {
        self.occupied.remove(&cell)
    }

    pub fn is_occupied(&self, cell: Cell) -> bool {
        self.occupied.contains(&cell)
    }

    pub fn clear(&mut self) {
        self.occupied.clear();
    }

    pub fn len(&self) -> usize {
        self.occupied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupied.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Cell> + '_ {
        self.occupied.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn find_free_cell_skips_occupied_cells() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut occ = OccupancyTracker::new();
        occ.mark(Cell::new(0, 0));
        occ.mark(Cell::new(0, 1));
        occ.mark(Cell::new(1, 0));
        for _ in 0..32 {
            assert_eq!(occ.find_free_cell(2, 2, &mut rng), Some(Cell::new(1, 1)));
        }
    }

    #[test]
    fn find_free_cell_none_when_full_or_empty_grid() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut occ = OccupancyTracker::new();
        assert_eq!(occ.find_free_cell(0, 5, &mut rng), None);
        occ.mark(Cell::new(0, 0));
        assert_eq!(occ.find_free_cell(1, 1, &mut rng), None);
    }

    #[test]
    fn find_free_cell_covers_every_free_cell() {
        let mut rng = StdRng::seed_from_u64(3);
        let occ = OccupancyTracker::new();
        let mut seen = HashSet::new();
        for _ in 0..400 {
            seen.insert(occ.find_free_cell(3, 3, &mut rng).unwrap());
        }
        assert_eq!(seen.len(), 9);
    }

    #[test]
    fn mark_and_unmark_report_changes() {
        let mut occ = OccupancyTracker::new();
        assert!(occ.mark(Cell::new(2, 3)));
        assert!(!occ.mark(Cell::new(2, 3)));
        assert!(occ.is_occupied(Cell::new(2, 3)));
        assert!(occ.unmark(Cell::new(2, 3)));
        assert!(!occ.unmark(Cell::new(2, 3)));
        assert!(occ.is_empty());
    }
}
