pub mod density;
pub mod grid;
pub mod occupancy;
