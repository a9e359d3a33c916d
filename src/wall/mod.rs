pub mod drag;
pub mod live;
pub mod placement;
