#![forbid(unsafe_code)]

pub mod config;
pub mod export;
pub mod foundation;
pub mod layout;
pub mod view;
pub mod wall;

pub use config::{ExportStyle, WallConfig};
pub use export::{
    Compositor, ExportArtifact,
    options::{ExportFormat, ExportOptions, QualityTier, export_file_name},
    source::{DirImageSource, ImageSource, MemoryImageSource},
    text::CaptionFont,
};
pub use foundation::{
    core::{Cell, FALLBACK_CAPTION, Photo, PhotoKey, Point, Rgba8, Viewport},
    error::{WallError, WallResult},
};
pub use layout::{density::DensityController, grid::GridState, occupancy::OccupancyTracker};
pub use view::WallView;
pub use wall::{
    drag::DragController,
    live::{LiveEvent, LiveOutcome, LiveStats, LiveUpdateAdapter},
    placement::{CardVisual, InsertOutcome, Wall, WallCard},
};
