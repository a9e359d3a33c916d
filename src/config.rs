use std::{fs::File, io::BufReader, path::Path};

use anyhow::Context as _;

use crate::foundation::{
    core::Rgba8,
    error::{WallError, WallResult},
};

/// Tunables of the live wall. Defaults reproduce the stock wall behavior.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct WallConfig {
    /// Cell edge length at scale 1.0, in viewport pixels.
    pub base_cell_size: f64,
    /// Lowest scale the density controller may shrink to.
    pub min_scale: f64,
    /// Multiplier applied to the scale on each shrink step.
    pub zoom_step: f64,
    /// Occupancy ratio at which an insert shrinks the wall first.
    pub reactive_threshold: f64,
    /// Occupancy ratio the initial load is shrunk below.
    pub bulk_threshold: f64,
    /// Fraction of grid capacity that may hold photos before FIFO eviction.
    pub capacity_ratio: f64,
    pub card_width: f64,
    pub card_height: f64,
    /// Full width of the positional jitter window at scale 1.0.
    pub jitter_range: f64,
    /// Rotation is drawn uniformly from `[-max_rotation_deg, max_rotation_deg]`.
    pub max_rotation_deg: f64,
    /// Click-to-expand is ignored for this long after a drag ends.
    pub click_suppression_ms: f64,
    /// First z-index handed out by bring-to-front.
    pub z_base: u32,
}

impl Default for WallConfig {
    fn default() -> Self {
        Self {
            base_cell_size: 250.0,
            min_scale: 0.4,
            zoom_step: 0.9,
            reactive_threshold: 0.7,
            bulk_threshold: 0.6,
            capacity_ratio: 0.8,
            card_width: 220.0,
            card_height: 280.0,
            jitter_range: 40.0,
            max_rotation_deg: 10.0,
            click_suppression_ms: 100.0,
            z_base: 1000,
        }
    }
}

impl WallConfig {
    pub fn from_json_file(path: &Path) -> WallResult<Self> {
        let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parse config '{}'", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> WallResult<()> {
        fn positive(name: &str, v: f64) -> WallResult<()> {
            if !v.is_finite() || v <= 0.0 {
                return Err(WallError::config(format!("{name} must be finite and > 0")));
            }
            Ok(())
        }
        fn unit_interval(name: &str, v: f64) -> WallResult<()> {
            if !v.is_finite() || v <= 0.0 || v > 1.0 {
                return Err(WallError::config(format!("{name} must be in (0, 1]")));
            }
            Ok(())
        }

        positive("base_cell_size", self.base_cell_size)?;
        positive("card_width", self.card_width)?;
        positive("card_height", self.card_height)?;
        unit_interval("min_scale", self.min_scale)?;
        unit_interval("reactive_threshold", self.reactive_threshold)?;
        unit_interval("bulk_threshold", self.bulk_threshold)?;
        unit_interval("capacity_ratio", self.capacity_ratio)?;
        if !self.zoom_step.is_finite() || self.zoom_step <= 0.0 || self.zoom_step >= 1.0 {
            return Err(WallError::config("zoom_step must be in (0, 1)"));
        }
        if !self.jitter_range.is_finite() || self.jitter_range < 0.0 {
            return Err(WallError::config("jitter_range must be finite and >= 0"));
        }
        if !self.max_rotation_deg.is_finite() || !(0.0..=180.0).contains(&self.max_rotation_deg) {
            return Err(WallError::config("max_rotation_deg must be in [0, 180]"));
        }
        if !self.click_suppression_ms.is_finite() || self.click_suppression_ms < 0.0 {
            return Err(WallError::config(
                "click_suppression_ms must be finite and >= 0",
            ));
        }
        Ok(())
    }
}

/// Look of the exported composite, in unscaled pixels. Quality tiers multiply every length.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ExportStyle {
    pub card_width: f64,
    pub card_height: f64,
    /// Added to the larger card side to get the export grid cell.
    pub cell_margin: f64,
    pub card_padding: f64,
    pub image_height: f64,
    pub card_radius: f64,
    pub image_radius: f64,
    /// Gap between the image bottom and the first caption line.
    pub caption_margin: f64,
    pub font_size: f64,
    /// Line advance as a multiple of the font size.
    pub line_height: f64,
    /// Caption lines wrap at the image width minus this inset.
    pub caption_inset: f64,
    pub shadow_blur: f64,
    pub shadow_offset_y: f64,
    pub shadow_color: Rgba8,
    pub card_color: Rgba8,
    pub caption_color: Rgba8,
    /// Background gradient runs from the top-left to the bottom-right corner.
    pub gradient_start: Rgba8,
    pub gradient_end: Rgba8,
    pub jpeg_quality: u8,
}

impl Default for ExportStyle {
    fn default() -> Self {
        Self {
            card_width: 220.0,
            card_height: 280.0,
            cell_margin: 50.0,
            card_padding: 15.0,
            image_height: 200.0,
            card_radius: 12.0,
            image_radius: 8.0,
            caption_margin: 12.0,
            font_size: 16.0,
            line_height: 1.2,
            caption_inset: 20.0,
            shadow_blur: 25.0,
            shadow_offset_y: 20.0,
            shadow_color: Rgba8::rgba(0, 0, 0, 102),
            card_color: Rgba8::rgb(0xff, 0xff, 0xff),
            caption_color: Rgba8::rgb(0x2c, 0x3e, 0x50),
            gradient_start: Rgba8::rgb(0x66, 0x7e, 0xea),
            gradient_end: Rgba8::rgb(0x76, 0x4b, 0xa2),
            jpeg_quality: 95,
        }
    }
}

impl ExportStyle {
    pub fn from_json_file(path: &Path) -> WallResult<Self> {
        let f = File::open(path)
            .with_context(|| format!("open export style '{}'", path.display()))?;
        let style: Self = serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parse export style '{}'", path.display()))?;
        style.validate()?;
        Ok(style)
    }

    pub fn image_width(&self) -> f64 {
        self.card_width - 2.0 * self.card_padding
    }

    pub fn caption_width(&self) -> f64 {
        self.image_width() - self.caption_inset
    }

    pub fn cell_size(&self) -> f64 {
        self.card_width.max(self.card_height) + self.cell_margin
    }

    pub fn validate(&self) -> WallResult<()> {
        for (name, v) in [
            ("card_width", self.card_width),
            ("card_height", self.card_height),
            ("image_height", self.image_height),
            ("font_size", self.font_size),
            ("line_height", self.line_height),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return Err(WallError::config(format!("{name} must be finite and > 0")));
            }
        }
        for (name, v) in [
            ("cell_margin", self.cell_margin),
            ("card_padding", self.card_padding),
            ("card_radius", self.card_radius),
            ("image_radius", self.image_radius),
            ("caption_margin", self.caption_margin),
            ("caption_inset", self.caption_inset),
            ("shadow_blur", self.shadow_blur),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(WallError::config(format!("{name} must be finite and >= 0")));
            }
        }
        if !self.shadow_offset_y.is_finite() {
            return Err(WallError::config("shadow_offset_y must be finite"));
        }
        if self.caption_width() <= 0.0 {
            return Err(WallError::config(
                "card_padding and caption_inset leave no room for captions",
            ));
        }
        if self.card_padding + self.image_height > self.card_height {
            return Err(WallError::config("image does not fit inside the card"));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(WallError::config("jpeg_quality must be in 1..=100"));
        }
        Ok(())
    }
}
