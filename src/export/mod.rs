pub mod blur;
pub mod composite;
pub mod decode;
pub mod encode;
pub mod options;
pub mod plan;
pub mod raster;
pub mod source;
pub mod text;

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::{DateTime, Utc};

use crate::{
    config::ExportStyle,
    export::{
        composite::Canvas,
        encode::encode_canvas,
        options::{ExportOptions, export_file_name},
        plan::{ExportPlan, plan_export},
        raster::{build_shadow, render_card},
        source::{ImageSource, load_images},
        text::{CaptionFont, FixedAdvance},
    },
    foundation::{
        core::Photo,
        error::{WallError, WallResult},
    },
};

/// Encoded composite image ready to be saved or handed to a download.
#[derive(Clone, Debug)]
pub struct ExportArtifact {
    pub file_name: String,
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
    /// Cards exported without their image because it could not be fetched or decoded.
    pub missing_images: usize,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    pub fn write_to_dir(&self, dir: &Path) -> WallResult<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create output dir '{}'", dir.display()))?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)
            .with_context(|| format!("write export '{}'", path.display()))?;
        Ok(path)
    }
}

/// Renders a photo set into one polaroid-style composite.
#[derive(Debug)]
pub struct Compositor {
    style: ExportStyle,
    font: Option<CaptionFont>,
}

impl Compositor {
    /// Compositor captioning with the system sans-serif font.
    ///
    /// Without any installed font, captions are wrapped by [`FixedAdvance`] and not drawn.
    pub fn new(style: ExportStyle) -> WallResult<Self> {
        style.validate()?;
        let font = CaptionFont::system_sans();
        if font.is_none() {
            tracing::warn!("no system font found, captions will not be drawn");
        }
        Ok(Self { style, font })
    }

    /// Replace the caption font, e.g. with one loaded by [`CaptionFont::from_file`].
    pub fn with_font(mut self, font: CaptionFont) -> Self {
        self.font = Some(font);
        self
    }

    pub fn style(&self) -> &ExportStyle {
        &self.style
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Lay the photos out without loading or drawing anything.
    pub fn plan(&mut self, photos: &[Photo], opts: ExportOptions) -> WallResult<ExportPlan> {
        match self.font.as_mut() {
            Some(font) => plan_export(photos, &self.style, opts.tier, font),
            None => plan_export(photos, &self.style, opts.tier, &mut FixedAdvance::default()),
        }
    }

    /// Compose `photos` (in placement order) and encode the result.
    ///
    /// Images load in parallel; a card whose image fails keeps an empty photo slot.
    #[tracing::instrument(
        skip_all,
        fields(photos = photos.len(), tier = opts.tier.label(), format = opts.format.extension())
    )]
    pub fn export(
        &mut self,
        photos: &[Photo],
        source: &dyn ImageSource,
        opts: ExportOptions,
        now: DateTime<Utc>,
    ) -> WallResult<ExportArtifact> {
        if photos.is_empty() {
            return Err(WallError::EmptyExport);
        }
        let plan = self.plan(photos, opts)?;
        let images = load_images(photos, source);
        let missing_images = images.iter().filter(|img| img.is_none()).count();

        if self.font.is_none() {
            tracing::warn!("no caption font available, captions are not drawn");
        }

        let mut canvas = Canvas::new(plan.width, plan.height)?;
        canvas.fill_diagonal_gradient(self.style.gradient_start, self.style.gradient_end);

        let shadow = build_shadow(&self.style, plan.scale)?;
        let shadow_color = self.style.shadow_color.to_premul();

        for (card, image) in plan.cards.iter().zip(&images) {
            let (cx, cy) = (card.card.x0.round() as i64, card.card.y0.round() as i64);
            canvas.draw_mask(
                &shadow.mask,
                shadow.width,
                shadow.height,
                cx + shadow.offset.0,
                cy + shadow.offset.1,
                shadow_color,
            )?;

            let tile = render_card(
                card,
                image.as_ref(),
                &self.style,
                plan.scale,
                self.font.as_mut(),
            )?;
            canvas.draw_over(&tile.data, tile.width, tile.height, tile.origin.0, tile.origin.1)?;
        }

        let bytes = encode_canvas(canvas, opts.format, self.style.jpeg_quality)?;
        let artifact = ExportArtifact {
            file_name: export_file_name(opts, now),
            mime_type: opts.format.mime_type(),
            width: plan.width,
            height: plan.height,
            missing_images,
            bytes,
        };
        tracing::info!(
            file = %artifact.file_name,
            width = artifact.width,
            height = artifact.height,
            bytes = artifact.bytes.len(),
            missing_images,
            "export complete"
        );
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use chrono::TimeZone as _;

    use super::*;
    use crate::export::{
        options::{ExportFormat, QualityTier},
        source::MemoryImageSource,
    };

    fn png(color: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(40, 30, image::Rgba(color));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 1).unwrap()
    }

    #[test]
    fn empty_export_fails_without_artifact() {
        let mut c = Compositor::new(ExportStyle::default()).unwrap();
        let err = c
            .export(&[], &MemoryImageSource::new(), ExportOptions::default(), now())
            .unwrap_err();
        assert!(matches!(err, WallError::EmptyExport));
    }

    #[test]
    fn single_photo_png_has_shadow_card_and_photo() {
        let mut src = MemoryImageSource::new();
        src.insert("a", png([0, 200, 0, 255]));
        let mut c = Compositor::new(ExportStyle::default()).unwrap();
        let art = c
            .export(
                &[Photo::new("k", "a", "hello")],
                &src,
                ExportOptions::new(QualityTier::Standard, ExportFormat::Png),
                now(),
            )
            .unwrap();

        assert_eq!(art.file_name, "polaroid-wall-standard-2024-12-31T23-59-01.png");
        assert_eq!(art.mime_type, "image/png");
        assert_eq!((art.width, art.height), (660, 660));
        assert_eq!(art.missing_images, 0);

        let img = image::load_from_memory(&art.bytes).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (660, 660));
        // Photo slot center: card at (110, 50), image 380x400 at +30.
        let p = img.get_pixel(330, 280).0;
        assert!(p[1] > 180 && p[0] < 20 && p[2] < 20);
        // Caption band of the card is white.
        let w = img.get_pixel(330, 600).0;
        assert!(w.iter().all(|&c| c >= 245));
        // Background corner is the gradient start color.
        let bg = img.get_pixel(0, 0).0;
        assert!((i32::from(bg[0]) - 0x66).abs() <= 2 && (i32::from(bg[2]) - 0xea).abs() <= 2);
        // Just below the card the shadow darkens the gradient.
        let below = img.get_pixel(330, 620).0;
        let plain = img.get_pixel(5, 620).0;
        assert!(u32::from(below[2]) + 10 < u32::from(plain[2]));
    }

    #[test]
    fn unreachable_image_leaves_blank_slot() {
        let mut src = MemoryImageSource::new();
        src.insert("a", png([255, 0, 0, 255]));
        let mut c = Compositor::new(ExportStyle::default()).unwrap();
        let photos = vec![
            Photo::new("1", "a", "one"),
            Photo::new("2", "gone", "two"),
            Photo::new("3", "a", "three"),
        ];
        let art = c
            .export(
                &photos,
                &src,
                ExportOptions::new(QualityTier::Standard, ExportFormat::Png),
                now(),
            )
            .unwrap();
        assert_eq!(art.missing_images, 1);
        assert_eq!((art.width, art.height), (1320, 1320));

        let img = image::load_from_memory(&art.bytes).unwrap().to_rgba8();
        // Second card sits in column 1 of row 0; its photo slot is plain white.
        let blank = img.get_pixel(660 + 330, 280).0;
        assert!(blank.iter().all(|&c| c >= 245));
        let red = img.get_pixel(330, 280).0;
        assert!(red[0] > 200 && red[1] < 40);
    }

    #[test]
    fn jpeg_export_is_deterministic() {
        let mut src = MemoryImageSource::new();
        src.insert("a", png([10, 20, 200, 255]));
        let photos = vec![Photo::new("k", "a", "")];
        let opts = ExportOptions::new(QualityTier::Standard, ExportFormat::Jpeg);

        let mut c = Compositor::new(ExportStyle::default()).unwrap();
        let a = c.export(&photos, &src, opts, now()).unwrap();
        let b = c.export(&photos, &src, opts, now()).unwrap();
        assert_eq!(a.mime_type, "image/jpeg");
        assert!(a.file_name.ends_with(".jpeg"));
        assert_eq!(a.bytes, b.bytes);
    }
}
