use crate::{
    config::ExportStyle,
    export::{
        options::QualityTier,
        text::{TextMeasure, wrap_caption},
    },
    foundation::{
        core::{Photo, PhotoKey, Rect},
        error::{WallError, WallResult},
    },
};

/// Largest card tile side the rasterizer accepts, in canvas pixels.
pub const MAX_TILE_EXTENT: f64 = u16::MAX as f64 - 1.0;

#[derive(Clone, Debug, PartialEq)]
pub struct CaptionLine {
    pub text: String,
    /// Measured width in canvas pixels.
    pub width: f64,
}

/// Geometry of one exported card, in canvas pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct CardPlan {
    pub key: PhotoKey,
    pub card: Rect,
    pub image: Rect,
    /// Top of the first caption line.
    pub caption_top: f64,
    pub line_advance: f64,
    pub lines: Vec<CaptionLine>,
}

impl CardPlan {
    pub fn caption_bottom(&self) -> f64 {
        self.caption_top + self.line_advance * self.lines.len() as f64
    }

    /// Card bounds grown to include caption lines that run past the card bottom.
    pub fn content_bounds(&self) -> Rect {
        Rect::new(
            self.card.x0,
            self.card.y0,
            self.card.x1,
            self.card.y1.max(self.caption_bottom()),
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExportPlan {
    pub width: u32,
    pub height: u32,
    pub scale: f64,
    pub cols: u32,
    pub rows: u32,
    pub cell: f64,
    pub font_size: f32,
    /// In placement order, laid out row-major.
    pub cards: Vec<CardPlan>,
}

/// `cols = ceil(sqrt(n))`, `rows = ceil(n / cols)`.
pub fn export_grid(n: usize) -> (u32, u32) {
    if n == 0 {
        return (0, 0);
    }
    let mut cols = (n as f64).sqrt().ceil() as usize;
    // Guard against sqrt rounding on perfect squares.
    while cols * cols < n {
        cols += 1;
    }
    while cols > 1 && (cols - 1) * (cols - 1) >= n {
        cols -= 1;
    }
    (cols as u32, n.div_ceil(cols) as u32)
}

pub fn plan_export(
    photos: &[Photo],
    style: &ExportStyle,
    tier: QualityTier,
    measure: &mut dyn TextMeasure,
) -> WallResult<ExportPlan> {
    if photos.is_empty() {
        return Err(WallError::EmptyExport);
    }
    style.validate()?;

    let s = f64::from(tier.scale());
    let (cols, rows) = export_grid(photos.len());
    let cell = style.cell_size() * s;
    let card_w = style.card_width * s;
    let card_h = style.card_height * s;
    let pad = style.card_padding * s;
    let image_w = style.image_width() * s;
    let image_h = style.image_height * s;
    let font_size = (style.font_size * s) as f32;
    let line_advance = style.font_size * style.line_height * s;
    let caption_width = style.caption_width() * s;

    let cards = photos
        .iter()
        .enumerate()
        .map(|(i, photo)| {
            let col = (i as u32 % cols) as f64;
            let row = (i as u32 / cols) as f64;
            let x = (col * cell + (cell - card_w) / 2.0).round();
            let y = (row * cell + (cell - card_h) / 2.0).round();
            let image = Rect::new(x + pad, y + pad, x + pad + image_w, y + pad + image_h);
            let caption_top = image.y1 + style.caption_margin * s;
            let mut wrapped = wrap_caption(
                photo.display_caption(),
                caption_width,
                font_size,
                &mut *measure,
            );
            let max_lines = ((MAX_TILE_EXTENT - (caption_top - y)) / line_advance)
                .floor()
                .max(1.0) as usize;
            if wrapped.len() > max_lines {
                tracing::warn!(
                    key = %photo.key,
                    lines = wrapped.len(),
                    kept = max_lines,
                    "caption cut to the card tile limit"
                );
                wrapped.truncate(max_lines);
            }
            let lines = wrapped
                .into_iter()
                .map(|text| {
                    let width = measure.measure(&text, font_size);
                    CaptionLine { text, width }
                })
                .collect();
            CardPlan {
                key: photo.key.clone(),
                card: Rect::new(x, y, x + card_w, y + card_h),
                image,
                caption_top,
                line_advance,
                lines,
            }
        })
        .collect();

    Ok(ExportPlan {
        width: (f64::from(cols) * cell).ceil() as u32,
        height: (f64::from(rows) * cell).ceil() as u32,
        scale: s,
        cols,
        rows,
        cell,
        font_size,
        cards,
    })
}
