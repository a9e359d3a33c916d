use std::{
    path::Path,
    sync::{Arc, OnceLock},
};

use anyhow::Context as _;

use crate::foundation::{
    core::Rgba8,
    error::{WallError, WallResult},
};

/// Width of a single line of caption text, in pixels.
pub trait TextMeasure {
    fn measure(&mut self, text: &str, font_size: f32) -> f64;
}

/// Every character advances by `em` times the font size.
///
/// Used for wrapping when no caption font is configured.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedAdvance {
    pub em: f64,
}

impl Default for FixedAdvance {
    fn default() -> Self {
        Self { em: 0.5 }
    }
}

impl TextMeasure for FixedAdvance {
    fn measure(&mut self, text: &str, font_size: f32) -> f64 {
        text.chars().count() as f64 * self.em * f64::from(font_size)
    }
}

/// Parley brush for caption glyph runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CaptionBrush {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl From<Rgba8> for CaptionBrush {
    fn from(c: Rgba8) -> Self {
        Self {
            r: c.r,
            g: c.g,
            b: c.b,
            a: c.a,
        }
    }
}

/// Caption font registered with Parley, shaping single lines for measuring and drawing.
pub struct CaptionFont {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<CaptionBrush>,
    family_name: String,
    font_bytes: Arc<Vec<u8>>,
    face_index: u32,
}

impl std::fmt::Debug for CaptionFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptionFont")
            .field("family_name", &self.family_name)
            .field("face_index", &self.face_index)
            .field("font_bytes_len", &self.font_bytes.len())
            .finish()
    }
}

impl CaptionFont {
    pub fn from_bytes(bytes: Vec<u8>) -> WallResult<Self> {
        Self::from_face(bytes, 0)
    }

    /// Face `index` of a font file or collection (`.ttc`).
    pub fn from_face(bytes: Vec<u8>, index: u32) -> WallResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let font_bytes = Arc::new(bytes);
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.as_ref().clone()), None);
        let family_id = families
            .iter()
            .find(|(_, fonts)| fonts.iter().any(|font| font.index() == index))
            .or_else(|| families.first())
            .map(|(id, _)| *id)
            .ok_or_else(|| WallError::config("no font families registered from font bytes"))?;
        let family_name = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| WallError::config("registered font family has no name"))?
            .to_string();

        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family_name,
            font_bytes,
            face_index: index,
        })
    }

    pub fn from_file(path: &Path) -> WallResult<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read font '{}'", path.display()))?;
        Self::from_bytes(bytes)
    }

    /// The platform's sans-serif face, or `None` when no usable system font is installed.
    ///
    /// The font database is scanned once per process.
    pub fn system_sans() -> Option<Self> {
        static SYSTEM_SANS: OnceLock<Option<(Arc<Vec<u8>>, u32)>> = OnceLock::new();
        let (bytes, index) = SYSTEM_SANS.get_or_init(load_system_sans).as_ref()?;
        match Self::from_face(bytes.as_ref().clone(), *index) {
            Ok(font) => Some(font),
            Err(err) => {
                tracing::warn!(error = %err, "system font could not be registered");
                None
            }
        }
    }

    pub fn family_name(&self) -> &str {
        &self.family_name
    }

    /// Glyph outlines for `vello_cpu`.
    pub fn font_data(&self) -> vello_cpu::peniko::FontData {
        vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(self.font_bytes.as_ref().clone()),
            self.face_index,
        )
    }

    /// Shape `text` as one unbroken line.
    pub fn layout_line(
        &mut self,
        text: &str,
        font_size: f32,
        brush: CaptionBrush,
    ) -> parley::Layout<CaptionBrush> {
        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(self.family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(font_size));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<CaptionBrush> = builder.build(text);
        layout.break_all_lines(None);
        layout
    }
}

impl TextMeasure for CaptionFont {
    fn measure(&mut self, text: &str, font_size: f32) -> f64 {
        f64::from(
            self.layout_line(text, font_size, CaptionBrush::default())
                .width(),
        )
    }
}

fn load_system_sans() -> Option<(Arc<Vec<u8>>, u32)> {
    use usvg::fontdb::{Database, Family, Query};

    let mut db = Database::new();
    db.load_system_fonts();

    let families = [
        Family::SansSerif,
        Family::Name("DejaVu Sans"),
        Family::Name("Liberation Sans"),
        Family::Name("Noto Sans"),
        Family::Name("Helvetica"),
        Family::Name("Arial"),
    ];
    let query = Query {
        families: &families,
        ..Query::default()
    };
    let id = db
        .query(&query)
        .or_else(|| {
            db.faces()
                .find(|face| face.families.iter().any(|(name, _)| name.contains("Sans")))
                .map(|face| face.id)
        })
        .or_else(|| db.faces().next().map(|face| face.id))?;

    let family = db
        .face(id)
        .and_then(|face| face.families.first())
        .map(|(name, _)| name.clone())
        .unwrap_or_default();
    tracing::debug!(family = %family, faces = db.len(), "resolved system caption font");
    db.with_face_data(id, |data, index| (Arc::new(data.to_vec()), index))
}

/// Greedy word wrap.
///
/// Words are appended while the line still fits `max_width`; a word that is wider than
/// `max_width` on its own is broken between characters. Lines never carry leading or
/// trailing spaces. Returns at least one line.
pub fn wrap_caption(
    text: &str,
    max_width: f64,
    font_size: f32,
    measure: &mut dyn TextMeasure,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        let candidate = if line.is_empty() {
            word.to_string()
        } else {
            format!("{line} {word}")
        };
        if measure.measure(&candidate, font_size) <= max_width {
            line = candidate;
            continue;
        }
        if !line.is_empty() {
            lines.push(std::mem::take(&mut line));
        }
        if measure.measure(word, font_size) <= max_width {
            line = word.to_string();
            continue;
        }
        for ch in word.chars() {
            let mut next = line.clone();
            next.push(ch);
            if !line.is_empty() && measure.measure(&next, font_size) > max_width {
                lines.push(std::mem::replace(&mut line, ch.to_string()));
            } else {
                line = next;
            }
        }
    }

    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}
