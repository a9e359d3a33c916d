use std::sync::Arc;

use image::{GrayImage, RgbaImage, imageops::FilterType};
use vello_cpu::kurbo::Shape as _;

use crate::{
    config::ExportStyle,
    export::{
        blur::{blur_alpha8, shadow_kernel},
        decode::cover_pixmap,
        plan::CardPlan,
        text::{CaptionBrush, CaptionFont},
    },
    foundation::{
        core::Rect,
        error::{WallError, WallResult},
    },
};

/// Premultiplied RGBA8 raster with its top-left corner at `origin` on the canvas.
#[derive(Clone, Debug)]
pub struct Tile {
    pub origin: (i64, i64),
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Blurred card silhouette shared by every card of one export.
#[derive(Clone, Debug)]
pub struct ShadowSprite {
    /// Offset of the mask's top-left corner from the card's top-left corner.
    pub offset: (i64, i64),
    pub width: u32,
    pub height: u32,
    pub mask: Vec<u8>,
}

fn to_u16(v: f64, what: &str) -> WallResult<u16> {
    let v = v.ceil();
    if !(0.0..=f64::from(u16::MAX)).contains(&v) {
        return Err(WallError::render(format!("{what} {v} exceeds u16")));
    }
    Ok(v as u16)
}

fn rounded_rect_path(
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    radius: f64,
) -> vello_cpu::kurbo::BezPath {
    vello_cpu::kurbo::RoundedRect::new(x0, y0, x1, y1, radius).to_path(0.1)
}

fn color(c: crate::foundation::core::Rgba8) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

/// Rasterize the card silhouette at unit scale, blur it there, then upsample to `scale`.
pub fn build_shadow(style: &ExportStyle, scale: f64) -> WallResult<ShadowSprite> {
    let (radius, sigma) = shadow_kernel(style.shadow_blur);
    let margin = f64::from(radius);
    let w = to_u16(style.card_width + 2.0 * margin, "shadow width")?;
    let h = to_u16(style.card_height + 2.0 * margin, "shadow height")?;

    let mut ctx = vello_cpu::RenderContext::new(w, h);
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(0, 0, 0, 255));
    ctx.fill_path(&rounded_rect_path(
        margin,
        margin,
        margin + style.card_width,
        margin + style.card_height,
        style.card_radius,
    ));
    ctx.flush();
    let mut pixmap = vello_cpu::Pixmap::new(w, h);
    ctx.render_to_pixmap(&mut pixmap);

    let coverage: Vec<u8> = pixmap
        .data_as_u8_slice()
        .chunks_exact(4)
        .map(|px| px[3])
        .collect();
    let blurred = blur_alpha8(&coverage, u32::from(w), u32::from(h), radius, sigma)?;

    let gray = GrayImage::from_raw(u32::from(w), u32::from(h), blurred)
        .ok_or_else(|| WallError::render("shadow mask size mismatch"))?;
    let sw = (f64::from(w) * scale).round().max(1.0) as u32;
    let sh = (f64::from(h) * scale).round().max(1.0) as u32;
    let scaled = image::imageops::resize(&gray, sw, sh, FilterType::Triangle);

    Ok(ShadowSprite {
        offset: (
            (-margin * scale).round() as i64,
            ((style.shadow_offset_y - margin) * scale).round() as i64,
        ),
        width: sw,
        height: sh,
        mask: scaled.into_raw(),
    })
}

/// Draw one card (background, photo, caption) into a tile covering its content bounds.
///
/// Without `image` the photo slot stays card-colored. Without `font` no glyphs are drawn.
pub fn render_card(
    plan: &CardPlan,
    image: Option<&RgbaImage>,
    style: &ExportStyle,
    scale: f64,
    font: Option<&mut CaptionFont>,
) -> WallResult<Tile> {
    let bounds: Rect = plan.content_bounds();
    let w = to_u16(bounds.width(), "card tile width")?;
    let h = to_u16(bounds.height(), "card tile height")?;
    let (ox, oy) = (bounds.x0, bounds.y0);

    let mut ctx = vello_cpu::RenderContext::new(w, h);
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint(color(style.card_color));
    ctx.fill_path(&rounded_rect_path(
        plan.card.x0 - ox,
        plan.card.y0 - oy,
        plan.card.x1 - ox,
        plan.card.y1 - oy,
        style.card_radius * scale,
    ));

    if let Some(img) = image {
        let iw = to_u16(plan.image.width(), "image width")?;
        let ih = to_u16(plan.image.height(), "image height")?;
        let pixmap = cover_pixmap(img, iw, ih)?;
        ctx.set_transform(vello_cpu::kurbo::Affine::translate((
            plan.image.x0 - ox,
            plan.image.y0 - oy,
        )));
        ctx.set_paint(vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        });
        ctx.fill_path(&rounded_rect_path(
            0.0,
            0.0,
            f64::from(iw),
            f64::from(ih),
            style.image_radius * scale,
        ));
    }

    if let Some(font) = font {
        draw_caption(&mut ctx, plan, style, scale, (ox, oy), font);
    }

    ctx.flush();
    let mut pixmap = vello_cpu::Pixmap::new(w, h);
    ctx.render_to_pixmap(&mut pixmap);

    Ok(Tile {
        origin: (ox.round() as i64, oy.round() as i64),
        width: u32::from(w),
        height: u32::from(h),
        data: pixmap.data_as_u8_slice().to_vec(),
    })
}

fn draw_caption(
    ctx: &mut vello_cpu::RenderContext,
    plan: &CardPlan,
    style: &ExportStyle,
    scale: f64,
    origin: (f64, f64),
    font: &mut CaptionFont,
) {
    let font_data = font.font_data();
    let brush = CaptionBrush::from(style.caption_color);
    let center_x = plan.card.center().x - origin.0;
    let font_size = (style.font_size * scale) as f32;

    for (i, line) in plan.lines.iter().enumerate() {
        let layout = font.layout_line(&line.text, font_size, brush);
        let top = plan.caption_top - origin.1 + plan.line_advance * i as f64;
        // Center the shaped line box inside its line advance.
        let y = top + (plan.line_advance - f64::from(layout.height())) / 2.0;
        let x = center_x - f64::from(layout.width()) / 2.0;
        ctx.set_transform(vello_cpu::kurbo::Affine::translate((x, y)));

        for layout_line in layout.lines() {
            for item in layout_line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let b = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(b.r, b.g, b.b, b.a));
                let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&font_data)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{export::plan::CaptionLine, foundation::core::PhotoKey};

    fn plan_at(x: f64, y: f64, s: f64) -> CardPlan {
        let style = ExportStyle::default();
        let image = Rect::new(
            x + 15.0 * s,
            y + 15.0 * s,
            x + 205.0 * s,
            y + 215.0 * s,
        );
        CardPlan {
            key: PhotoKey::from("k"),
            card: Rect::new(x, y, x + 220.0 * s, y + 280.0 * s),
            image,
            caption_top: image.y1 + 12.0 * s,
            line_advance: style.font_size * style.line_height * s,
            lines: vec![CaptionLine {
                text: "hi".into(),
                width: 16.0 * s,
            }],
        }
    }

    fn px(tile: &Tile, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * tile.width + x) * 4) as usize;
        [tile.data[i], tile.data[i + 1], tile.data[i + 2], tile.data[i + 3]]
    }

    #[test]
    fn card_tile_shows_photo_inside_white_card() {
        let style = ExportStyle::default();
        let plan = plan_at(10.0, 20.0, 1.0);
        let img = RgbaImage::from_pixel(50, 40, image::Rgba([255, 0, 0, 255]));
        let tile = render_card(&plan, Some(&img), &style, 1.0, None).unwrap();

        assert_eq!(tile.origin, (10, 20));
        assert_eq!((tile.width, tile.height), (220, 280));
        let photo = px(&tile, 110, 115);
        assert!(photo[0] >= 250 && photo[1] <= 5 && photo[3] == 255);
        let caption_area = px(&tile, 110, 250);
        assert!(caption_area.iter().all(|&c| c >= 250));
        // Rounded corner stays transparent.
        assert_eq!(px(&tile, 0, 0)[3], 0);
    }

    #[test]
    fn missing_photo_leaves_card_blank() {
        let style = ExportStyle::default();
        let tile = render_card(&plan_at(0.0, 0.0, 2.0), None, &style, 2.0, None).unwrap();
        assert_eq!((tile.width, tile.height), (440, 560));
        assert!(px(&tile, 220, 230).iter().all(|&c| c >= 250));
    }

    #[test]
    fn shadow_is_soft_and_offset() {
        let style = ExportStyle::default();
        let s1 = build_shadow(&style, 1.0).unwrap();
        assert_eq!((s1.width, s1.height), (220 + 76, 280 + 76));
        assert_eq!(s1.offset, (-38, 20 - 38));

        let center = s1.mask[(s1.height / 2 * s1.width + s1.width / 2) as usize];
        let corner = s1.mask[0];
        assert!(center > 200);
        assert_eq!(corner, 0);

        let s2 = build_shadow(&style, 2.0).unwrap();
        assert_eq!((s2.width, s2.height), (s1.width * 2, s1.height * 2));
        assert_eq!(s2.offset, (-76, -36));
    }
}
