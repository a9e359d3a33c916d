use std::io::Cursor;

use anyhow::Context as _;

use crate::{
    export::{composite::Canvas, options::ExportFormat},
    foundation::error::{WallError, WallResult},
};

/// Encode the finished canvas. JPEG drops alpha; PNG keeps it.
pub fn encode_canvas(
    canvas: Canvas,
    format: ExportFormat,
    jpeg_quality: u8,
) -> WallResult<Vec<u8>> {
    let (w, h) = (canvas.width(), canvas.height());
    let mut data = canvas.into_data();
    unpremultiply_rgba8_in_place(&mut data);
    let rgba = image::RgbaImage::from_raw(w, h, data)
        .ok_or_else(|| WallError::encode("canvas buffer does not match its dimensions"))?;

    let mut buf = Vec::new();
    match format {
        ExportFormat::Png => {
            image::DynamicImage::ImageRgba8(rgba)
                .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
                .context("encode png")?;
        }
        ExportFormat::Jpeg => {
            let rgb = image::DynamicImage::ImageRgba8(rgba).to_rgb8();
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, jpeg_quality)
                .encode_image(&rgb)
                .context("encode jpeg")?;
        }
    }
    Ok(buf)
}

fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}
