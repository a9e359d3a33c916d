use anyhow::Context;
use image::{RgbaImage, imageops::FilterType};

use crate::foundation::error::{WallError, WallResult};

pub fn decode_image(bytes: &[u8]) -> WallResult<RgbaImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    Ok(dyn_img.to_rgba8())
}

/// Source rectangle `(x, y, w, h)` that covers a `dst_w`×`dst_h` box at the same aspect
/// ratio, centered on the source. The other axis is cropped.
pub fn cover_crop(src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> (u32, u32, u32, u32) {
    if src_w == 0 || src_h == 0 || dst_w == 0 || dst_h == 0 {
        return (0, 0, src_w, src_h);
    }
    let src_ratio = f64::from(src_w) / f64::from(src_h);
    let dst_ratio = f64::from(dst_w) / f64::from(dst_h);
    if src_ratio > dst_ratio {
        let w = ((f64::from(src_h) * dst_ratio).round() as u32).clamp(1, src_w);
        ((src_w - w) / 2, 0, w, src_h)
    } else {
        let h = ((f64::from(src_w) / dst_ratio).round() as u32).clamp(1, src_h);
        (0, (src_h - h) / 2, src_w, h)
    }
}

/// Center-crop and resample to exactly `w`×`h`.
pub fn fit_cover(img: &RgbaImage, w: u32, h: u32) -> RgbaImage {
    let (sx, sy, sw, sh) = cover_crop(img.width(), img.height(), w, h);
    let cropped = image::imageops::crop_imm(img, sx, sy, sw, sh).to_image();
    if cropped.dimensions() == (w, h) {
        return cropped;
    }
    image::imageops::resize(&cropped, w, h, FilterType::CatmullRom)
}

pub fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

/// Cover-fit `img` into a premultiplied `vello_cpu` pixmap of exactly `w`×`h`.
pub fn cover_pixmap(img: &RgbaImage, w: u16, h: u16) -> WallResult<vello_cpu::Pixmap> {
    if w == 0 || h == 0 {
        return Err(WallError::render("image slot has zero size"));
    }
    let fitted = fit_cover(img, u32::from(w), u32::from(h));
    let mut bytes = fitted.into_raw();
    premultiply_rgba8_in_place(&mut bytes);
    premul_bytes_to_pixmap(&bytes, w, h)
}

pub fn premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    w: u16,
    h: u16,
) -> WallResult<vello_cpu::Pixmap> {
    if rgba8_premul.len() != usize::from(w) * usize::from(h) * 4 {
        return Err(WallError::render("pixmap byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(usize::from(w) * usize::from(h));
    for px in rgba8_premul.chunks_exact(4) {
        may_have_opacities |= px[3] != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a: px[3],
        });
    }
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cover_crop_trims_the_long_axis() {
        // Wide source into a taller box: crop width.
        assert_eq!(cover_crop(400, 200, 190, 200), (105, 0, 190, 200));
        // Tall source into a wide box: crop height.
        assert_eq!(cover_crop(100, 400, 200, 100), (0, 175, 100, 50));
        // Same aspect ratio: untouched.
        assert_eq!(cover_crop(380, 400, 190, 200), (0, 0, 380, 400));
    }

    #[test]
    fn fit_cover_hits_target_size() {
        let img = RgbaImage::from_pixel(31, 7, image::Rgba([1, 2, 3, 255]));
        let out = fit_cover(&img, 19, 20);
        assert_eq!(out.dimensions(), (19, 20));
        assert_eq!(out.get_pixel(9, 10).0, [1, 2, 3, 255]);
    }

    #[test]
    fn premultiply_zeroes_transparent_pixels() {
        let mut px = vec![200, 100, 50, 0, 200, 100, 50, 255];
        premultiply_rgba8_in_place(&mut px);
        assert_eq!(px, vec![0, 0, 0, 0, 200, 100, 50, 255]);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_image(b"definitely not an image").is_err());
    }

    #[test]
    fn cover_pixmap_has_requested_size() {
        let img = RgbaImage::from_pixel(8, 8, image::Rgba([9, 9, 9, 255]));
        let pm = cover_pixmap(&img, 4, 6).unwrap();
        assert_eq!((pm.width(), pm.height()), (4, 6));
    }
}
