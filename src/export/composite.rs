use crate::foundation::{
    core::Rgba8,
    error::{WallError, WallResult},
};

pub type PremulRgba8 = [u8; 4];

pub fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    if src[3] == 0 {
        return dst;
    }
    if src[3] == 255 {
        return src;
    }
    let inv = 255u16 - u16::from(src[3]);
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = src[i].saturating_add(mul_div255(u16::from(dst[i]), inv));
    }
    out
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

/// Premultiplied RGBA8 raster the export is assembled on.
///
/// Sized independently of `vello_cpu` surfaces, which are limited to `u16` edges.
#[derive(Clone, Debug)]
pub struct Canvas {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> WallResult<Self> {
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| WallError::render("canvas size overflow"))?;
        Ok(Self {
            width,
            height,
            data: vec![0u8; len],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<PremulRgba8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Opaque linear gradient from the top-left corner to the bottom-right corner.
    pub fn fill_diagonal_gradient(&mut self, start: Rgba8, end: Rgba8) {
        let (w, h) = (f64::from(self.width), f64::from(self.height));
        let len_sq = w * w + h * h;
        let a = start.to_premul();
        let b = end.to_premul();
        let stride = self.width as usize * 4;
        if stride == 0 {
            return;
        }
        for (y, row) in self.data.chunks_exact_mut(stride).enumerate() {
            let py = (y as f64 + 0.5) * h;
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let t = if len_sq > 0.0 {
                    (((x as f64 + 0.5) * w + py) / len_sq).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                for c in 0..4 {
                    let v = f64::from(a[c]) + (f64::from(b[c]) - f64::from(a[c])) * t;
                    px[c] = v.round().clamp(0.0, 255.0) as u8;
                }
            }
        }
    }

    /// Source-over a premultiplied RGBA8 image with its top-left corner at `(x, y)`.
    /// Pixels falling outside the canvas are clipped.
    pub fn draw_over(
        &mut self,
        src: &[u8],
        src_w: u32,
        src_h: u32,
        x: i64,
        y: i64,
    ) -> WallResult<()> {
        if src.len() != src_w as usize * src_h as usize * 4 {
            return Err(WallError::render("draw_over expects src matching w*h*4"));
        }
        self.blit(src_w, src_h, x, y, |dst, si| {
            over(dst, [src[si], src[si + 1], src[si + 2], src[si + 3]])
        });
        Ok(())
    }

    /// Source-over a coverage mask painted with one premultiplied color.
    pub fn draw_mask(
        &mut self,
        mask: &[u8],
        mask_w: u32,
        mask_h: u32,
        x: i64,
        y: i64,
        color: PremulRgba8,
    ) -> WallResult<()> {
        if mask.len() != mask_w as usize * mask_h as usize {
            return Err(WallError::render("draw_mask expects mask matching w*h"));
        }
        self.blit(mask_w, mask_h, x, y, |dst, si| {
            let cov = u16::from(mask[si / 4]);
            let src = [
                mul_div255(u16::from(color[0]), cov),
                mul_div255(u16::from(color[1]), cov),
                mul_div255(u16::from(color[2]), cov),
                mul_div255(u16::from(color[3]), cov),
            ];
            over(dst, src)
        });
        Ok(())
    }

    /// Visit the overlap of a `src_w`×`src_h` rectangle placed at `(x, y)`. `f` gets the
    /// current destination pixel and the byte index of the source pixel (4 bytes each).
    fn blit(
        &mut self,
        src_w: u32,
        src_h: u32,
        x: i64,
        y: i64,
        mut f: impl FnMut(PremulRgba8, usize) -> PremulRgba8,
    ) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + i64::from(src_w)).min(i64::from(self.width));
        let y1 = (y + i64::from(src_h)).min(i64::from(self.height));
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        let canvas_w = self.width as usize;
        for dy in y0..y1 {
            let sy = (dy - y) as usize;
            for dx in x0..x1 {
                let sx = (dx - x) as usize;
                let si = (sy * src_w as usize + sx) * 4;
                let di = (dy as usize * canvas_w + dx as usize) * 4;
                let d = [
                    self.data[di],
                    self.data[di + 1],
                    self.data[di + 2],
                    self.data[di + 3],
                ];
                let out = f(d, si);
                self.data[di..di + 4].copy_from_slice(&out);
            }
        }
    }
}
