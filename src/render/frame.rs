use crate::foundation::core::Rgba8;
use crate::foundation::error::{CompileError, CompileResult};
use crate::foundation::math::{add_sat_u8, mul_div255_u16, opacity_to_u8};
use crate::timeline::transform::PixelPlacement;

/// Premultiplied RGBA8 pixel.
pub type PremulRgba8 = [u8; 4];

/// One rendered output frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Frame filled with one straight-alpha color, stored premultiplied.
    pub fn filled(width: u32, height: u32, color: Rgba8) -> Self {
        let px = color.to_premul();
        let mut data = vec![0u8; width as usize * height as usize * 4];
        for d in data.chunks_exact_mut(4) {
            d.copy_from_slice(&px);
        }
        Self {
            width,
            height,
            data,
            premultiplied: true,
        }
    }

    /// Pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<PremulRgba8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.data[i..i + 4].try_into().ok()
    }

    /// Copy an opaque `src_w x src_h` RGBA image to `at`, clipped to the frame.
    ///
    /// Decoded video frames carry alpha 255, so the copy is a plain overwrite.
    pub fn blit_opaque(
        &mut self,
        src: &[u8],
        src_w: u32,
        src_h: u32,
        at: PixelPlacement,
    ) -> CompileResult<()> {
        if src.len() != src_w as usize * src_h as usize * 4 {
            return Err(CompileError::export(format!(
                "blit source is {} bytes, expected {src_w}x{src_h} rgba",
                src.len()
            )));
        }

        let x0 = at.x.max(0);
        let y0 = at.y.max(0);
        let x1 = (at.x + i64::from(src_w)).min(i64::from(self.width));
        let y1 = (at.y + i64::from(src_h)).min(i64::from(self.height));
        if x0 >= x1 || y0 >= y1 {
            return Ok(());
        }

        let row_bytes = (x1 - x0) as usize * 4;
        let sx = (x0 - at.x) as usize;
        for y in y0..y1 {
            let sy = (y - at.y) as usize;
            let s = (sy * src_w as usize + sx) * 4;
            let d = (y as usize * self.width as usize + x0 as usize) * 4;
            self.data[d..d + row_bytes].copy_from_slice(&src[s..s + row_bytes]);
        }
        Ok(())
    }

    /// Composite a full-frame color at `opacity`.
    pub fn over_color(&mut self, color: Rgba8, opacity: f32) {
        let src = color.to_premul();
        if opacity_to_u8(opacity) == 0 || src[3] == 0 {
            return;
        }
        for d in self.data.chunks_exact_mut(4) {
            let out = over([d[0], d[1], d[2], d[3]], src, opacity);
            d.copy_from_slice(&out);
        }
    }

    /// Composite a same-size premultiplied image at `opacity`.
    pub fn over_image(&mut self, src: &[u8], opacity: f32) -> CompileResult<()> {
        if self.data.len() != src.len() {
            return Err(CompileError::export(
                "over_image expects a frame-sized rgba8 buffer",
            ));
        }
        if opacity_to_u8(opacity) == 0 {
            return Ok(());
        }
        for (d, s) in self.data.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
            let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
            d.copy_from_slice(&out);
        }
        Ok(())
    }
}

/// Source-over for one premultiplied pixel with an extra layer opacity.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let op = opacity_to_u8(opacity);
    if op == 0 || src[3] == 0 {
        return dst;
    }

    let sa = mul_div255_u16(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }
    let inv = 255u16 - sa;

    let mut out = [0u8; 4];
    out[3] = add_sat_u8(sa, mul_div255_u16(u16::from(dst[3]), inv));
    for i in 0..3 {
        let sc = mul_div255_u16(u16::from(src[i]), op);
        let dc = mul_div255_u16(u16::from(dst[i]), inv);
        out[i] = add_sat_u8(sc, dc);
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/render/frame.rs"]
mod tests;
