use crate::assets::probe::VideoStreamInfo;
use crate::foundation::core::{Affine, Canvas, Size, Vec2};

/// Aspect-fit framing of one clip on the output canvas.
///
/// One transform covers a clip's whole placed duration; slow motion never changes framing.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClipTransform {
    /// Encoded rotation in degrees (`0 | 90 | 180 | 270`).
    pub rotation_deg: u16,
    /// Encoded pixel size.
    pub natural_size: Size,
    /// Upright size after rotation (width/height swapped for quarter turns).
    pub display_size: Size,
    /// Uniform scale `min(canvas_w / display_w, canvas_h / display_h)`.
    pub scale: f64,
    /// Offset of the scaled content's top-left corner on the canvas.
    pub translate: Vec2,
}

/// Integer destination rectangle used when blitting decoded frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelPlacement {
    /// Left edge on the canvas.
    pub x: i64,
    /// Top edge on the canvas.
    pub y: i64,
    /// Scaled width.
    pub width: u32,
    /// Scaled height.
    pub height: u32,
}

impl ClipTransform {
    /// Identity framing: natural pixels drawn at the origin.
    pub fn identity(video: VideoStreamInfo) -> Self {
        let natural = Size::new(f64::from(video.width), f64::from(video.height));
        Self {
            rotation_deg: 0,
            natural_size: natural,
            display_size: natural,
            scale: 1.0,
            translate: Vec2::ZERO,
        }
    }

    /// Letterbox `video` into `canvas`, centered on both axes.
    ///
    /// Degenerate sizes or a non-finite scale fall back to [`ClipTransform::identity`].
    pub fn aspect_fit(video: VideoStreamInfo, canvas: Canvas) -> Self {
        if video.width == 0 || video.height == 0 || canvas.width == 0 || canvas.height == 0 {
            return Self::identity(video);
        }

        let natural = Size::new(f64::from(video.width), f64::from(video.height));
        let rotation_deg = video.rotation_deg % 360;
        let display = if rotation_deg == 90 || rotation_deg == 270 {
            Size::new(natural.height, natural.width)
        } else {
            natural
        };

        let target = canvas.size();
        let scale = (target.width / display.width).min(target.height / display.height);
        if !scale.is_finite() || scale <= 0.0 {
            return Self::identity(video);
        }

        let scaled = display * scale;
        Self {
            rotation_deg,
            natural_size: natural,
            display_size: display,
            scale,
            translate: Vec2::new(
                (target.width - scaled.width) / 2.0,
                (target.height - scaled.height) / 2.0,
            ),
        }
    }

    /// Content size on the canvas.
    pub fn scaled_size(&self) -> Size {
        self.display_size * self.scale
    }

    /// Map from encoded pixel space to upright display space.
    pub fn rotation_affine(&self) -> Affine {
        let w = self.natural_size.width;
        let h = self.natural_size.height;
        match self.rotation_deg {
            90 => Affine::new([0.0, 1.0, -1.0, 0.0, h, 0.0]),
            180 => Affine::new([-1.0, 0.0, 0.0, -1.0, w, h]),
            270 => Affine::new([0.0, -1.0, 1.0, 0.0, 0.0, w]),
            _ => Affine::IDENTITY,
        }
    }

    /// Map from upright display space to canvas space.
    pub fn display_affine(&self) -> Affine {
        Affine::translate(self.translate) * Affine::scale(self.scale)
    }

    /// Full map from encoded pixel space to canvas space.
    pub fn to_affine(&self) -> Affine {
        self.display_affine() * self.rotation_affine()
    }

    /// Rounded destination rectangle for upright, pre-scaled frames.
    pub fn placement(&self) -> PixelPlacement {
        let scaled = self.scaled_size();
        PixelPlacement {
            x: self.translate.x.round() as i64,
            y: self.translate.y.round() as i64,
            width: (scaled.width.round() as u32).max(1),
            height: (scaled.height.round() as u32).max(1),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/transform.rs"]
mod tests;
