//! Title card rasterization.
//!
//! The card is laid out as SVG markup and rasterized with `resvg` into a canvas-sized,
//! premultiplied RGBA8 image: background fill, bold headline centered, optional subtitle below.

use crate::foundation::core::{Canvas, Rgba8};
use crate::foundation::error::{CompileError, CompileResult};
use std::path::Path;
use std::sync::Arc;

/// Horizontal text margin in pixels.
pub const TITLE_MARGIN_PX: f64 = 40.0;
/// Headline shift upwards when a subtitle is present.
pub const TITLE_SUBTITLE_SHIFT_PX: f64 = 60.0;
/// Gap between the headline's bottom and the subtitle's top.
pub const SUBTITLE_GAP_PX: f64 = 20.0;

/// Headline font size relative to `min(width, height)`.
const TITLE_FONT_RATIO: f64 = 0.08;
/// Subtitle font size relative to `min(width, height)`.
const SUBTITLE_FONT_RATIO: f64 = 0.04;
/// Average glyph advance relative to font size, used to decide when text must be condensed.
const APPROX_ADVANCE_RATIO: f64 = 0.6;

/// Rasterized title card, canvas-sized, premultiplied RGBA8.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct TitleCard {
    /// Pixel width.
    pub width: u32,
    /// Pixel height.
    pub height: u32,
    #[serde(skip)]
    pixels: Arc<Vec<u8>>,
}

impl TitleCard {
    /// Premultiplied RGBA8 pixel data, row-major.
    pub fn premul_rgba8(&self) -> &[u8] {
        &self.pixels
    }

    /// Save as a straight-alpha PNG.
    pub fn write_png(&self, path: &Path) -> CompileResult<()> {
        let straight = demultiply(&self.pixels);
        let img = image::RgbaImage::from_raw(self.width, self.height, straight)
            .ok_or_else(|| CompileError::image("title card buffer does not match its size"))?;
        img.save(path).map_err(|e| {
            CompileError::image(format!("write title card '{}': {e}", path.display()))
        })
    }
}

/// Lays out and rasterizes title cards with a shared font database.
#[derive(Clone)]
pub struct TitleCardRenderer {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl std::fmt::Debug for TitleCardRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TitleCardRenderer")
            .field("faces", &self.fontdb.len())
            .finish()
    }
}

impl TitleCardRenderer {
    /// Renderer using system fonts plus any `.ttf`/`.otf`/`.ttc` files in `font_dirs`.
    pub fn with_system_fonts(font_dirs: &[&Path]) -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        for dir in font_dirs {
            load_fonts_from_dir(&mut db, dir);
        }
        tracing::debug!(faces = db.len(), "title font database ready");
        Self {
            fontdb: Arc::new(db),
        }
    }

    /// Renderer with no fonts. Text draws nothing; the background still fills the card.
    pub fn without_fonts() -> Self {
        Self {
            fontdb: Arc::new(usvg::fontdb::Database::new()),
        }
    }

    /// Rasterize a card for `canvas`.
    #[tracing::instrument(skip(self, title, subtitle))]
    pub fn render(
        &self,
        title: &str,
        subtitle: &str,
        background: Rgba8,
        canvas: Canvas,
    ) -> CompileResult<TitleCard> {
        if canvas.width == 0 || canvas.height == 0 {
            return Err(CompileError::image("title card canvas must be non-empty"));
        }
        let markup = title_card_svg(title, subtitle, background, canvas);
        let opts = usvg::Options {
            fontdb: self.fontdb.clone(),
            ..Default::default()
        };
        let tree = usvg::Tree::from_str(&markup, &opts)
            .map_err(|e| CompileError::image(format!("title card layout: {e}")))?;

        let mut pixmap = resvg::tiny_skia::Pixmap::new(canvas.width, canvas.height)
            .ok_or_else(|| CompileError::image("failed to allocate title card pixmap"))?;
        resvg::render(
            &tree,
            resvg::tiny_skia::Transform::identity(),
            &mut pixmap.as_mut(),
        );

        Ok(TitleCard {
            width: canvas.width,
            height: canvas.height,
            pixels: Arc::new(pixmap.take()),
        })
    }
}

/// SVG markup for a title card.
pub fn title_card_svg(title: &str, subtitle: &str, background: Rgba8, canvas: Canvas) -> String {
    let w = f64::from(canvas.width);
    let h = f64::from(canvas.height);
    let base = w.min(h);
    let title_size = base * TITLE_FONT_RATIO;
    let subtitle_size = base * SUBTITLE_FONT_RATIO;
    let has_subtitle = !subtitle.is_empty();

    let title_y = if has_subtitle {
        h / 2.0 - TITLE_SUBTITLE_SHIFT_PX
    } else {
        h / 2.0
    };
    let subtitle_y = title_y + title_size / 2.0 + SUBTITLE_GAP_PX + subtitle_size / 2.0;
    let max_width = (w - 2.0 * TITLE_MARGIN_PX).max(1.0);

    let mut svg = String::with_capacity(1024);
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
    ));
    svg.push_str(&format!(
        r#"<rect x="0" y="0" width="{w}" height="{h}" fill="{}" fill-opacity="{:.4}"/>"#,
        background.to_hex_rgb(),
        f64::from(background.a) / 255.0
    ));
    svg.push_str(&text_element(
        title,
        w / 2.0,
        title_y,
        title_size,
        "bold",
        1.0,
        max_width,
    ));
    if has_subtitle {
        svg.push_str(&text_element(
            subtitle,
            w / 2.0,
            subtitle_y,
            subtitle_size,
            "normal",
            0.8,
            max_width,
        ));
    }
    svg.push_str("</svg>");
    svg
}

fn text_element(
    text: &str,
    x: f64,
    y: f64,
    size: f64,
    weight: &str,
    opacity: f64,
    max_width: f64,
) -> String {
    let approx = text.chars().count() as f64 * size * APPROX_ADVANCE_RATIO;
    let fit = if approx > max_width {
        format!(r#" textLength="{max_width:.1}" lengthAdjust="spacingAndGlyphs""#)
    } else {
        String::new()
    };
    format!(
        r##"<text x="{x:.1}" y="{y:.1}" font-family="sans-serif" font-size="{size:.1}" font-weight="{weight}" fill="#ffffff" fill-opacity="{opacity}" text-anchor="middle" dominant-baseline="central"{fit}>{}</text>"##,
        escape_xml(text)
    )
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn demultiply(premul: &[u8]) -> Vec<u8> {
    let mut out = premul.to_vec();
    for px in out.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
    out
}

fn load_fonts_from_dir(db: &mut usvg::fontdb::Database, dir: &Path) {
    let Ok(rd) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in rd.flatten() {
        let path = entry.path();
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if path.is_file() && matches!(ext.as_str(), "ttf" | "otf" | "ttc") {
            let _ = db.load_font_file(&path);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/title_card.rs"]
mod tests;
