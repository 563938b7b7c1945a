//! Overlay compositor: the ordered layer stack drawn over the clip video.
//!
//! Layers, bottom to top: backdrop (background color), clip video, title card, then one
//! transition layer per clip boundary. Each non-video layer carries an opacity curve keyed on
//! output time.

use crate::foundation::core::{MediaTime, Rgba8};
use crate::foundation::error::CompileResult;
use crate::model::settings::{TransitionStyle, VideoCompilationSettings};
use crate::overlay::keyframes::{OpacityRamp, OpacityTrack};
use crate::overlay::title_card::{TitleCard, TitleCardRenderer};
use crate::timeline::builder::RenderInstructionSet;

/// Length of each fade ramp.
pub const TRANSITION_RAMP: MediaTime = MediaTime::from_millis(200);
/// Time the title card stays fully opaque before its fade-out begins, plus the fade itself.
pub const TITLE_DWELL: MediaTime = MediaTime::from_secs(3);

/// What a layer draws.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerKind {
    /// Solid fill under everything; shows through letterbox bars.
    Backdrop {
        /// Fill color.
        color: Rgba8,
    },
    /// The clip video, framed by the clip instructions.
    Video,
    /// Rasterized title card.
    Title {
        /// Card pixels.
        card: TitleCard,
    },
    /// Full-canvas fade color at one clip boundary.
    Transition {
        /// Fill color.
        color: Rgba8,
        /// Output time where the outgoing clip ends.
        boundary: MediaTime,
    },
}

/// One entry of the overlay stack.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct OverlayLayer {
    /// Unique key within the stack.
    pub key: String,
    /// Layer content.
    pub kind: LayerKind,
    /// Opacity over output time.
    pub opacity: OpacityTrack,
}

/// Ordered layers, bottom first.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct OverlayStack {
    /// Layers in draw order.
    pub layers: Vec<OverlayLayer>,
}

impl OverlayStack {
    /// Layers drawn above the video.
    pub fn overlays(&self) -> impl Iterator<Item = &OverlayLayer> {
        self.layers
            .iter()
            .skip_while(|l| !matches!(l.kind, LayerKind::Video))
            .skip(1)
    }

    /// Number of transition layers.
    pub fn transition_count(&self) -> usize {
        self.layers
            .iter()
            .filter(|l| matches!(l.kind, LayerKind::Transition { .. }))
            .count()
    }

    /// The title layer, when present.
    pub fn title(&self) -> Option<&OverlayLayer> {
        self.layers
            .iter()
            .find(|l| matches!(l.kind, LayerKind::Title { .. }))
    }

    /// Backdrop fill color.
    pub fn backdrop_color(&self) -> Option<Rgba8> {
        self.layers.iter().find_map(|l| match l.kind {
            LayerKind::Backdrop { color } => Some(color),
            _ => None,
        })
    }
}

/// Opacity curve of the title card: opaque until `TITLE_DWELL - TRANSITION_RAMP`, then a linear
/// fade reaching zero at `TITLE_DWELL`.
pub fn title_opacity() -> CompileResult<OpacityTrack> {
    OpacityTrack::new(
        1.0,
        vec![OpacityRamp::new(
            TITLE_DWELL - TRANSITION_RAMP,
            TRANSITION_RAMP,
            1.0,
            0.0,
        )?],
    )
}

/// Opacity curve of one boundary fade: 0 to 1 over the ramp ending at `boundary`, then 1 to 0
/// over the ramp starting there.
pub fn transition_opacity(boundary: MediaTime) -> CompileResult<OpacityTrack> {
    OpacityTrack::new(
        0.0,
        vec![
            OpacityRamp::new(boundary - TRANSITION_RAMP, TRANSITION_RAMP, 0.0, 1.0)?,
            OpacityRamp::new(boundary, TRANSITION_RAMP, 1.0, 0.0)?,
        ],
    )
}

/// Build the overlay stack for a timeline.
///
/// The title card is rasterized only when the settings ask for one; `titles` is not touched
/// otherwise.
pub fn build_overlay_stack(
    settings: &VideoCompilationSettings,
    instructions: &RenderInstructionSet,
    titles: &TitleCardRenderer,
) -> CompileResult<OverlayStack> {
    let mut layers = Vec::with_capacity(3 + instructions.boundaries.len());
    layers.push(OverlayLayer {
        key: "backdrop".to_owned(),
        kind: LayerKind::Backdrop {
            color: settings.background_color,
        },
        opacity: OpacityTrack::constant(1.0)?,
    });
    layers.push(OverlayLayer {
        key: "video".to_owned(),
        kind: LayerKind::Video,
        opacity: OpacityTrack::constant(1.0)?,
    });

    if settings.wants_title_card() {
        let card = titles.render(
            &settings.title_text,
            &settings.subtitle_text,
            settings.background_color,
            instructions.canvas,
        )?;
        layers.push(OverlayLayer {
            key: "title".to_owned(),
            kind: LayerKind::Title { card },
            opacity: title_opacity()?,
        });
    }

    if settings.transition == TransitionStyle::Fade {
        for (i, &boundary) in instructions.boundaries.iter().enumerate() {
            layers.push(OverlayLayer {
                key: format!("transition-{i}-{}", boundary.ticks()),
                kind: LayerKind::Transition {
                    color: settings.transition_color,
                    boundary,
                },
                opacity: transition_opacity(boundary)?,
            });
        }
    }

    tracing::debug!(
        layers = layers.len(),
        boundaries = instructions.boundaries.len(),
        "overlay stack built"
    );
    Ok(OverlayStack { layers })
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/stack.rs"]
mod tests;
