use crate::foundation::core::{MediaTime, TimeRange};
use crate::foundation::error::{CompileError, CompileResult};

/// Linear opacity change over one output time range.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OpacityRamp {
    /// Span of the ramp on the output timeline.
    pub range: TimeRange,
    /// Opacity at `range.start`.
    pub start_opacity: f64,
    /// Opacity at `range.end()` and after.
    pub end_opacity: f64,
}

impl OpacityRamp {
    /// Ramp from `start_opacity` to `end_opacity` over `[start, start + duration)`.
    pub fn new(
        start: MediaTime,
        duration: MediaTime,
        start_opacity: f64,
        end_opacity: f64,
    ) -> CompileResult<Self> {
        Ok(Self {
            range: TimeRange::new(start, duration)?,
            start_opacity,
            end_opacity,
        })
    }

    fn at(&self, t: MediaTime) -> f64 {
        let dur = self.range.duration.ticks();
        if dur <= 0 {
            return self.end_opacity;
        }
        let u = (t - self.range.start).ticks() as f64 / dur as f64;
        self.start_opacity + (self.end_opacity - self.start_opacity) * u.clamp(0.0, 1.0)
    }
}

/// Opacity over output time, as a resting value plus non-overlapping ramps.
///
/// Before the first ramp the track holds `initial`; between and after ramps it holds the
/// previous ramp's `end_opacity`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OpacityTrack {
    initial: f64,
    ramps: Vec<OpacityRamp>, // sorted, non-overlapping
}

impl OpacityTrack {
    /// Build a track; ramps must be sorted and must not overlap, opacities within `[0, 1]`.
    pub fn new(initial: f64, ramps: Vec<OpacityRamp>) -> CompileResult<Self> {
        check_opacity(initial)?;
        for r in &ramps {
            check_opacity(r.start_opacity)?;
            check_opacity(r.end_opacity)?;
        }
        if !ramps.windows(2).all(|w| w[0].range.end() <= w[1].range.start) {
            return Err(CompileError::validation(
                "opacity ramps must be sorted and non-overlapping",
            ));
        }
        Ok(Self { initial, ramps })
    }

    /// Constant opacity.
    pub fn constant(value: f64) -> CompileResult<Self> {
        Self::new(value, Vec::new())
    }

    /// Resting value before the first ramp.
    pub fn initial(&self) -> f64 {
        self.initial
    }

    /// Ramps in time order.
    pub fn ramps(&self) -> &[OpacityRamp] {
        &self.ramps
    }

    /// Opacity at output time `t`.
    pub fn sample(&self, t: MediaTime) -> f64 {
        // Last ramp that has started by `t`.
        let idx = self.ramps.partition_point(|r| r.range.start <= t);
        if idx == 0 {
            return self.initial;
        }
        self.ramps[idx - 1].at(t)
    }
}

fn check_opacity(v: f64) -> CompileResult<()> {
    if !v.is_finite() || !(0.0..=1.0).contains(&v) {
        return Err(CompileError::validation(format!(
            "opacity {v} is outside [0, 1]"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/keyframes.rs"]
mod tests;
