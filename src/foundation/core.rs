use crate::foundation::error::{CompileError, CompileResult};

pub use kurbo::{Affine, Point, Rect, Size, Vec2};

/// Ticks per second of [`MediaTime`].
pub const TICKS_PER_SEC: i64 = 1_000_000;

/// A point or span on a media time axis, stored as integer microsecond ticks.
///
/// Integer ticks keep timeline arithmetic exact: offsets are sums of durations, and the
/// contiguity checks compare with `==`. Serialized as seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MediaTime(pub i64);

impl MediaTime {
    /// Zero-length time.
    pub const ZERO: Self = Self(0);

    /// Build from whole ticks.
    pub const fn from_ticks(ticks: i64) -> Self {
        Self(ticks)
    }

    /// Build from milliseconds.
    pub const fn from_millis(ms: i64) -> Self {
        Self(ms * (TICKS_PER_SEC / 1000))
    }

    /// Build from whole seconds.
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs * TICKS_PER_SEC)
    }

    /// Build from fractional seconds, rounding to the nearest tick.
    ///
    /// Non-finite input maps to zero.
    pub fn from_secs_f64(secs: f64) -> Self {
        if !secs.is_finite() {
            return Self::ZERO;
        }
        Self((secs * TICKS_PER_SEC as f64).round() as i64)
    }

    /// Raw tick count.
    pub const fn ticks(self) -> i64 {
        self.0
    }

    /// Fractional seconds.
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / TICKS_PER_SEC as f64
    }

    /// `true` when the span is strictly positive.
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Output duration of a source span played at `rate` (0.5 = half speed, twice as long).
    pub fn scaled_by_rate(self, rate: f64) -> CompileResult<Self> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(CompileError::validation(format!(
                "playback rate must be finite and > 0, got {rate}"
            )));
        }
        Ok(Self((self.0 as f64 / rate).round() as i64))
    }

    /// Smaller of two times.
    pub fn min(self, other: Self) -> Self {
        if self <= other { self } else { other }
    }

    /// Larger of two times.
    pub fn max(self, other: Self) -> Self {
        if self >= other { self } else { other }
    }

    /// Subtraction clamped at zero.
    pub fn saturating_sub(self, other: Self) -> Self {
        Self((self.0 - other.0).max(0))
    }
}

impl std::ops::Add for MediaTime {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for MediaTime {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl std::ops::Sub for MediaTime {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl std::iter::Sum for MediaTime {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |a, b| a + b)
    }
}

impl std::fmt::Display for MediaTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}s", self.as_secs_f64())
    }
}

impl serde::Serialize for MediaTime {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(self.as_secs_f64())
    }
}

impl<'de> serde::Deserialize<'de> for MediaTime {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let secs = f64::deserialize(d)?;
        if !secs.is_finite() {
            return Err(serde::de::Error::custom(
                "time must be a finite number of seconds",
            ));
        }
        Ok(Self::from_secs_f64(secs))
    }
}

/// Half-open span `[start, start + duration)` on a media time axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TimeRange {
    /// Inclusive start.
    pub start: MediaTime,
    /// Span length.
    pub duration: MediaTime,
}

impl TimeRange {
    /// Create a range; negative durations are rejected.
    pub fn new(start: MediaTime, duration: MediaTime) -> CompileResult<Self> {
        if duration.0 < 0 {
            return Err(CompileError::validation("TimeRange duration must be >= 0"));
        }
        Ok(Self { start, duration })
    }

    /// Exclusive end.
    pub fn end(self) -> MediaTime {
        self.start + self.duration
    }

    /// `true` when `t` is inside `[start, end)`.
    pub fn contains(self, t: MediaTime) -> bool {
        self.start <= t && t < self.end()
    }

    /// `true` when the range has no extent.
    pub fn is_empty(self) -> bool {
        self.duration.0 == 0
    }
}

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated frame rate.
    pub fn new(num: u32, den: u32) -> CompileResult<Self> {
        if den == 0 {
            return Err(CompileError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(CompileError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Frames per second as `f64`.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Presentation time of frame `idx`.
    pub fn frame_time(self, idx: u64) -> MediaTime {
        let ticks = i128::from(idx) * i128::from(TICKS_PER_SEC) * i128::from(self.den)
            / i128::from(self.num);
        MediaTime(ticks as i64)
    }

    /// First frame index whose presentation time is `>= t`.
    pub fn first_frame_at_or_after(self, t: MediaTime) -> u64 {
        if t.0 <= 0 {
            return 0;
        }
        let num = i128::from(t.0) * i128::from(self.num);
        let den = i128::from(TICKS_PER_SEC) * i128::from(self.den);
        ((num + den - 1) / den) as u64
    }

    /// Number of frames needed to cover `duration` from time zero.
    pub fn frames_covering(self, duration: MediaTime) -> u64 {
        self.first_frame_at_or_after(duration)
    }
}

impl Default for Fps {
    fn default() -> Self {
        Self { num: 30, den: 1 }
    }
}

/// Output canvas size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Canvas size as floating point.
    pub fn size(self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }
}

/// Straight-alpha RGBA8 color as configured by the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha (255 = opaque).
    pub a: u8,
}

impl Rgba8 {
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Opaque color from RGB channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Premultiplied `[r, g, b, a]` bytes.
    pub fn to_premul(self) -> [u8; 4] {
        fn premul(c: u8, a: u8) -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            (((c * a) + 127) / 255) as u8
        }

        [
            premul(self.r, self.a),
            premul(self.g, self.a),
            premul(self.b, self.a),
            self.a,
        ]
    }

    /// `#rrggbb` hex string (alpha dropped), used when emitting SVG.
    pub fn to_hex_rgb(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Default for Rgba8 {
    fn default() -> Self {
        Self::BLACK
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
