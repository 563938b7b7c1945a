use crate::foundation::core::{Canvas, MediaTime, Rgba8};
use crate::foundation::error::{CompileError, CompileResult};
use crate::model::media::SourceHandle;

/// Target canvas orientation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// 1920x1080.
    #[default]
    Landscape,
    /// 1080x1920.
    Portrait,
}

impl Orientation {
    /// Exact output pixel size.
    pub fn canvas(self) -> Canvas {
        match self {
            Self::Landscape => Canvas {
                width: 1920,
                height: 1080,
            },
            Self::Portrait => Canvas {
                width: 1080,
                height: 1920,
            },
        }
    }
}

/// Transition style between consecutive clips.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionStyle {
    /// Fade through the transition color at every clip boundary.
    #[default]
    Fade,
    /// Hard cut.
    None,
}

/// Loop length options offered by the settings screen, in minutes (0 = play once).
pub const LOOP_MINUTE_OPTIONS: [u32; 8] = [0, 5, 10, 15, 30, 60, 120, 240];

/// Requested total playback time. Informational: the renderer never applies it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct LoopDuration {
    /// Minutes of looped playback; zero means play once.
    pub minutes: u32,
}

impl LoopDuration {
    /// Play once.
    pub const NONE: Self = Self { minutes: 0 };

    /// Snap an arbitrary minute value to the closest offered option.
    pub fn snap_minutes(minutes: f64) -> Self {
        let mut best = LOOP_MINUTE_OPTIONS[0];
        for &opt in &LOOP_MINUTE_OPTIONS {
            if (f64::from(opt) - minutes).abs() < (f64::from(best) - minutes).abs() {
                best = opt;
            }
        }
        Self { minutes: best }
    }

    /// `true` when looping is requested.
    pub fn is_looping(self) -> bool {
        self.minutes > 0
    }

    /// Looped span as media time.
    pub fn as_media_time(self) -> MediaTime {
        MediaTime::from_secs(i64::from(self.minutes) * 60)
    }

    /// How many times a video of `total` length plays within the loop window (at least 1).
    pub fn estimated_loop_count(self, total: MediaTime) -> u64 {
        if !self.is_looping() || !total.is_positive() {
            return 1;
        }
        ((self.as_media_time().0 / total.0) as u64).max(1)
    }

    /// Human label matching the settings screen.
    pub fn label(self) -> String {
        if self.minutes == 0 {
            return "No loop (play once)".to_owned();
        }
        let hours = self.minutes / 60;
        let mins = self.minutes % 60;
        match (hours, mins) {
            (0, m) => format!("{m} minutes"),
            (h, 0) => format!("{h} hour{}", if h == 1 { "" } else { "s" }),
            (h, m) => format!("{h}h {m}m"),
        }
    }
}

/// Background music source and gain.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MusicTrack {
    /// Audio file reference, resolved like clip sources.
    pub source: SourceHandle,
    /// Linear gain in `[0, 1]`.
    #[serde(default = "default_music_volume")]
    pub volume: f32,
}

fn default_music_volume() -> f32 {
    0.5
}

/// One render configuration, immutable for the duration of a compile.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct VideoCompilationSettings {
    /// Target canvas.
    pub orientation: Orientation,
    /// Requested loop window (estimate only).
    pub loop_duration: LoopDuration,
    /// Title card headline.
    pub title_text: String,
    /// Title card secondary line.
    pub subtitle_text: String,
    /// Whether to show the title card.
    pub include_title_screen: bool,
    /// Boundary transition style.
    pub transition: TransitionStyle,
    /// Fill of the fade-transition overlay.
    pub transition_color: Rgba8,
    /// Canvas backdrop and letterbox fill.
    pub background_color: Rgba8,
    /// Optional looped background music.
    pub music: Option<MusicTrack>,
}

impl Default for VideoCompilationSettings {
    fn default() -> Self {
        Self {
            orientation: Orientation::Landscape,
            loop_duration: LoopDuration::NONE,
            title_text: String::new(),
            subtitle_text: String::new(),
            include_title_screen: false,
            transition: TransitionStyle::Fade,
            transition_color: Rgba8::BLACK,
            background_color: Rgba8::BLACK,
            music: None,
        }
    }
}

impl VideoCompilationSettings {
    /// Target canvas size.
    pub fn canvas(&self) -> Canvas {
        self.orientation.canvas()
    }

    /// `true` when a title card layer should be produced.
    pub fn wants_title_card(&self) -> bool {
        self.include_title_screen && !self.title_text.is_empty()
    }

    /// Check value ranges.
    pub fn validate(&self) -> CompileResult<()> {
        if let Some(music) = &self.music {
            if !music.volume.is_finite() || !(0.0..=1.0).contains(&music.volume) {
                return Err(CompileError::validation(format!(
                    "music volume must be within [0, 1], got {}",
                    music.volume
                )));
            }
            if music.source.as_str().trim().is_empty() {
                return Err(CompileError::validation("music source must be non-empty"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/settings.rs"]
mod tests;
