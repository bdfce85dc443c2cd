//! Profile data model and the field-by-field merge.
//!
//! Every field doubles as "unset" when it holds its type's zero value, so a
//! profile in the document only needs the fields it changes.

use serde::{Deserialize, Serialize};

/// Written as a profile's `delay_ms` to force the merged delay to 0 instead
/// of inheriting it from `default`.
pub const DELAY_FORCE_ZERO: i64 = -999;

/// Capture and render format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AudioSettings {
    /// Sample rate in Hz.
    #[serde(default)]
    pub sample_rate: u32,

    /// Channel count of the mixed output.
    #[serde(default)]
    pub channels: u16,
}

impl AudioSettings {
    fn defaults() -> Self {
        Self {
            sample_rate: 48000,
            channels: 2,
        }
    }
}

/// Input sources used while recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RecordSettings {
    /// Source id of the guitar interface.
    #[serde(default)]
    pub guitar_input: String,

    /// Source id capturing the backing track. Empty means the default sink's
    /// monitor is looked up at record time.
    #[serde(default)]
    pub monitor_input: String,
}

impl RecordSettings {
    fn defaults() -> Self {
        Self {
            guitar_input:
                "alsa_input.usb-Focusrite_Scarlett_2i2_USB_Y814JK8264026F-00.analog-stereo"
                    .to_string(),
            monitor_input: String::new(),
        }
    }
}

/// Per-track gain and latency compensation applied when mixing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MixSettings {
    /// Linear gain on the guitar track.
    #[serde(default)]
    pub guitar_volume: f64,

    /// Linear gain on the backing track.
    #[serde(default)]
    pub backing_volume: f64,

    /// Delay applied to the backing track, in milliseconds.
    /// See [`DELAY_FORCE_ZERO`].
    #[serde(default)]
    pub delay_ms: i64,
}

impl MixSettings {
    fn defaults() -> Self {
        Self {
            guitar_volume: 4.0,
            backing_volume: 0.8,
            delay_ms: 0,
        }
    }
}

/// Where takes and mixes are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OutputSettings {
    /// Output directory. A leading `~/` is expanded on resolve.
    #[serde(default)]
    pub directory: String,

    /// Codec of the mixed file, also used as its extension.
    #[serde(default)]
    pub format: String,
}

impl OutputSettings {
    fn defaults() -> Self {
        Self {
            directory: "~/Audio/JamCapture".to_string(),
            format: "flac".to_string(),
        }
    }
}

/// A named, complete set of audio/record/mix/output parameters.
///
/// `Profile::default()` is the all-zero (fully unset) profile; use
/// [`Profile::builtin`] for the values written to a fresh document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Profile {
    #[serde(default)]
    pub audio: AudioSettings,
    #[serde(default)]
    pub record: RecordSettings,
    #[serde(default)]
    pub mix: MixSettings,
    #[serde(default)]
    pub output: OutputSettings,
}

impl Profile {
    /// Built-in values for the `default` profile of a new document.
    pub fn builtin() -> Self {
        Self {
            audio: AudioSettings::defaults(),
            record: RecordSettings::defaults(),
            mix: MixSettings::defaults(),
            output: OutputSettings::defaults(),
        }
    }

    /// Overlay `overlay` onto `self`, returning the merged profile.
    ///
    /// Zero-valued fields of `overlay` inherit from `self`. A `delay_ms` of
    /// [`DELAY_FORCE_ZERO`] always yields 0.
    pub fn merged_with(&self, overlay: &Profile) -> Profile {
        Profile {
            audio: AudioSettings {
                sample_rate: pick(overlay.audio.sample_rate, self.audio.sample_rate),
                channels: pick(overlay.audio.channels, self.audio.channels),
            },
            record: RecordSettings {
                guitar_input: pick_str(&overlay.record.guitar_input, &self.record.guitar_input),
                monitor_input: pick_str(&overlay.record.monitor_input, &self.record.monitor_input),
            },
            mix: MixSettings {
                guitar_volume: pick(overlay.mix.guitar_volume, self.mix.guitar_volume),
                backing_volume: pick(overlay.mix.backing_volume, self.mix.backing_volume),
                delay_ms: match overlay.mix.delay_ms {
                    DELAY_FORCE_ZERO => 0,
                    0 => self.mix.delay_ms,
                    v => v,
                },
            },
            output: OutputSettings {
                directory: pick_str(&overlay.output.directory, &self.output.directory),
                format: pick_str(&overlay.output.format, &self.output.format),
            },
        }
    }
}

fn pick<T: Copy + Default + PartialEq>(overlay: T, base: T) -> T {
    if overlay == T::default() {
        base
    } else {
        overlay
    }
}

fn pick_str(overlay: &str, base: &str) -> String {
    if overlay.is_empty() {
        base.to_string()
    } else {
        overlay.to_string()
    }
}
