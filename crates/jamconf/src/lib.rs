//! Profile-based configuration for JamCapture.
//!
//! A config document holds any number of named profiles plus the name of
//! the one to use by default. The `default` profile is the base every other
//! profile is layered over, so a profile such as `practice` only has to list
//! the fields it changes.
//!
//! # Usage
//!
//! ```rust,no_run
//! use jamconf::ProfileSet;
//! use std::path::Path;
//!
//! let (doc, _created) = ProfileSet::load_or_init(Path::new("jamcapture.toml"))
//!     .expect("Failed to load config");
//! let profile = doc.resolve("").expect("Failed to resolve profile");
//!
//! println!("Recording at {} Hz into {}", profile.audio.sample_rate, profile.output.directory);
//! ```
//!
//! # Example Config
//!
//! ```toml
//! active_profile = "practice"
//!
//! [profiles.default.audio]
//! sample_rate = 48000
//! channels = 2
//!
//! [profiles.default.record]
//! guitar_input = "alsa_input.usb-Focusrite_Scarlett_2i2-00.analog-stereo"
//! monitor_input = ""
//!
//! [profiles.default.mix]
//! guitar_volume = 4.0
//! backing_volume = 0.8
//! delay_ms = 0
//!
//! [profiles.default.output]
//! directory = "~/Audio/JamCapture"
//! format = "flac"
//!
//! # Bluetooth headphones: delay the backing track
//! [profiles.practice.mix]
//! delay_ms = 180
//! ```
//!
//! A zero or empty field means "inherit from `default`". To force the
//! delay to zero in a derived profile write `delay_ms = -999`.

pub mod loader;
pub mod profile;

pub use loader::expand_path;
pub use profile::{
    AudioSettings, MixSettings, OutputSettings, Profile, RecordSettings, DELAY_FORCE_ZERO,
};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the profile every other profile is merged over.
pub const DEFAULT_PROFILE: &str = "default";

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write config file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("profile '{name}' not found (available: {})", .available.join(", "))]
    ProfileNotFound {
        name: String,
        available: Vec<String>,
    },

    #[error("profile '{profile}' is invalid: {message}")]
    Invalid { profile: String, message: String },
}

/// The whole config document: every profile plus the active selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProfileSet {
    /// Profile used when none is requested explicitly.
    #[serde(default)]
    pub active_profile: String,

    /// Profiles by name.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl ProfileSet {
    /// Document written on first use: a single `default` profile.
    pub fn builtin() -> Self {
        let mut profiles = BTreeMap::new();
        profiles.insert(DEFAULT_PROFILE.to_string(), Profile::builtin());
        Self {
            active_profile: DEFAULT_PROFILE.to_string(),
            profiles,
        }
    }

    /// Load a document from `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        loader::load_from_file(path)
    }

    /// Load a document, writing [`ProfileSet::builtin`] to `path` first if
    /// nothing exists there yet. The flag reports whether it was created.
    pub fn load_or_init(path: &Path) -> Result<(Self, bool), ConfigError> {
        if path.exists() {
            return Ok((Self::load(path)?, false));
        }

        let doc = Self::builtin();
        loader::write_to_file(path, &doc)?;
        tracing::info!("Created default config at {}", path.display());
        Ok((doc, true))
    }

    /// Name that [`ProfileSet::resolve`] selects for `requested`.
    ///
    /// An empty request falls back to `active_profile`, then to `default`.
    pub fn selected_name<'a>(&'a self, requested: &'a str) -> &'a str {
        if !requested.is_empty() {
            requested
        } else if !self.active_profile.is_empty() {
            &self.active_profile
        } else {
            DEFAULT_PROFILE
        }
    }

    /// Resolve a profile by name, layered over `default`.
    ///
    /// The result has its output directory expanded and is checked for
    /// values no backend can use.
    pub fn resolve(&self, requested: &str) -> Result<Profile, ConfigError> {
        let name = self.selected_name(requested);

        let selected = self
            .profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.to_string(),
                available: self.profiles.keys().cloned().collect(),
            })?;

        let mut profile = match self.profiles.get(DEFAULT_PROFILE) {
            Some(base) if name != DEFAULT_PROFILE => base.merged_with(selected),
            _ => selected.clone(),
        };

        if profile.mix.delay_ms == DELAY_FORCE_ZERO {
            profile.mix.delay_ms = 0;
        }
        profile.output.directory = expand_path(&profile.output.directory)
            .to_string_lossy()
            .into_owned();

        loader::validate(name, &profile)?;
        tracing::debug!(profile = name, "Resolved config profile");
        Ok(profile)
    }

    /// Serialize the document to TOML.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# JamCapture Configuration\n\n");
        output.push_str(&format!("active_profile = {}\n", toml_string(&self.active_profile)));

        for (name, profile) in &self.profiles {
            output.push('\n');
            output.push_str(&profile_to_toml(name, profile));
        }

        output
    }
}

/// Render one profile as the `[profiles.<name>.*]` tables of a document.
pub fn profile_to_toml(name: &str, profile: &Profile) -> String {
    let mut output = String::new();
    let key = toml_key(name);

    output.push_str(&format!("[profiles.{}.audio]\n", key));
    output.push_str(&format!("sample_rate = {}\n", profile.audio.sample_rate));
    output.push_str(&format!("channels = {}\n", profile.audio.channels));

    output.push_str(&format!("\n[profiles.{}.record]\n", key));
    output.push_str(&format!("guitar_input = {}\n", toml_string(&profile.record.guitar_input)));
    output.push_str(&format!("monitor_input = {}\n", toml_string(&profile.record.monitor_input)));

    output.push_str(&format!("\n[profiles.{}.mix]\n", key));
    output.push_str(&format!("guitar_volume = {:?}\n", profile.mix.guitar_volume));
    output.push_str(&format!("backing_volume = {:?}\n", profile.mix.backing_volume));
    output.push_str(&format!("delay_ms = {}\n", profile.mix.delay_ms));

    output.push_str(&format!("\n[profiles.{}.output]\n", key));
    output.push_str(&format!("directory = {}\n", toml_string(&profile.output.directory)));
    output.push_str(&format!("format = {}\n", toml_string(&profile.output.format)));

    output
}

/// A quoted, escaped TOML string.
fn toml_string(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}

/// A table key, quoted unless it is a valid bare key.
fn toml_key(name: &str) -> String {
    let bare = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if bare {
        name.to_string()
    } else {
        toml_string(name)
    }
}
