//! Config file loading, writing, and path expansion.

use crate::{ConfigError, Profile, ProfileSet};
use std::path::{Path, PathBuf};

/// Load config from a TOML file.
pub fn load_from_file(path: &Path) -> Result<ProfileSet, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_toml(&contents, path)
}

/// Parse config from TOML string.
fn parse_toml(contents: &str, path: &Path) -> Result<ProfileSet, ConfigError> {
    toml::from_str(contents).map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Write a document to `path`, creating parent directories as needed.
pub fn write_to_file(path: &Path, doc: &ProfileSet) -> Result<(), ConfigError> {
    let write_err = |e| ConfigError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    std::fs::write(path, doc.to_toml()).map_err(write_err)
}

/// Reject a resolved profile no backend could work with.
pub(crate) fn validate(name: &str, profile: &Profile) -> Result<(), ConfigError> {
    let invalid = |message: &str| ConfigError::Invalid {
        profile: name.to_string(),
        message: message.to_string(),
    };

    if profile.audio.sample_rate == 0 {
        return Err(invalid("audio.sample_rate must be positive"));
    }
    if profile.audio.channels == 0 {
        return Err(invalid("audio.channels must be positive"));
    }
    if profile.mix.delay_ms < 0 {
        return Err(invalid("mix.delay_ms must not be negative"));
    }
    if profile.output.directory.is_empty() {
        return Err(invalid("output.directory is empty"));
    }
    if profile.output.format.is_empty() {
        return Err(invalid("output.format is empty"));
    }
    Ok(())
}

/// Expand a leading `~/` to the current user's home directory.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
