//! File names for a song's take and mix.

use jamconf::Profile;
use std::path::PathBuf;

use crate::JamError;

/// Extension of the two-track recording.
pub const TAKE_EXTENSION: &str = "mkv";

/// Where a song's files live for a given profile.
#[derive(Debug, Clone, PartialEq)]
pub struct SongPaths {
    pub dir: PathBuf,
    /// Raw two-track recording.
    pub take: PathBuf,
    /// Mixed-down output in the profile's format.
    pub mix: PathBuf,
}

impl SongPaths {
    /// Fails when nothing of `song` survives [`clean_file_name`].
    pub fn new(profile: &Profile, song: &str) -> Result<Self, JamError> {
        let name = clean_file_name(song);
        if name.is_empty() {
            return Err(JamError::InvalidSongName(song.to_string()));
        }

        let dir = PathBuf::from(&profile.output.directory);
        Ok(Self {
            take: dir.join(format!("{}.{}", name, TAKE_EXTENSION)),
            mix: dir.join(format!("{}.{}", name, profile.output.format)),
            dir,
        })
    }
}

/// Keep ASCII letters, digits and spaces, trim, then turn spaces into `_`.
pub fn clean_file_name(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect();
    kept.trim().replace(' ', "_")
}
