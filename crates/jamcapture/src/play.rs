//! Playback of a mixed song through the first player found on the system.

use std::process::Stdio;
use tracing::{debug, info};

use jamconf::Profile;

use crate::paths::SongPaths;
use crate::tool::Tool;
use crate::JamError;

/// Players tried in order: VLC headless, ffplay, then the desktop default.
fn default_players() -> Vec<Tool> {
    vec![
        Tool::with_prefix("cvlc", ["--play-and-exit", "--quiet"]),
        Tool::with_prefix("ffplay", ["-nodisp", "-autoexit", "-loglevel", "error"]),
        Tool::new("xdg-open"),
    ]
}

#[derive(Debug, Clone)]
pub struct Player {
    candidates: Vec<Tool>,
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

impl Player {
    pub fn new() -> Self {
        Self {
            candidates: default_players(),
        }
    }

    pub fn with_candidates(candidates: Vec<Tool>) -> Self {
        Self { candidates }
    }

    /// Play the mixed file of `song` and wait for the player to finish.
    pub async fn play(&self, profile: &Profile, song: &str) -> Result<(), JamError> {
        let paths = SongPaths::new(profile, song)?;
        if !paths.mix.exists() {
            return Err(JamError::InputNotFound(paths.mix));
        }

        let player = self
            .candidates
            .iter()
            .find(|tool| tool.is_available())
            .ok_or_else(|| {
                JamError::NoPlayer(self.candidates.iter().map(|t| t.name().to_string()).collect())
            })?;
        info!("Playing {} with {}", paths.mix.display(), player.name());

        let status = player
            .command()
            .arg(&paths.mix)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|e| player.spawn_error(e))?;
        debug!(%status, "Player exited");

        if !status.success() {
            return Err(JamError::ToolFailed {
                tool: player.name().to_string(),
                status,
                output: String::new(),
            });
        }
        Ok(())
    }
}
