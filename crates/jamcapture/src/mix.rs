//! Mixing a take down to a single file, with per-invocation overrides.

use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use tracing::info;

use jamconf::{MixSettings, Profile};

use crate::paths::SongPaths;
use crate::tool::Tool;
use crate::JamError;

/// Command-line overrides for the mix settings of one invocation.
///
/// `None` leaves the profile's value in place.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MixOverrides {
    pub guitar_volume: Option<f64>,
    pub backing_volume: Option<f64>,
    pub delay_ms: Option<i64>,
}

impl MixOverrides {
    /// Build overrides from raw flag values, where a non-positive volume or
    /// a negative delay means "not given".
    pub fn new(
        guitar_volume: Option<f64>,
        backing_volume: Option<f64>,
        delay_ms: Option<i64>,
    ) -> Self {
        Self {
            guitar_volume: guitar_volume.filter(|v| *v > 0.0),
            backing_volume: backing_volume.filter(|v| *v > 0.0),
            delay_ms: delay_ms.filter(|d| *d >= 0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.guitar_volume.is_none() && self.backing_volume.is_none() && self.delay_ms.is_none()
    }

    /// The settings that result from applying these overrides to `mix`.
    pub fn apply(&self, mix: &MixSettings) -> MixSettings {
        MixSettings {
            guitar_volume: self.guitar_volume.unwrap_or(mix.guitar_volume),
            backing_volume: self.backing_volume.unwrap_or(mix.backing_volume),
            delay_ms: self.delay_ms.unwrap_or(mix.delay_ms),
        }
    }
}

/// Run `op` against a copy of `profile` with `overrides` applied.
///
/// The caller's profile is never touched, whatever `op` returns.
pub async fn with_overrides<F, Fut, T>(profile: &Profile, overrides: &MixOverrides, op: F) -> T
where
    F: FnOnce(Profile) -> Fut,
    Fut: Future<Output = T>,
{
    let mut effective = profile.clone();
    effective.mix = overrides.apply(&profile.mix);
    op(effective).await
}

/// Inputs of one mixdown.
#[derive(Debug, Clone, PartialEq)]
pub struct MixJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub guitar_volume: f64,
    pub backing_volume: f64,
    pub delay_ms: i64,
    pub channels: u16,
    pub sample_rate: u32,
    pub format: String,
}

impl MixJob {
    pub fn new(profile: &Profile, paths: &SongPaths) -> Self {
        Self {
            input: paths.take.clone(),
            output: paths.mix.clone(),
            guitar_volume: profile.mix.guitar_volume,
            backing_volume: profile.mix.backing_volume,
            delay_ms: profile.mix.delay_ms,
            channels: profile.audio.channels,
            sample_rate: profile.audio.sample_rate,
            format: profile.output.format.clone(),
        }
    }

    /// Filter graph applying both gains and, when set, delaying the
    /// backing track to line up with the guitar.
    pub fn filter(&self) -> String {
        let backing = if self.delay_ms > 0 {
            format!(
                "[0:1]volume={:.1},adelay={}|{}[other]",
                self.backing_volume, self.delay_ms, self.delay_ms
            )
        } else {
            format!("[0:1]volume={:.1}[other]", self.backing_volume)
        };
        format!(
            "[0:0]volume={:.1}[guitar];{};[guitar][other]amix=inputs=2:normalize=0",
            self.guitar_volume, backing
        )
    }

    pub fn ffmpeg_args(&self) -> Vec<String> {
        vec![
            "-nostdin".into(),
            "-i".into(),
            self.input.to_string_lossy().into_owned(),
            "-filter_complex".into(),
            self.filter(),
            "-ac".into(),
            self.channels.to_string(),
            "-ar".into(),
            self.sample_rate.to_string(),
            "-c:a".into(),
            self.format.clone(),
            "-y".into(),
            self.output.to_string_lossy().into_owned(),
        ]
    }
}

/// Renders a song's take into a single mixed file with FFmpeg.
#[derive(Debug, Clone)]
pub struct Mixer {
    ffmpeg: Tool,
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new()
    }
}

impl Mixer {
    pub fn new() -> Self {
        Self {
            ffmpeg: Tool::new("ffmpeg"),
        }
    }

    pub fn with_tool(ffmpeg: Tool) -> Self {
        Self { ffmpeg }
    }

    /// Mix `song` using `profile` as-is. Any existing mix is replaced.
    pub async fn mix(&self, profile: &Profile, song: &str) -> Result<PathBuf, JamError> {
        let paths = SongPaths::new(profile, song)?;
        if !paths.take.exists() {
            return Err(JamError::InputNotFound(paths.take));
        }

        match tokio::fs::remove_file(&paths.mix).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                return Err(JamError::io(
                    format!("failed to remove previous mix {}", paths.mix.display()),
                    e,
                ));
            }
            _ => {}
        }

        let job = MixJob::new(profile, &paths);
        println!("Input file: {}", job.input.display());
        println!("Output file: {}", job.output.display());
        info!("Mix filter: {}", job.filter());
        println!("Creating mixed audio file...");

        let output = self
            .ffmpeg
            .command()
            .args(job.ffmpeg_args())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.ffmpeg.spawn_error(e))?;

        if !output.status.success() {
            return Err(JamError::ToolFailed {
                tool: self.ffmpeg.name().to_string(),
                status: output.status,
                output: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if !job.output.exists() {
            return Err(JamError::OutputNotProduced(job.output));
        }

        println!("Mixed audio file saved to: {}", job.output.display());
        Ok(job.output)
    }

    /// Mix `song` with `overrides` applied for this call only.
    pub async fn mix_with_overrides(
        &self,
        profile: &Profile,
        overrides: &MixOverrides,
        song: &str,
    ) -> Result<PathBuf, JamError> {
        with_overrides(profile, overrides, |effective| async move {
            println!("Mixing song: {}", song);
            println!("Guitar volume: {:.1}", effective.mix.guitar_volume);
            println!("Backing volume: {:.1}", effective.mix.backing_volume);
            println!("Backing track delay: {}ms", effective.mix.delay_ms);
            self.mix(&effective, song).await
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fake_ffmpeg(dir: &TempDir, body: &str) -> Tool {
        let script = dir.path().join("fake-ffmpeg.sh");
        std::fs::write(&script, format!("for out; do :; done\n{}\n", body)).unwrap();
        Tool::with_prefix("sh", [script.to_string_lossy().into_owned()])
    }

    fn profile_with_take(dir: &TempDir, song: &str) -> Profile {
        let mut profile = Profile::builtin();
        profile.output.directory = dir.path().to_string_lossy().into_owned();
        std::fs::write(SongPaths::new(&profile, song).unwrap().take, "take").unwrap();
        profile
    }

    #[test]
    fn test_overrides_ignore_sentinels() {
        let overrides = MixOverrides::new(Some(0.0), Some(-1.0), Some(-1));
        assert!(overrides.is_empty());

        let overrides = MixOverrides::new(Some(2.0), None, Some(0));
        assert_eq!(overrides.guitar_volume, Some(2.0));
        assert_eq!(overrides.delay_ms, Some(0));
    }

    #[test]
    fn test_apply_overrides() {
        let mix = MixSettings {
            guitar_volume: 4.0,
            backing_volume: 0.8,
            delay_ms: 150,
        };
        let applied = MixOverrides::new(Some(3.0), None, Some(0)).apply(&mix);
        assert_eq!(applied.guitar_volume, 3.0);
        assert_eq!(applied.backing_volume, 0.8);
        assert_eq!(applied.delay_ms, 0);
    }

    #[tokio::test]
    async fn test_with_overrides_leaves_profile_untouched() {
        let profile = Profile::builtin();
        let before = profile.clone();
        let overrides = MixOverrides::new(Some(1.5), Some(2.5), Some(90));

        let seen = with_overrides(&profile, &overrides, |effective| async move {
            Ok::<_, JamError>(effective.mix)
        })
        .await
        .unwrap();
        assert_eq!(seen.guitar_volume, 1.5);
        assert_eq!(seen.delay_ms, 90);
        assert_eq!(profile, before);

        let err = with_overrides(&profile, &overrides, |_| async {
            Err::<(), _>(JamError::InputNotFound("missing.mkv".into()))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, JamError::InputNotFound(_)));
        assert_eq!(profile.mix, before.mix);
    }

    #[test]
    fn test_filter_without_delay() {
        let mut profile = Profile::builtin();
        profile.output.directory = "/jams".to_string();
        let job = MixJob::new(&profile, &SongPaths::new(&profile, "song").unwrap());
        assert_eq!(
            job.filter(),
            "[0:0]volume=4.0[guitar];[0:1]volume=0.8[other];[guitar][other]amix=inputs=2:normalize=0"
        );
    }

    #[test]
    fn test_filter_with_delay() {
        let mut profile = Profile::builtin();
        profile.mix.delay_ms = 180;
        let job = MixJob::new(&profile, &SongPaths::new(&profile, "song").unwrap());
        assert!(job.filter().contains("[0:1]volume=0.8,adelay=180|180[other]"));
    }

    #[tokio::test]
    async fn test_mix_requires_take() {
        let dir = TempDir::new().unwrap();
        let mut profile = Profile::builtin();
        profile.output.directory = dir.path().to_string_lossy().into_owned();

        let mixer = Mixer::with_tool(fake_ffmpeg(&dir, "touch \"$out\""));
        let err = mixer.mix(&profile, "song").await.unwrap_err();
        assert!(matches!(err, JamError::InputNotFound(ref p) if p.ends_with("song.mkv")));
    }

    #[tokio::test]
    async fn test_mix_writes_output() {
        let dir = TempDir::new().unwrap();
        let profile = profile_with_take(&dir, "song");

        let mixer = Mixer::with_tool(fake_ffmpeg(&dir, "echo \"$@\" > \"$out\""));
        let output = mixer.mix(&profile, "song").await.unwrap();

        assert_eq!(output, dir.path().join("song.flac"));
        let args = std::fs::read_to_string(&output).unwrap();
        assert!(args.contains("-c:a flac"));
        assert!(args.contains("-ac 2"));
    }

    #[tokio::test]
    async fn test_mix_failure_carries_ffmpeg_output() {
        let dir = TempDir::new().unwrap();
        let profile = profile_with_take(&dir, "song");

        let mixer = Mixer::with_tool(fake_ffmpeg(&dir, "echo 'Invalid data' >&2; exit 1"));
        let err = mixer.mix(&profile, "song").await.unwrap_err();
        match err {
            JamError::ToolFailed { output, .. } => assert_eq!(output, "Invalid data"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_mix_replaces_previous_mix() {
        let dir = TempDir::new().unwrap();
        let profile = profile_with_take(&dir, "song");
        std::fs::write(dir.path().join("song.flac"), "old mix").unwrap();

        // Exits cleanly without writing anything
        let mixer = Mixer::with_tool(fake_ffmpeg(&dir, "exit 0"));
        let err = mixer.mix(&profile, "song").await.unwrap_err();
        assert!(matches!(err, JamError::OutputNotProduced(_)));
    }

    #[tokio::test]
    async fn test_mix_with_overrides_passes_effective_values() {
        let dir = TempDir::new().unwrap();
        let profile = profile_with_take(&dir, "song");
        let before = profile.clone();

        let mixer = Mixer::with_tool(fake_ffmpeg(&dir, "echo \"$@\" > \"$out\""));
        let overrides = MixOverrides::new(Some(2.0), None, Some(250));
        let output = mixer
            .mix_with_overrides(&profile, &overrides, "song")
            .await
            .unwrap();

        let args = std::fs::read_to_string(output).unwrap();
        assert!(args.contains("volume=2.0[guitar]"));
        assert!(args.contains("adelay=250|250"));
        assert_eq!(profile, before);
    }
}
