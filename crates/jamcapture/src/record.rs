//! Recording supervisor.
//!
//! Owns exactly one FFmpeg capture process per take. Recording has no
//! natural end, so the supervisor races the child's own exit against the
//! operator's interrupt, and in both cases only returns once the child is
//! gone and the take has been checked on disk.

use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Child;
use tracing::{debug, info, warn};

use jamconf::Profile;

use crate::interrupt::StopTokens;
use crate::paths::SongPaths;
use crate::sources::AudioSources;
use crate::tool::Tool;
use crate::JamError;

/// Splits the guitar interface down to a centred stereo track and copies the
/// monitor as the backing track.
const CAPTURE_FILTER: &str =
    "[0]pan=stereo|c0=0.5*c0+0.5*c1|c1=0.5*c0+0.5*c1[guitar];[1]acopy[backing]";

/// How long an interrupted capture may take to finalize before it is killed.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(10);

/// Everything the capture process needs.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingJob {
    pub guitar_input: String,
    pub monitor_input: String,
    pub output: PathBuf,
    pub sample_rate: u32,
}

impl RecordingJob {
    /// FFmpeg arguments producing a two-track FLAC-in-Matroska take.
    pub fn ffmpeg_args(&self) -> Vec<String> {
        vec![
            "-nostdin".into(),
            "-f".into(),
            "pulse".into(),
            "-i".into(),
            self.guitar_input.clone(),
            "-f".into(),
            "pulse".into(),
            "-i".into(),
            self.monitor_input.clone(),
            "-filter_complex".into(),
            CAPTURE_FILTER.into(),
            "-map".into(),
            "[guitar]".into(),
            "-map".into(),
            "[backing]".into(),
            "-c:a".into(),
            "flac".into(),
            "-ar".into(),
            self.sample_rate.to_string(),
            self.output.to_string_lossy().into_owned(),
        ]
    }
}

/// How a recording session ended.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingOutcome {
    /// The verified take.
    pub path: PathBuf,
    /// Monitor source actually used, after auto-detection.
    pub monitor_input: String,
    /// Whether the operator stopped the recording.
    pub interrupted: bool,
}

pub struct Recorder {
    sources: Arc<dyn AudioSources>,
    ffmpeg: Tool,
    stop_grace: Duration,
}

impl Recorder {
    pub fn new(sources: Arc<dyn AudioSources>) -> Self {
        Self {
            sources,
            ffmpeg: Tool::new("ffmpeg"),
            stop_grace: DEFAULT_STOP_GRACE,
        }
    }

    /// Replace the capture program.
    pub fn with_tool(mut self, ffmpeg: Tool) -> Self {
        self.ffmpeg = ffmpeg;
        self
    }

    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    /// Record a take of `song` until the child exits or `stop` fires.
    ///
    /// On `stop.interrupt` the child gets SIGINT so FFmpeg can finalize the
    /// container. It is killed if it is still running once `stop.kill`
    /// fires or the stop grace period runs out. Either way the call blocks
    /// until the child has exited. A child that exits by itself with a
    /// failure status is reported as [`JamError::RecordingProcessFailed`].
    /// The take must exist afterwards.
    pub async fn record(
        &self,
        profile: &Profile,
        song: &str,
        stop: &StopTokens,
    ) -> Result<RecordingOutcome, JamError> {
        let paths = SongPaths::new(profile, song)?;
        let guitar_input = profile.record.guitar_input.clone();
        let monitor_input = if profile.record.monitor_input.is_empty() {
            let monitor = self.sources.default_monitor().await?;
            info!("Auto-detected monitor input: {}", monitor);
            monitor
        } else {
            profile.record.monitor_input.clone()
        };

        self.sources.validate("guitar", &guitar_input).await?;
        self.sources.validate("monitor", &monitor_input).await?;

        tokio::fs::create_dir_all(&paths.dir).await.map_err(|e| {
            JamError::io(
                format!("failed to create output directory {}", paths.dir.display()),
                e,
            )
        })?;
        remove_previous_take(&paths.take).await?;

        let job = RecordingJob {
            guitar_input,
            monitor_input,
            output: paths.take,
            sample_rate: profile.audio.sample_rate,
        };

        println!("Guitar input: {}", job.guitar_input);
        println!("Monitor input: {}", job.monitor_input);
        println!("Output file: {}", job.output.display());

        let mut child = self
            .ffmpeg
            .command()
            .args(job.ffmpeg_args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            // Own group: a terminal Ctrl+C reaches the child only through us
            .process_group(0)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.ffmpeg.spawn_error(e))?;
        debug!(pid = ?child.id(), "Spawned recording process");

        println!("{} Press Ctrl+C to stop", "● RECORDING...".red().bold());

        let interrupted = tokio::select! {
            biased;
            _ = stop.interrupt.cancelled() => {
                println!("\nStopping recording...");
                interrupt(&mut child);
                let status = self.wait_after_interrupt(&mut child, stop).await?;
                debug!(%status, "Recording process exited after interrupt");
                true
            }
            status = child.wait() => {
                let status = status.map_err(wait_error)?;
                if !status.success() {
                    return Err(JamError::RecordingProcessFailed(status));
                }
                info!("Recording process exited on its own");
                false
            }
        };

        if !job.output.exists() {
            return Err(JamError::OutputNotProduced(job.output));
        }

        println!("Recording saved to: {}", job.output.display());
        Ok(RecordingOutcome {
            path: job.output,
            monitor_input: job.monitor_input,
            interrupted,
        })
    }

    /// Wait for an interrupted child, killing it once the operator insists
    /// or the grace period is over.
    async fn wait_after_interrupt(
        &self,
        child: &mut Child,
        stop: &StopTokens,
    ) -> Result<ExitStatus, JamError> {
        let reason = tokio::select! {
            status = child.wait() => return status.map_err(wait_error),
            _ = stop.kill.cancelled() => "stop requested again",
            _ = tokio::time::sleep(self.stop_grace) => "grace period elapsed",
        };

        warn!("Recording process did not stop ({}), killing it", reason);
        println!("Killing recording process...");
        if let Err(e) = child.start_kill() {
            warn!("Failed to kill recording process: {}", e);
        }
        child.wait().await.map_err(wait_error)
    }
}

fn wait_error(source: std::io::Error) -> JamError {
    JamError::io("failed to wait for recording process", source)
}

/// Ask the child to stop with SIGINT, falling back to a hard kill.
fn interrupt(child: &mut Child) {
    if let Some(pid) = child.id() {
        // SAFETY: kill(2) has no memory-safety preconditions; `pid` is our
        // own child and has not been reaped yet since `id()` returned it.
        let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGINT) };
        if rc == 0 {
            return;
        }
        warn!(
            "Failed to interrupt recording process {}: {}",
            pid,
            std::io::Error::last_os_error()
        );
    }

    if let Err(e) = child.start_kill() {
        warn!("Failed to kill recording process: {}", e);
    }
}

/// Delete an earlier take of the same song; takes are not versioned.
async fn remove_previous_take(path: &Path) -> Result<(), JamError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            info!("Removed previous take {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(JamError::io(
            format!("failed to remove previous take {}", path.display()),
            e,
        )),
    }
}
