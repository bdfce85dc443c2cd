//! One command invocation: a resolved profile plus the backends that act
//! on it.

use async_trait::async_trait;
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::sync::Arc;

use jamconf::Profile;

use crate::interrupt::Interrupts;
use crate::mix::{MixOverrides, Mixer};
use crate::pipeline::{Step, StepRunner};
use crate::play::Player;
use crate::record::{Recorder, RecordingOutcome};
use crate::sources::{AudioSources, PulseAudio};
use crate::JamError;

/// Owns the invocation's profile; nothing else sees or changes it.
pub struct Session {
    profile: Profile,
    overrides: MixOverrides,
    recorder: Recorder,
    mixer: Mixer,
    player: Player,
    interrupts: Interrupts,
}

impl Session {
    /// A session using PulseAudio, FFmpeg and the system player.
    pub fn new(profile: Profile, interrupts: Interrupts) -> Self {
        let sources: Arc<dyn AudioSources> = Arc::new(PulseAudio::new());
        Self {
            profile,
            overrides: MixOverrides::default(),
            recorder: Recorder::new(sources),
            mixer: Mixer::new(),
            player: Player::new(),
            interrupts,
        }
    }

    pub fn with_overrides(mut self, overrides: MixOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_recorder(mut self, recorder: Recorder) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn with_mixer(mut self, mixer: Mixer) -> Self {
        self.mixer = mixer;
        self
    }

    pub fn with_player(mut self, player: Player) -> Self {
        self.player = player;
        self
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Record a take, stoppable through the session's [`Interrupts`].
    ///
    /// An auto-detected monitor is kept for the rest of the invocation.
    pub async fn record(&mut self, song: &str) -> Result<RecordingOutcome, JamError> {
        println!("Recording song: {}", song);
        println!("Guitar input: {}", self.profile.record.guitar_input);
        println!("Sample rate: {} Hz", self.profile.audio.sample_rate);
        println!("Output directory: {}", self.profile.output.directory);

        let armed = self.interrupts.arm();
        let outcome = self.recorder.record(&self.profile, song, armed.stop()).await?;
        drop(armed);

        self.profile.record.monitor_input = outcome.monitor_input.clone();
        println!("{}", "Recording completed successfully".green());
        Ok(outcome)
    }

    /// Mix with this session's overrides applied for the call only.
    pub async fn mix(&self, song: &str) -> Result<PathBuf, JamError> {
        let output = self
            .mixer
            .mix_with_overrides(&self.profile, &self.overrides, song)
            .await?;
        println!("{}", "Mixing completed successfully".green());
        Ok(output)
    }

    pub async fn play(&self, song: &str) -> Result<(), JamError> {
        println!("Playing song: {}", song);
        self.player.play(&self.profile, song).await
    }
}

#[async_trait]
impl StepRunner for Session {
    async fn run_step(&mut self, step: Step, song: &str) -> Result<(), JamError> {
        match step {
            Step::Record => self.record(song).await.map(|_| ()),
            Step::Mix => self.mix(song).await.map(|_| ()),
            Step::Play => self.play(song).await,
        }
    }
}
