//! CLI command implementations

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use jamconf::{Profile, ProfileSet};

use crate::interrupt::Interrupts;
use crate::mix::MixOverrides;
use crate::pipeline::{self, Step, StepSequence};
use crate::session::Session;
use crate::sources::{AudioSources, PulseAudio};
use crate::JamError;

/// Options shared by every command that works on a song.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub config: Option<PathBuf>,
    /// Requested profile; empty selects the document's active profile.
    pub profile: String,
    /// Raw `-p` value.
    pub pipeline: String,
}

/// A loaded invocation: resolved profile and validated pipeline.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub config_path: PathBuf,
    pub profile_name: String,
    pub profile: Profile,
    pub pipeline: StepSequence,
}

impl Invocation {
    /// Load the config document, resolve the profile and validate the
    /// pipeline. Runs before any step so a bad pipeline does no work.
    pub fn load(&self) -> Result<Resolved> {
        let path = self.config.as_deref().ok_or(JamError::ConfigMissing)?;

        let (doc, created) = ProfileSet::load_or_init(path).context("failed to load config")?;
        if created {
            println!("Created default config at: {}", path.display());
        }

        let profile_name = doc.selected_name(&self.profile).to_string();
        let profile = doc.resolve(&self.profile).context("failed to load config")?;
        let pipeline: StepSequence = self.pipeline.parse()?;

        Ok(Resolved {
            config_path: path.to_path_buf(),
            profile_name,
            profile,
            pipeline,
        })
    }
}

impl Resolved {
    /// Replace the output directory for this invocation only.
    pub fn with_output(mut self, output: Option<&Path>) -> Self {
        if let Some(dir) = output {
            self.profile.output.directory = jamconf::expand_path(&dir.to_string_lossy())
                .to_string_lossy()
                .into_owned();
        }
        self
    }
}

/// Record a take, then continue with whatever follows `r` in the pipeline.
pub async fn record(ctx: Resolved, song: &str, interrupts: Interrupts) -> Result<()> {
    let mut session = Session::new(ctx.profile, interrupts);
    session.record(song).await.context("recording failed")?;
    pipeline::run(&ctx.pipeline, Some(Step::Record), song, &mut session).await?;
    Ok(())
}

/// Mix a take, then continue with whatever follows `m` in the pipeline.
pub async fn mix(
    ctx: Resolved,
    song: &str,
    overrides: MixOverrides,
    interrupts: Interrupts,
) -> Result<()> {
    let mut session = Session::new(ctx.profile, interrupts).with_overrides(overrides);
    session.mix(song).await.context("mixing failed")?;
    pipeline::run(&ctx.pipeline, Some(Step::Mix), song, &mut session).await?;
    Ok(())
}

/// Play the mixed file.
pub async fn play(ctx: Resolved, song: &str, interrupts: Interrupts) -> Result<()> {
    let session = Session::new(ctx.profile, interrupts);
    session.play(song).await.context("playback failed")?;
    Ok(())
}

/// Run the whole `-p` pipeline from its first step.
pub async fn run(
    ctx: Resolved,
    song: &str,
    overrides: MixOverrides,
    interrupts: Interrupts,
) -> Result<()> {
    if ctx.pipeline.is_empty() {
        return Err(JamError::NoPipeline.into());
    }

    let mut session = Session::new(ctx.profile, interrupts).with_overrides(overrides);
    pipeline::run(&ctx.pipeline, None, song, &mut session).await?;
    Ok(())
}

/// List capture sources and the default monitor. Needs no config.
pub async fn sources() -> Result<()> {
    let pulse = PulseAudio::new();
    let sources = pulse
        .list_sources()
        .await
        .context("failed to list sources")?;

    if sources.is_empty() {
        bail!("no audio sources found");
    }

    println!("Available audio sources:");
    for (i, source) in sources.iter().enumerate() {
        println!("{}. {}", i + 1, source);
    }

    match pulse.default_monitor().await {
        Ok(monitor) => println!("\nDefault system monitor: {}", monitor),
        Err(e) => tracing::warn!("Could not determine default monitor: {}", e),
    }

    Ok(())
}

/// Print the resolved profile.
pub fn show_config(ctx: &Resolved) -> Result<()> {
    println!("# Config file: {}", ctx.config_path.display());
    println!("# Profile: {}\n", ctx.profile_name);
    print!("{}", jamconf::profile_to_toml(&ctx.profile_name, &ctx.profile));
    Ok(())
}
