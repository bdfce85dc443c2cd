//! jamcapture - record, mix and play back jam sessions
//!
//! Subcommands:
//! - `jamcapture record <song>` - Record guitar and system audio
//! - `jamcapture mix <song>` - Mix the take with gain/delay adjustments
//! - `jamcapture play <song>` - Play the mixed file
//! - `jamcapture run <song> -p rmp` - Run pipeline steps on a song
//! - `jamcapture <song> -p rmp` - Same as `run`

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use jamcapture::commands::{self, Invocation};
use jamcapture::{Interrupts, MixOverrides};

#[derive(Parser)]
#[command(name = "jamcapture")]
#[command(about = "Audio recording and mixing tool for jam sessions")]
#[command(long_about = "Records a guitar input and the system audio side by side, then mixes \
them with adjustable volumes and a delay that compensates for Bluetooth latency.\n\n\
When a song name is given without a subcommand, it acts as 'jamcapture run <song>'.")]
#[command(version, args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Song to run the pipeline on
    song: Option<String>,

    #[command(flatten)]
    mix: MixArgs,

    /// Output directory (overrides config)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Config file (created with defaults if it does not exist)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pipeline steps: r=record, m=mix, p=play (e.g. 'rmp', 'mp', 'rm')
    #[arg(short, long, global = true, default_value = "")]
    pipeline: String,

    /// Configuration profile to use (overrides active_profile from the file)
    #[arg(long, global = true, env = "JAMCAPTURE_PROFILE", default_value = "")]
    profile: String,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Args, Debug, Default)]
struct MixArgs {
    /// Guitar volume (overrides config)
    #[arg(short, long, allow_negative_numbers = true)]
    guitar_volume: Option<f64>,

    /// Backing volume (overrides config)
    #[arg(short, long, allow_negative_numbers = true)]
    backing_volume: Option<f64>,

    /// Backing track delay in ms (overrides config)
    #[arg(short, long, allow_negative_numbers = true)]
    delay: Option<i64>,
}

impl MixArgs {
    fn overrides(&self) -> MixOverrides {
        MixOverrides::new(self.guitar_volume, self.backing_volume, self.delay)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Record guitar input and system audio into a two-track file
    Record {
        song: String,

        /// Output directory (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Mix the recorded tracks with volume and delay adjustments
    Mix {
        song: String,

        #[command(flatten)]
        mix: MixArgs,
    },

    /// Play the mixed audio file
    Play { song: String },

    /// Execute the pipeline steps given with -p on a song
    Run {
        song: String,

        #[command(flatten)]
        mix: MixArgs,

        /// Output directory (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List available audio sources
    Sources,

    /// Show the resolved configuration profile
    Config,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let interrupts = Interrupts::new();
    spawn_interrupt_relay(interrupts.clone())?;

    let invocation = Invocation {
        config: cli.config,
        profile: cli.profile,
        pipeline: cli.pipeline,
    };

    match cli.command {
        Some(Commands::Sources) => commands::sources().await,
        Some(Commands::Config) => commands::show_config(&invocation.load()?),
        Some(Commands::Record { song, output }) => {
            let ctx = invocation.load()?.with_output(output.as_deref());
            commands::record(ctx, &song, interrupts).await
        }
        Some(Commands::Mix { song, mix }) => {
            let ctx = invocation.load()?;
            commands::mix(ctx, &song, mix.overrides(), interrupts).await
        }
        Some(Commands::Play { song }) => {
            let ctx = invocation.load()?;
            commands::play(ctx, &song, interrupts).await
        }
        Some(Commands::Run { song, mix, output }) => {
            let ctx = invocation.load()?.with_output(output.as_deref());
            commands::run(ctx, &song, mix.overrides(), interrupts).await
        }
        None => match cli.song {
            Some(song) => {
                let ctx = invocation.load()?.with_output(cli.output.as_deref());
                commands::run(ctx, &song, cli.mix.overrides(), interrupts).await
            }
            None => {
                Cli::command().print_help()?;
                Ok(())
            }
        },
    }
}

/// Forward SIGINT/SIGTERM to the recording in progress.
///
/// Handlers are installed before any child is spawned. During a recording
/// the first signal stops the capture and a second one kills it. Outside a
/// recording a signal ends the process the way it would without handlers.
fn spawn_interrupt_relay(interrupts: Interrupts) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = sigint.recv() => info!("Received SIGINT"),
                _ = sigterm.recv() => info!("Received SIGTERM"),
            }
            if !interrupts.trigger() {
                eprintln!("Interrupted");
                std::process::exit(130);
            }
        }
    });

    Ok(())
}
