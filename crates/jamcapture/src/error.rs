//! Error taxonomy shared by every jamcapture operation.

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

use crate::pipeline::Step;

/// Errors surfaced by the pipeline, the recording supervisor and the
/// external tool wrappers.
#[derive(Debug, Error)]
pub enum JamError {
    #[error("config file required, use --config flag")]
    ConfigMissing,

    #[error(transparent)]
    Config(#[from] jamconf::ConfigError),

    #[error("invalid pipeline step: '{0}' (valid: r=record, m=mix, p=play)")]
    InvalidStep(char),

    #[error("step '{step}' not found in pipeline '{pipeline}'")]
    StepNotInPipeline { step: char, pipeline: String },

    #[error("no pipeline specified, use -p flag (e.g., -p rmp)")]
    NoPipeline,

    #[error("pipeline {step} failed at step {position}/{total}: {source}")]
    StepFailed {
        step: Step,
        position: usize,
        total: usize,
        #[source]
        source: Box<JamError>,
    },

    #[error("invalid song name '{0}': it needs at least one letter or digit")]
    InvalidSongName(String),

    #[error("invalid {role} input: source {id} not found")]
    InvalidSource { role: &'static str, id: String },

    #[error("recording process failed: {0}")]
    RecordingProcessFailed(ExitStatus),

    #[error("output file not created: {}", .0.display())]
    OutputNotProduced(PathBuf),

    #[error("input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("no audio player found (tried {})", .0.join(", "))]
    NoPlayer(Vec<String>),

    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        source: std::io::Error,
    },

    #[error("{tool} failed ({status})\nOutput: {output}")]
    ToolFailed {
        tool: String,
        status: ExitStatus,
        output: String,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl JamError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}
