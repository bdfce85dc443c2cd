//! External program invocation.

use std::process::Stdio;
use tokio::process::Command;

use crate::JamError;

/// An external program plus any leading arguments it is always run with.
///
/// The prefix lets a wrapper script stand in for the real binary, e.g.
/// `Tool::with_prefix("sh", ["fake-ffmpeg.sh"])`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tool {
    program: String,
    prefix: Vec<String>,
}

impl Tool {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            prefix: Vec::new(),
        }
    }

    pub fn with_prefix<I, S>(program: impl Into<String>, prefix: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            prefix: prefix.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.program
    }

    /// Whether the program can be found on `PATH` (or at its given path).
    pub fn is_available(&self) -> bool {
        which::which(&self.program).is_ok()
    }

    /// A command for this tool with the prefix already applied.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.prefix);
        cmd
    }

    /// Run to completion, capturing stdout and stderr.
    ///
    /// A non-zero exit becomes [`JamError::ToolFailed`] carrying stderr.
    pub async fn output<I, S>(&self, args: I) -> Result<String, JamError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let output = self
            .command()
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(JamError::ToolFailed {
                tool: self.program.clone(),
                status: output.status,
                output: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    pub(crate) fn spawn_error(&self, source: std::io::Error) -> JamError {
        JamError::Spawn {
            tool: self.program.clone(),
            source,
        }
    }
}
