//! Step sequences and the pipeline engine.
//!
//! A pipeline is a string over `r` (record), `m` (mix) and `p` (play), e.g.
//! `rmp`. Steps may repeat and run strictly one after another; the first
//! failure stops the run and nothing already produced is rolled back.

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::JamError;

/// One pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Record,
    Mix,
    Play,
}

impl Step {
    pub fn from_code(code: char) -> Option<Step> {
        match code.to_ascii_lowercase() {
            'r' => Some(Step::Record),
            'm' => Some(Step::Mix),
            'p' => Some(Step::Play),
            _ => None,
        }
    }

    pub fn code(self) -> char {
        match self {
            Step::Record => 'r',
            Step::Mix => 'm',
            Step::Play => 'p',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Step::Record => "record",
            Step::Mix => "mix",
            Step::Play => "play",
        }
    }

    fn completed(self) -> &'static str {
        match self {
            Step::Record => "recording",
            Step::Mix => "mixing",
            Step::Play => "playback",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ('{}')", self.name(), self.code())
    }
}

/// A validated, immutable step sequence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StepSequence {
    raw: String,
    steps: Vec<Step>,
}

impl StepSequence {
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Index of the step right after the first occurrence of `step`.
    pub fn position_after(&self, step: Step) -> Result<usize, JamError> {
        self.steps
            .iter()
            .position(|s| *s == step)
            .map(|i| i + 1)
            .ok_or_else(|| JamError::StepNotInPipeline {
                step: step.code(),
                pipeline: self.raw.clone(),
            })
    }
}

impl FromStr for StepSequence {
    type Err = JamError;

    /// Case-insensitive; rejects at the first character outside `{r, m, p}`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.to_lowercase();
        let steps = raw
            .chars()
            .map(|c| Step::from_code(c).ok_or(JamError::InvalidStep(c)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { raw, steps })
    }
}

impl fmt::Display for StepSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Check a raw pipeline string without running anything.
pub fn validate(sequence: &str) -> Result<(), JamError> {
    sequence.parse::<StepSequence>().map(|_| ())
}

/// Executes individual steps on behalf of the engine.
#[async_trait]
pub trait StepRunner: Send {
    async fn run_step(&mut self, step: Step, song: &str) -> Result<(), JamError>;
}

/// Run `sequence` for `song`.
///
/// With `start_after` set, execution resumes right after the first
/// occurrence of that step; it is an error if the step is not in the
/// sequence. An empty sequence means no pipeline was requested and is a
/// no-op either way.
pub async fn run<R>(
    sequence: &StepSequence,
    start_after: Option<Step>,
    song: &str,
    runner: &mut R,
) -> Result<(), JamError>
where
    R: StepRunner + ?Sized,
{
    if sequence.is_empty() {
        return Ok(());
    }

    let start = match start_after {
        Some(step) => sequence.position_after(step)?,
        None => 0,
    };
    let total = sequence.len();

    for (index, &step) in sequence.steps().iter().enumerate().skip(start) {
        let position = index + 1;
        println!("Pipeline: executing step {}/{}: '{}'...", position, total, step.code());
        info!(%step, position, total, song, "Running pipeline step");

        runner
            .run_step(step, song)
            .await
            .map_err(|e| JamError::StepFailed {
                step,
                position,
                total,
                source: Box::new(e),
            })?;

        println!("Pipeline: {} completed", step.completed());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every step it is asked to run; fails on `fail_on`.
    #[derive(Default)]
    struct Script {
        ran: Vec<Step>,
        fail_on: Option<Step>,
    }

    #[async_trait]
    impl StepRunner for Script {
        async fn run_step(&mut self, step: Step, _song: &str) -> Result<(), JamError> {
            self.ran.push(step);
            if self.fail_on == Some(step) {
                return Err(JamError::InputNotFound("take.mkv".into()));
            }
            Ok(())
        }
    }

    fn seq(s: &str) -> StepSequence {
        s.parse().unwrap()
    }

    #[test]
    fn test_validate_accepts_alphabet() {
        assert!(validate("").is_ok());
        assert!(validate("RMP").is_ok());
        assert!(validate("rrm").is_ok());
        assert!(validate("pmr").is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_step() {
        let err = validate("rmx").unwrap_err();
        assert!(matches!(err, JamError::InvalidStep('x')));
        assert!(err.to_string().contains("valid: r=record, m=mix, p=play"));
    }

    #[test]
    fn test_validate_reports_first_bad_step() {
        assert!(matches!(validate("rq z"), Err(JamError::InvalidStep('q'))));
    }

    #[test]
    fn test_parse_folds_case() {
        assert_eq!(seq("RmP").steps(), &[Step::Record, Step::Mix, Step::Play]);
        assert_eq!(seq("RmP").to_string(), "rmp");
    }

    #[test]
    fn test_position_after_uses_first_occurrence() {
        let s = seq("rmrp");
        assert_eq!(s.position_after(Step::Record).unwrap(), 1);
        assert_eq!(s.position_after(Step::Play).unwrap(), 4);
        assert_eq!(s.position_after(Step::Mix).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_full_run_starts_at_beginning() {
        let mut script = Script::default();
        run(&seq("rmp"), None, "song", &mut script).await.unwrap();
        assert_eq!(script.ran, vec![Step::Record, Step::Mix, Step::Play]);
    }

    #[tokio::test]
    async fn test_continuation_runs_remaining_steps() {
        let mut script = Script::default();
        run(&seq("rmp"), Some(Step::Record), "song", &mut script)
            .await
            .unwrap();
        assert_eq!(script.ran, vec![Step::Mix, Step::Play]);
    }

    #[tokio::test]
    async fn test_continuation_after_last_step_runs_nothing() {
        let mut script = Script::default();
        run(&seq("rmp"), Some(Step::Play), "song", &mut script)
            .await
            .unwrap();
        assert!(script.ran.is_empty());
    }

    #[tokio::test]
    async fn test_continuation_step_missing() {
        let mut script = Script::default();
        let err = run(&seq("rm"), Some(Step::Play), "song", &mut script)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            JamError::StepNotInPipeline { step: 'p', ref pipeline } if pipeline == "rm"
        ));
        assert!(script.ran.is_empty());
    }

    #[tokio::test]
    async fn test_empty_sequence_is_noop() {
        let mut script = Script::default();
        run(&seq(""), Some(Step::Mix), "song", &mut script)
            .await
            .unwrap();
        run(&seq(""), None, "song", &mut script).await.unwrap();
        assert!(script.ran.is_empty());
    }

    #[tokio::test]
    async fn test_failure_stops_pipeline() {
        let mut script = Script {
            fail_on: Some(Step::Mix),
            ..Default::default()
        };
        let err = run(&seq("rmp"), None, "song", &mut script)
            .await
            .unwrap_err();

        assert_eq!(script.ran, vec![Step::Record, Step::Mix]);
        match err {
            JamError::StepFailed {
                step,
                position,
                total,
                source,
            } => {
                assert_eq!(step, Step::Mix);
                assert_eq!(position, 2);
                assert_eq!(total, 3);
                assert!(matches!(*source, JamError::InputNotFound(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_failure_message_names_step() {
        let mut script = Script {
            fail_on: Some(Step::Mix),
            ..Default::default()
        };
        let err = run(&seq("rmp"), None, "song", &mut script)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("pipeline mix ('m') failed at step 2/3"));
    }
}
