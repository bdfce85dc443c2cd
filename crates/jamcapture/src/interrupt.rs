//! Routing of operator interrupts to whichever recording is in progress.

use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

/// Stop requests for one recording.
///
/// The first request asks the capture process to finish its file; a repeated
/// request means the operator has given up waiting and wants it killed.
#[derive(Debug, Clone, Default)]
pub struct StopTokens {
    pub interrupt: CancellationToken,
    pub kill: CancellationToken,
}

impl StopTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel `interrupt`, or `kill` when `interrupt` already fired.
    pub fn escalate(&self) {
        if self.interrupt.is_cancelled() {
            self.kill.cancel();
        } else {
            self.interrupt.cancel();
        }
    }
}

/// Hands out fresh stop tokens for each recording.
///
/// The signal relay in `main` calls [`Interrupts::trigger`]; while a
/// recording is armed that escalates its stop tokens, otherwise the relay
/// treats the signal as a request to quit.
#[derive(Debug, Clone, Default)]
pub struct Interrupts {
    armed: Arc<Mutex<Option<StopTokens>>>,
}

impl Interrupts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm new stop tokens. They stay armed until the guard is dropped.
    pub fn arm(&self) -> ArmedInterrupt {
        let stop = StopTokens::new();
        *self.slot() = Some(stop.clone());
        ArmedInterrupt {
            interrupts: self.clone(),
            stop,
        }
    }

    /// Escalate the armed recording's stop. Returns `false` when nothing is
    /// armed.
    pub fn trigger(&self) -> bool {
        match self.slot().as_ref() {
            Some(stop) => {
                stop.escalate();
                true
            }
            None => false,
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<StopTokens>> {
        self.armed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Armed stop tokens; disarms on drop.
#[derive(Debug)]
pub struct ArmedInterrupt {
    interrupts: Interrupts,
    stop: StopTokens,
}

impl ArmedInterrupt {
    pub fn stop(&self) -> &StopTokens {
        &self.stop
    }
}

impl Drop for ArmedInterrupt {
    fn drop(&mut self) {
        *self.interrupts.slot() = None;
    }
}
