//! Step status returned from each polling cycle.

use crate::error::CalError;
use crate::stability::Verdict;

/// Public status of a single cycle of a calibration step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepStatus {
    /// Prompt shown; waiting for the operator's `ok`.
    AwaitingConfirm,
    /// Reading taken and fed to the detector; not stable yet.
    Running { ph: f64, verdict: Verdict },
    /// Reading failed; the step keeps polling on the next cycle.
    ReadMiss(CalError),
    /// Calibration command acknowledged for this point.
    Complete,
    /// Step cannot finish; the session must be abandoned.
    Aborted(CalError),
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Complete | StepStatus::Aborted(_))
    }
}
