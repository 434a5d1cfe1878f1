//! State of one calibration run, from `start` to the final report.

use crate::point::CalPoint;
use crate::step::CalibrationStep;

/// Externally visible workflow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    /// One-off stability check outside a session.
    Monitoring,
    CheckingPrior,
    Mid,
    Low,
    High,
    Reporting,
}

impl From<CalPoint> for WorkflowState {
    fn from(p: CalPoint) -> Self {
        match p {
            CalPoint::Mid => WorkflowState::Mid,
            CalPoint::Low => WorkflowState::Low,
            CalPoint::High => WorkflowState::High,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Stage {
    CheckingPrior,
    Point(CalibrationStep),
    Reporting,
}

/// Owned by the workflow; dropped on completion, stop or abort.
#[derive(Debug, Clone)]
pub struct CalibrationSession {
    pub(crate) stage: Stage,
    prior_slope: Option<String>,
    step_timeout_ms: u64,
}

impl CalibrationSession {
    pub(crate) fn new(step_timeout_ms: u64) -> Self {
        Self {
            stage: Stage::CheckingPrior,
            prior_slope: None,
            step_timeout_ms,
        }
    }

    pub fn state(&self) -> WorkflowState {
        match &self.stage {
            Stage::CheckingPrior => WorkflowState::CheckingPrior,
            Stage::Point(step) => step.point().into(),
            Stage::Reporting => WorkflowState::Reporting,
        }
    }

    /// Slope the device reported before this session, if it was calibrated.
    pub fn prior_slope(&self) -> Option<&str> {
        self.prior_slope.as_deref()
    }

    pub(crate) fn set_prior_slope(&mut self, slope: String) {
        self.prior_slope = Some(slope);
    }

    /// Move to `point`, discarding any progress on the current stage.
    /// Returns the operator prompt for the new step.
    pub(crate) fn enter(&mut self, point: CalPoint) -> String {
        let step = CalibrationStep::new(point, self.step_timeout_ms);
        let prompt = step.prompt();
        self.stage = Stage::Point(step);
        prompt
    }

    pub(crate) fn step(&self) -> Option<&CalibrationStep> {
        match &self.stage {
            Stage::Point(step) => Some(step),
            _ => None,
        }
    }

    pub(crate) fn step_mut(&mut self) -> Option<&mut CalibrationStep> {
        match &mut self.stage {
            Stage::Point(step) => Some(step),
            _ => None,
        }
    }

    pub(crate) fn into_prior_slope(self) -> Option<String> {
        self.prior_slope
    }

    /// Advance after `point` completed: the next point's prompt, or `None`
    /// when the session moves on to the final report.
    pub(crate) fn advance(&mut self, point: CalPoint) -> Option<String> {
        match point.next() {
            Some(next) => Some(self.enter(next)),
            None => {
                self.stage = Stage::Reporting;
                None
            }
        }
    }
}
