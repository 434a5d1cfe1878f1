//! Single calibration point: prompt, confirm, poll until stable, calibrate.
//!
//! The step never blocks on the operator. `poll` performs at most one
//! read-and-decide cycle and returns; the workflow feeds operator commands
//! in between. The calibration command is only ever sent from the cycle on
//! which the detector fires, or from an explicit `force`.

use std::time::Instant;

use phcal_traits::Clock;

use crate::error::CalError;
use crate::point::CalPoint;
use crate::probe::Probe;
use crate::stability::{StabilityStrategy, Verdict};
use crate::status::StepStatus;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    AwaitingConfirm,
    Stabilizing { started: Instant },
    Done,
}

#[derive(Debug, Clone)]
pub struct CalibrationStep {
    point: CalPoint,
    phase: Phase,
    timeout_ms: u64,
}

impl CalibrationStep {
    pub fn new(point: CalPoint, timeout_ms: u64) -> Self {
        Self {
            point,
            phase: Phase::AwaitingConfirm,
            timeout_ms,
        }
    }

    pub fn point(&self) -> CalPoint {
        self.point
    }

    pub fn prompt(&self) -> String {
        format!(
            "Place the probe in the pH {:.2} solution for the {} point, then type 'ok'.",
            self.point.reference_ph(),
            self.point.label()
        )
    }

    pub fn is_awaiting_confirm(&self) -> bool {
        self.phase == Phase::AwaitingConfirm
    }

    /// True while readings are being taken.
    pub fn is_polling(&self) -> bool {
        matches!(self.phase, Phase::Stabilizing { .. })
    }

    /// Operator confirmed the probe is in the solution; the step timer starts now.
    /// Returns false if the step was not waiting for confirmation.
    pub fn confirm(&mut self, clock: &dyn Clock) -> bool {
        if self.phase != Phase::AwaitingConfirm {
            return false;
        }
        self.phase = Phase::Stabilizing {
            started: clock.now(),
        };
        tracing::info!(point = self.point.label(), "stabilizing");
        true
    }

    /// Milliseconds spent stabilizing so far, 0 before confirmation.
    pub fn elapsed_ms(&self, clock: &dyn Clock) -> u64 {
        match self.phase {
            Phase::Stabilizing { started } => clock.ms_since(started),
            _ => 0,
        }
    }

    fn timed_out(&self, clock: &dyn Clock) -> Option<CalError> {
        let elapsed_ms = self.elapsed_ms(clock);
        (elapsed_ms >= self.timeout_ms).then_some(CalError::Timeout {
            point: self.point,
            elapsed_ms,
        })
    }

    /// One read-and-decide cycle.
    pub fn poll(
        &mut self,
        probe: &mut Probe,
        detector: &mut dyn StabilityStrategy,
        clock: &dyn Clock,
    ) -> StepStatus {
        match self.phase {
            Phase::AwaitingConfirm => return StepStatus::AwaitingConfirm,
            Phase::Done => return StepStatus::Complete,
            Phase::Stabilizing { .. } => {}
        }
        if let Some(e) = self.timed_out(clock) {
            return StepStatus::Aborted(e);
        }

        let ph = match probe.read_ph() {
            Ok(ph) => ph,
            Err(e) => {
                tracing::warn!(point = self.point.label(), error = %e, "read failed");
                return self.timed_out(clock).map_or(StepStatus::ReadMiss(e), StepStatus::Aborted);
            }
        };

        let verdict = detector.update(ph);
        tracing::debug!(
            point = self.point.label(),
            ph,
            stable_windows = detector.count(),
            "reading"
        );
        // A read that ends past the deadline never leads to a calibration write.
        if let Some(e) = self.timed_out(clock) {
            return StepStatus::Aborted(e);
        }
        if verdict == Verdict::Stable {
            tracing::info!(
                point = self.point.label(),
                ph,
                elapsed_ms = self.elapsed_ms(clock),
                "stable"
            );
            return self.calibrate(probe);
        }
        StepStatus::Running { ph, verdict }
    }

    /// Manual override: calibrate now without waiting for stability.
    /// Only valid once the operator has confirmed the solution.
    pub fn force(&mut self, probe: &mut Probe) -> Option<StepStatus> {
        if !self.is_polling() {
            return None;
        }
        tracing::info!(point = self.point.label(), "forced by operator");
        Some(self.calibrate(probe))
    }

    fn calibrate(&mut self, probe: &mut Probe) -> StepStatus {
        match probe.calibrate(self.point) {
            Ok(()) => {
                self.phase = Phase::Done;
                StepStatus::Complete
            }
            Err(e) => StepStatus::Aborted(e),
        }
    }
}
