//! Calibration workflow: IDLE → CHECKING_PRIOR → MID → LOW → HIGH → REPORTING → IDLE.
//!
//! The workflow owns the probe, the console and the session. It is driven by
//! `tick()`: poll the console once, apply any command, then perform at most
//! one read-and-decide cycle. `stop` and `restart` take effect inside
//! `handle_line`, before the next cycle, so an interrupted step never gets
//! its calibration command.

use std::sync::Arc;
use std::time::Duration;

use phcal_traits::{Clock, Console};

use crate::builder::WorkflowBuilder;
use crate::command::OperatorCommand;
use crate::config::{StabilityCfg, StabilityMode, TimingCfg};
use crate::console::ConsoleClosed;
use crate::error::CalError;
use crate::point::CalPoint;
use crate::probe::Probe;
use crate::session::{CalibrationSession, Stage, WorkflowState};
use crate::stability::{StabilityStrategy, Verdict};
use crate::stats::StatsWindow;
use crate::status::StepStatus;

/// Whether the last tick did device work or is waiting on the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Busy,
    Idle,
}

#[derive(Clone, Copy)]
enum Next {
    CheckPrior,
    Poll,
    Report,
}

enum Mode {
    Idle,
    Monitoring(StatsWindow),
    Session(CalibrationSession),
}

pub struct Workflow {
    probe: Probe,
    console: Box<dyn Console>,
    clock: Arc<dyn Clock + Send + Sync>,
    stability: StabilityCfg,
    detector: Box<dyn StabilityStrategy>,
    timing: TimingCfg,
    mode: Mode,
    sessions_completed: u32,
}

impl core::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Workflow")
            .field("state", &self.state())
            .field("detector", &self.detector.name())
            .field("sessions_completed", &self.sessions_completed)
            .finish()
    }
}

impl Workflow {
    pub fn builder() -> WorkflowBuilder {
        WorkflowBuilder::default()
    }

    pub(crate) fn from_parts(
        probe: Probe,
        console: Box<dyn Console>,
        clock: Arc<dyn Clock + Send + Sync>,
        stability: StabilityCfg,
        timing: TimingCfg,
    ) -> Self {
        let detector = stability.build();
        Self {
            probe,
            console,
            clock,
            stability,
            detector,
            timing,
            mode: Mode::Idle,
            sessions_completed: 0,
        }
    }

    pub fn state(&self) -> WorkflowState {
        match &self.mode {
            Mode::Idle => WorkflowState::Idle,
            Mode::Monitoring(_) => WorkflowState::Monitoring,
            Mode::Session(s) => s.state(),
        }
    }

    pub fn session(&self) -> Option<&CalibrationSession> {
        match &self.mode {
            Mode::Session(s) => Some(s),
            _ => None,
        }
    }

    pub fn stability(&self) -> &StabilityCfg {
        &self.stability
    }

    pub fn sessions_completed(&self) -> u32 {
        self.sessions_completed
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Pause between ticks while waiting on the operator.
    pub fn idle_tick(&self) -> Duration {
        self.timing.idle_tick()
    }

    fn say(&mut self, text: impl AsRef<str>) -> Result<(), CalError> {
        self.console
            .write_line(text.as_ref())
            .map_err(|e| CalError::Console(e.to_string()))
    }

    /// Startup banner and the stable-window prompt.
    pub fn greet(&mut self) -> Result<(), CalError> {
        self.say("pH probe calibration: mid (7.00), low (4.00), high (10.00).")?;
        let summary = match self.stability.mode {
            StabilityMode::Windowed => format!(
                "Stability: windows of {} readings, stddev < {} pH, {} stable window(s) required.",
                self.stability.window, self.stability.threshold_ph, self.stability.required_windows
            ),
            StabilityMode::ExactRepeat => format!(
                "Stability: {} identical consecutive readings required.",
                self.stability.repeat_count
            ),
        };
        self.say(summary)?;
        self.say(format!(
            "Enter the number of stable windows required [{}], or type 'start' to begin.",
            self.stability.required_windows
        ))
    }

    /// Poll the console once, apply any command, then run one cycle.
    pub fn tick(&mut self) -> Result<Activity, CalError> {
        let line = self.console.try_read_line().map_err(|e| {
            if e.downcast_ref::<ConsoleClosed>().is_some() {
                CalError::ConsoleClosed
            } else {
                CalError::Console(e.to_string())
            }
        })?;
        if let Some(line) = line {
            self.handle_line(&line)?;
        }
        self.cycle()
    }

    /// Apply one operator command. Unknown input only produces a notice.
    pub fn handle_line(&mut self, line: &str) -> Result<(), CalError> {
        let cmd = match line.parse::<OperatorCommand>() {
            Ok(cmd) => cmd,
            Err(e) => {
                tracing::debug!(input = line, "rejected operator input");
                return self.say(e.to_string());
            }
        };
        tracing::debug!(?cmd, state = ?self.state(), "operator command");
        match cmd {
            OperatorCommand::Start => self.start(),
            OperatorCommand::Stop => self.stop(),
            OperatorCommand::Restart => self.restart(),
            OperatorCommand::Ok => self.confirm(),
            OperatorCommand::Set => self.force(),
            OperatorCommand::Check => self.check(),
            OperatorCommand::SetStableWindows(n) => self.set_required_windows(n),
            OperatorCommand::Number(n) => {
                if matches!(self.mode, Mode::Idle) {
                    self.set_required_windows(n)
                } else {
                    self.say("A bare number is only accepted at the initial prompt; use 'set_stable_windows <n>'.")
                }
            }
        }
    }

    /// End any active session as if the operator typed `stop`.
    pub fn shutdown(&mut self) -> Result<(), CalError> {
        match self.mode {
            Mode::Session(_) => {
                tracing::info!("shutdown during session");
                self.end_session("Calibration stopped")
            }
            Mode::Monitoring(_) => {
                self.mode = Mode::Idle;
                Ok(())
            }
            Mode::Idle => Ok(()),
        }
    }

    fn start(&mut self) -> Result<(), CalError> {
        if matches!(self.mode, Mode::Session(_)) {
            return self.say("A calibration is already in progress; type 'restart' or 'stop'.");
        }
        self.mode = Mode::Session(CalibrationSession::new(self.timing.step_timeout_ms));
        self.detector.reset();
        tracing::info!(detector = self.detector.name(), "session start");
        self.say("Starting calibration; checking existing device calibration.")
    }

    fn stop(&mut self) -> Result<(), CalError> {
        match self.mode {
            Mode::Session(_) => {
                tracing::info!(state = ?self.state(), "session stopped by operator");
                self.end_session("Calibration stopped")
            }
            Mode::Monitoring(_) => {
                self.mode = Mode::Idle;
                self.say("Stability check cancelled.")
            }
            Mode::Idle => self.say("No calibration in progress."),
        }
    }

    fn restart(&mut self) -> Result<(), CalError> {
        if !matches!(self.mode, Mode::Session(_)) {
            return self.say("No calibration in progress; type 'start' to begin.");
        }
        tracing::info!(state = ?self.state(), "session restarted by operator");
        self.detector.reset();
        if let Err(e) = self.probe.clear_calibration() {
            self.say(format!("Clearing device calibration failed: {e}"))?;
        }
        let prompt = match &mut self.mode {
            Mode::Session(s) => s.enter(CalPoint::Mid),
            _ => return Ok(()),
        };
        self.say("Restarting calibration from the mid point.")?;
        self.say(prompt)
    }

    fn confirm(&mut self) -> Result<(), CalError> {
        let confirmed = match &mut self.mode {
            Mode::Session(s) => s
                .step_mut()
                .filter(|step| step.is_awaiting_confirm())
                .map(|step| {
                    step.confirm(self.clock.as_ref());
                    step.point()
                }),
            _ => None,
        };
        match confirmed {
            Some(point) => {
                self.detector.reset();
                self.say(format!(
                    "Waiting for the {point} readings to stabilize (type 'set' to accept the current reading)."
                ))
            }
            None => self.say("Nothing to confirm."),
        }
    }

    fn force(&mut self) -> Result<(), CalError> {
        let forced = match &mut self.mode {
            Mode::Session(s) => s
                .step_mut()
                .and_then(|step| step.force(&mut self.probe).map(|status| (step.point(), status))),
            _ => None,
        };
        match forced {
            Some((point, status)) => self.on_step_status(point, status).map(|_| ()),
            None => self.say("'set' only applies while a point is stabilizing."),
        }
    }

    fn check(&mut self) -> Result<(), CalError> {
        let step = match &self.mode {
            Mode::Idle => None,
            Mode::Monitoring(_) => return self.say("A stability check is already running."),
            Mode::Session(s) => Some(s.step().map(|step| (step.point(), step.is_polling()))),
        };
        match step {
            Some(step) => {
                let snapshot = self.snapshot(step);
                self.say(snapshot)
            }
            None => {
                let window = self.stability.window;
                self.mode = Mode::Monitoring(StatsWindow::new(window));
                self.say(format!("Checking stability over {window} readings."))
            }
        }
    }

    fn snapshot(&self, step: Option<(CalPoint, bool)>) -> String {
        let Some((point, polling)) = step else {
            return format!("Session state: {:?}.", self.state());
        };
        if !polling {
            return format!("{point}: waiting for 'ok'.");
        }
        let mut text = format!(
            "{point}: {} {}/{}",
            self.progress_label(),
            self.detector.count(),
            self.detector.required()
        );
        if let Some(w) = self.detector.last_window() {
            text.push_str(&format!(
                ", last window mean {:.3} pH, stddev {:.4} pH ({})",
                w.mean,
                w.stddev,
                if w.stable { "stable" } else { "unstable" }
            ));
        }
        text.push('.');
        text
    }

    fn progress_label(&self) -> &'static str {
        match self.stability.mode {
            StabilityMode::Windowed => "stable windows",
            StabilityMode::ExactRepeat => "identical readings",
        }
    }

    fn set_required_windows(&mut self, n: u32) -> Result<(), CalError> {
        self.stability.required_windows = n;
        let polling = self
            .session()
            .and_then(CalibrationSession::step)
            .is_some_and(|step| step.is_polling());
        // Rebuilding drops any progress towards the current point.
        self.detector = self.stability.build();
        tracing::info!(required_windows = n, "stable window count changed");
        self.say(format!("Stable windows required: {n}."))?;
        if self.stability.mode == StabilityMode::ExactRepeat {
            self.say("Note: exact-repeat mode does not use the stable window count.")?;
        }
        if polling {
            self.say("Stability progress for the current point was reset.")?;
        }
        Ok(())
    }

    fn end_session(&mut self, reason: &str) -> Result<(), CalError> {
        self.mode = Mode::Idle;
        self.detector.reset();
        match self.probe.clear_calibration() {
            Ok(()) => self.say(format!("{reason}; device calibration cleared.")),
            Err(e) => self.say(format!("{reason}; clearing device calibration failed: {e}")),
        }
    }

    fn cycle(&mut self) -> Result<Activity, CalError> {
        let next = match &self.mode {
            Mode::Idle => return Ok(Activity::Idle),
            Mode::Monitoring(_) => return self.monitor_cycle(),
            Mode::Session(s) => match s.stage {
                Stage::CheckingPrior => Next::CheckPrior,
                Stage::Point(_) => Next::Poll,
                Stage::Reporting => Next::Report,
            },
        };
        match next {
            Next::CheckPrior => self.check_prior(),
            Next::Poll => self.step_cycle(),
            Next::Report => self.report(),
        }
    }

    fn check_prior(&mut self) -> Result<Activity, CalError> {
        let prior = match self.prior_calibration() {
            Ok(prior) => prior,
            Err(e) => {
                tracing::error!(error = %e, "cannot start session");
                self.mode = Mode::Idle;
                self.say(format!("Cannot start calibration: {e}"))?;
                return Ok(Activity::Idle);
            }
        };
        let prompt = match &mut self.mode {
            Mode::Session(s) => {
                if let Some(slope) = prior {
                    s.set_prior_slope(slope);
                }
                s.enter(CalPoint::Mid)
            }
            _ => return Ok(Activity::Idle),
        };
        self.say(prompt)?;
        Ok(Activity::Busy)
    }

    fn prior_calibration(&mut self) -> Result<Option<String>, CalError> {
        let points = self.probe.calibration_status()?;
        if points == 0 {
            self.say("No prior calibration found; clearing device calibration.")?;
            self.probe.clear_calibration()?;
            return Ok(None);
        }
        let slope = self.probe.slope()?;
        tracing::info!(points, slope = %slope, "prior calibration present");
        self.say(format!(
            "Device already holds a calibration ({points} point(s)); slope {slope}."
        ))?;
        Ok(Some(slope))
    }

    fn step_cycle(&mut self) -> Result<Activity, CalError> {
        let Mode::Session(session) = &mut self.mode else {
            return Ok(Activity::Idle);
        };
        let Some(step) = session.step_mut() else {
            return Ok(Activity::Idle);
        };
        let point = step.point();
        let status = step.poll(&mut self.probe, self.detector.as_mut(), self.clock.as_ref());
        self.on_step_status(point, status)
    }

    fn on_step_status(&mut self, point: CalPoint, status: StepStatus) -> Result<Activity, CalError> {
        match status {
            StepStatus::AwaitingConfirm => Ok(Activity::Idle),
            StepStatus::Running { ph, verdict } => {
                let count = match verdict {
                    Verdict::Counting { count, .. } => count,
                    _ => 0,
                };
                let line = format!(
                    "pH {ph:.2} ({} {count}/{})",
                    self.progress_label(),
                    self.detector.required()
                );
                self.say(line)?;
                Ok(Activity::Busy)
            }
            StepStatus::ReadMiss(e) => {
                self.say(format!("Reading failed: {e}; retrying."))?;
                Ok(Activity::Busy)
            }
            StepStatus::Complete => {
                tracing::info!(point = point.label(), "point calibrated");
                self.detector.reset();
                self.say(format!("{point} calibrated."))?;
                let next = match &mut self.mode {
                    Mode::Session(s) => s.advance(point),
                    _ => None,
                };
                if let Some(prompt) = next {
                    self.say(prompt)?;
                }
                Ok(Activity::Busy)
            }
            StepStatus::Aborted(e) => {
                tracing::error!(point = point.label(), error = %e, "session aborted");
                self.say(format!("Calibration aborted: {e}"))?;
                self.end_session("Session abandoned")?;
                Ok(Activity::Idle)
            }
        }
    }

    fn report(&mut self) -> Result<Activity, CalError> {
        let prior = match std::mem::replace(&mut self.mode, Mode::Idle) {
            Mode::Session(s) => s.into_prior_slope(),
            _ => None,
        };
        self.sessions_completed = self.sessions_completed.saturating_add(1);
        self.say("Calibration complete.")?;
        match self.probe.slope() {
            Ok(slope) => {
                if let Some(before) = prior {
                    self.say(format!("Slope before: {before}"))?;
                }
                tracing::info!(slope = %slope, "final slope");
                self.say(format!("Slope after: {slope}"))?;
            }
            Err(e) => self.say(format!("Could not read the final slope: {e}"))?,
        }
        Ok(Activity::Idle)
    }

    fn monitor_cycle(&mut self) -> Result<Activity, CalError> {
        let ph = match self.probe.read_ph() {
            Ok(ph) => ph,
            Err(e) => {
                self.say(format!("Reading failed: {e}; retrying."))?;
                return Ok(Activity::Busy);
            }
        };
        let Mode::Monitoring(window) = &mut self.mode else {
            return Ok(Activity::Idle);
        };
        window.push(ph);
        let (Some(mean), Some(stddev)) = (window.mean(), window.stddev()) else {
            let line = format!("pH {ph:.2} ({}/{})", window.len(), window.capacity());
            self.say(line)?;
            return Ok(Activity::Busy);
        };
        self.mode = Mode::Idle;
        let threshold = self.stability.threshold_ph;
        let verdict = if stddev < threshold { "stable" } else { "not stable" };
        tracing::info!(mean, stddev, threshold, "stability check");
        self.say(format!(
            "mean {mean:.3} pH, stddev {stddev:.4} pH: {verdict} (threshold {threshold} pH)."
        ))?;
        Ok(Activity::Idle)
    }
}
