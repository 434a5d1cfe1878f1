//! Builder for `Workflow`.
//!
//! Bus and console are required; everything else has defaults. All values
//! are validated on `build()`.

use std::sync::Arc;

use phcal_traits::clock::{Clock, MonotonicClock};
use phcal_traits::{Console, SensorBus};

use crate::config::{StabilityCfg, TimingCfg};
use crate::error::{BuildError, Result};
use crate::probe::Probe;
use crate::workflow::Workflow;

#[derive(Default)]
pub struct WorkflowBuilder {
    bus: Option<Box<dyn SensorBus>>,
    console: Option<Box<dyn Console>>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    stability: Option<StabilityCfg>,
    timing: Option<TimingCfg>,
    required_windows: Option<u32>,
}

impl WorkflowBuilder {
    pub fn with_bus(mut self, bus: impl SensorBus + 'static) -> Self {
        self.bus = Some(Box::new(bus));
        self
    }

    pub fn with_console(mut self, console: impl Console + 'static) -> Self {
        self.console = Some(Box::new(console));
        self
    }

    /// Inject a clock (tests use `TestClock`). Defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_stability(mut self, stability: StabilityCfg) -> Self {
        self.stability = Some(stability);
        self
    }

    pub fn with_timing(mut self, timing: TimingCfg) -> Self {
        self.timing = Some(timing);
        self
    }

    /// Override `stability.required_windows` (operator's startup answer or CLI flag).
    pub fn with_required_windows(mut self, n: u32) -> Self {
        self.required_windows = Some(n);
        self
    }

    pub fn build(self) -> Result<Workflow> {
        let bus = self.bus.ok_or(BuildError::MissingBus)?;
        let console = self.console.ok_or(BuildError::MissingConsole)?;

        let mut stability = self.stability.unwrap_or_default();
        if let Some(n) = self.required_windows {
            stability.required_windows = n;
        }
        validate_stability(&stability)?;

        let timing = self.timing.unwrap_or_default();
        validate_timing(&timing)?;

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let probe = Probe::new(bus, clock.clone(), &timing);
        tracing::debug!(
            mode = ?stability.mode,
            window = stability.window,
            required_windows = stability.required_windows,
            "workflow built"
        );
        Ok(Workflow::from_parts(probe, console, clock, stability, timing))
    }
}

fn validate_stability(s: &StabilityCfg) -> std::result::Result<(), BuildError> {
    if s.window < 2 {
        return Err(BuildError::InvalidConfig("stability.window must be >= 2"));
    }
    if !s.threshold_ph.is_finite() || s.threshold_ph <= 0.0 {
        return Err(BuildError::InvalidConfig(
            "stability.threshold_ph must be a finite value > 0",
        ));
    }
    if s.required_windows == 0 {
        return Err(BuildError::InvalidConfig(
            "stability.required_windows must be >= 1",
        ));
    }
    if s.repeat_count < 2 {
        return Err(BuildError::InvalidConfig(
            "stability.repeat_count must be >= 2",
        ));
    }
    Ok(())
}

fn validate_timing(t: &TimingCfg) -> std::result::Result<(), BuildError> {
    if t.read_settle_ms == 0 || t.command_settle_ms == 0 {
        return Err(BuildError::InvalidConfig("settle delays must be >= 1 ms"));
    }
    if t.step_timeout_ms < t.read_settle_ms {
        return Err(BuildError::InvalidConfig(
            "step timeout must cover at least one read cycle",
        ));
    }
    if t.idle_tick_ms == 0 {
        return Err(BuildError::InvalidConfig("idle tick must be >= 1 ms"));
    }
    Ok(())
}
