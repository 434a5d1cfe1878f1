//! Runtime configuration for the calibration workflow.
//!
//! These are separate from the TOML-deserialized config in `phcal_config`;
//! see `conversions` for the mapping.

use std::time::Duration;

use crate::stability::{ExactRepeat, StabilityStrategy, Windowed};

/// Selects the stability strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StabilityMode {
    #[default]
    Windowed,
    ExactRepeat,
}

#[derive(Debug, Clone)]
pub struct StabilityCfg {
    pub mode: StabilityMode,
    /// Readings per window (W).
    pub window: usize,
    /// Window is stable when stddev < threshold (pH).
    pub threshold_ph: f64,
    /// Consecutive stable windows before the point is calibrated.
    pub required_windows: u32,
    /// Identical consecutive readings required in exact-repeat mode.
    pub repeat_count: u32,
}

impl Default for StabilityCfg {
    fn default() -> Self {
        Self {
            mode: StabilityMode::Windowed,
            window: 5,
            threshold_ph: 0.005,
            required_windows: 3,
            repeat_count: 4,
        }
    }
}

impl StabilityCfg {
    /// Instantiate the configured strategy with fresh counters.
    pub fn build(&self) -> Box<dyn StabilityStrategy> {
        match self.mode {
            StabilityMode::Windowed => Box::new(Windowed::new(
                self.window,
                self.threshold_ph,
                self.required_windows,
            )),
            StabilityMode::ExactRepeat => Box::new(ExactRepeat::new(self.repeat_count)),
        }
    }
}

/// Settle delays and the per-point timeout.
#[derive(Debug, Clone)]
pub struct TimingCfg {
    pub read_settle_ms: u64,
    pub command_settle_ms: u64,
    pub step_timeout_ms: u64,
    pub idle_tick_ms: u64,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            read_settle_ms: 1_000,
            command_settle_ms: 300,
            step_timeout_ms: 600_000,
            idle_tick_ms: 50,
        }
    }
}

impl TimingCfg {
    pub fn read_settle(&self) -> Duration {
        Duration::from_millis(self.read_settle_ms)
    }

    pub fn command_settle(&self) -> Duration {
        Duration::from_millis(self.command_settle_ms)
    }

    pub fn idle_tick(&self) -> Duration {
        Duration::from_millis(self.idle_tick_ms)
    }
}
