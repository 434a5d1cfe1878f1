//! `From` implementations bridging `phcal_config` types to `phcal_core` types.

use crate::config::{StabilityCfg, StabilityMode, TimingCfg};

impl From<phcal_config::StabilityMode> for StabilityMode {
    fn from(m: phcal_config::StabilityMode) -> Self {
        match m {
            phcal_config::StabilityMode::Windowed => StabilityMode::Windowed,
            phcal_config::StabilityMode::ExactRepeat => StabilityMode::ExactRepeat,
        }
    }
}

impl From<&phcal_config::StabilityCfg> for StabilityCfg {
    fn from(c: &phcal_config::StabilityCfg) -> Self {
        Self {
            mode: c.mode.into(),
            window: c.window,
            threshold_ph: c.threshold_ph,
            required_windows: c.required_windows,
            repeat_count: c.repeat_count,
        }
    }
}

impl From<&phcal_config::TimingCfg> for TimingCfg {
    fn from(c: &phcal_config::TimingCfg) -> Self {
        Self {
            read_settle_ms: c.read_settle_ms,
            command_settle_ms: c.command_settle_ms,
            step_timeout_ms: c.step_timeout_ms,
            idle_tick_ms: c.idle_tick_ms,
        }
    }
}
