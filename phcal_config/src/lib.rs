#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the pH calibration controller.
//!
//! - `Config` and its sections are deserialized from TOML. Every section is
//!   optional and falls back to the values the EZO pH circuit expects.
//! - `Config::validate` rejects values the workflow cannot run with.
use serde::Deserialize;
use std::path::Path;

/// Which stability strategy gates the calibration commands.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StabilityMode {
    /// Consecutive full windows with population stddev below `threshold_ph`.
    #[default]
    Windowed,
    /// `repeat_count` consecutive identical readings.
    ExactRepeat,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StabilityCfg {
    pub mode: StabilityMode,
    /// Readings per statistics window (W).
    pub window: usize,
    /// A window is stable when its stddev is strictly below this value (pH).
    pub threshold_ph: f64,
    /// Consecutive stable windows required before calibrating.
    pub required_windows: u32,
    /// Identical readings required in exact-repeat mode.
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

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TimingCfg {
    /// Wait after `R` before the reading can be fetched.
    pub read_settle_ms: u64,
    /// Wait after any other command before its acknowledgement can be fetched.
    pub command_settle_ms: u64,
    /// Abort the session when a point has not stabilized within this time.
    pub step_timeout_ms: u64,
    /// Sleep between ticks when there is nothing to poll.
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

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BusCfg {
    /// Linux I2C bus number (`/dev/i2c-N`).
    pub i2c_bus: u8,
    /// 7-bit slave address of the pH circuit.
    pub address: u16,
}

impl Default for BusCfg {
    fn default() -> Self {
        Self {
            i2c_bus: 1,
            address: 0x63,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub stability: StabilityCfg,
    pub timing: TimingCfg,
    pub bus: BusCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {}", path.display(), e))?;
    let cfg = load_toml(&text)
        .map_err(|e| eyre::eyre!("invalid configuration in {}: {}", path.display(), e))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Stability
        if self.stability.window < 2 {
            eyre::bail!("stability.window must be >= 2");
        }
        if !self.stability.threshold_ph.is_finite() || self.stability.threshold_ph <= 0.0 {
            eyre::bail!("stability.threshold_ph must be a finite value > 0");
        }
        if self.stability.threshold_ph > 1.0 {
            eyre::bail!("stability.threshold_ph is unreasonably large (>1 pH)");
        }
        if self.stability.required_windows == 0 {
            eyre::bail!("stability.required_windows must be >= 1");
        }
        if self.stability.repeat_count < 2 {
            eyre::bail!("stability.repeat_count must be >= 2");
        }

        // Timing
        if self.timing.read_settle_ms == 0 {
            eyre::bail!("timing.read_settle_ms must be >= 1");
        }
        if self.timing.command_settle_ms == 0 {
            eyre::bail!("timing.command_settle_ms must be >= 1");
        }
        if self.timing.step_timeout_ms < self.timing.read_settle_ms {
            eyre::bail!("timing.step_timeout_ms must cover at least one read cycle");
        }
        if self.timing.idle_tick_ms == 0 {
            eyre::bail!("timing.idle_tick_ms must be >= 1");
        }

        // Bus
        if !(0x03..=0x77).contains(&self.bus.address) {
            eyre::bail!("bus.address must be a 7-bit address in 0x03..=0x77");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
