//! Command layer over the sensor bus.
//!
//! Every transaction is write, wait the settle delay on the injected clock,
//! then read. Responses are validated here so the workflow only sees typed
//! values or a `CalError`.

use std::sync::Arc;
use std::time::Duration;

use phcal_traits::{Clock, SensorBus};

use crate::config::TimingCfg;
use crate::error::CalError;
use crate::point::CalPoint;

const CMD_INFO: &str = "i";
const CMD_READ: &str = "R";
const CMD_CAL_STATUS: &str = "Cal,?";
const CMD_CAL_CLEAR: &str = "Cal,clear";
const CMD_SLOPE: &str = "Slope,?";

/// Valid pH range reported by the circuit.
const PH_RANGE: std::ops::RangeInclusive<f64> = 0.0..=14.0;

pub struct Probe {
    bus: Box<dyn SensorBus>,
    clock: Arc<dyn Clock + Send + Sync>,
    read_settle: Duration,
    command_settle: Duration,
}

impl core::fmt::Debug for Probe {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Probe")
            .field("read_settle", &self.read_settle)
            .field("command_settle", &self.command_settle)
            .finish()
    }
}

impl Probe {
    pub fn new(
        bus: Box<dyn SensorBus>,
        clock: Arc<dyn Clock + Send + Sync>,
        timing: &TimingCfg,
    ) -> Self {
        Self {
            bus,
            clock,
            read_settle: timing.read_settle(),
            command_settle: timing.command_settle(),
        }
    }

    fn transact(&mut self, command: &str, settle: Duration) -> Result<String, CalError> {
        let transport = |e: Box<dyn std::error::Error + Send + Sync>| CalError::Transport {
            command: command.to_string(),
            message: e.to_string(),
        };
        self.bus.write(command).map_err(transport)?;
        self.clock.sleep(settle);
        let response = self.bus.read_response().map_err(transport)?;
        tracing::trace!(cmd = command, response = %response, "transaction");
        Ok(response)
    }

    /// Device identity string (`i`).
    pub fn info(&mut self) -> Result<String, CalError> {
        self.transact(CMD_INFO, self.command_settle)
    }

    /// One pH reading (`R`).
    pub fn read_ph(&mut self) -> Result<f64, CalError> {
        let response = self.transact(CMD_READ, self.read_settle)?;
        parse_ph(&response).ok_or(CalError::InvalidResponse {
            command: CMD_READ.to_string(),
            response,
        })
    }

    /// Number of stored calibration points (`Cal,?`); 0 means uncalibrated.
    pub fn calibration_status(&mut self) -> Result<u8, CalError> {
        let response = self.transact(CMD_CAL_STATUS, self.command_settle)?;
        let value = strip_prefix_ci(&response, "?CAL,").unwrap_or(&response);
        value.trim().parse::<u8>().map_err(|_| CalError::InvalidResponse {
            command: CMD_CAL_STATUS.to_string(),
            response: response.clone(),
        })
    }

    /// Opaque slope string (`Slope,?`) without the device's echo prefix.
    pub fn slope(&mut self) -> Result<String, CalError> {
        let response = self.transact(CMD_SLOPE, self.command_settle)?;
        let value = strip_prefix_ci(&response, "?Slope,").unwrap_or(&response).trim();
        if value.is_empty() {
            return Err(CalError::InvalidResponse {
                command: CMD_SLOPE.to_string(),
                response,
            });
        }
        Ok(value.to_string())
    }

    pub fn clear_calibration(&mut self) -> Result<(), CalError> {
        self.command(CMD_CAL_CLEAR)
    }

    /// Store `point`. Irreversible until the next clear.
    pub fn calibrate(&mut self, point: CalPoint) -> Result<(), CalError> {
        self.command(point.command())
    }

    fn command(&mut self, command: &str) -> Result<(), CalError> {
        let response = self.transact(command, self.command_settle)?;
        if is_ack(&response) {
            tracing::debug!(cmd = command, "acknowledged");
            Ok(())
        } else {
            Err(CalError::Rejected {
                command: command.to_string(),
                response,
            })
        }
    }
}

/// Empty payload (I2C) and `*OK` (UART) both acknowledge a command.
fn is_ack(response: &str) -> bool {
    let r = response.trim();
    r.is_empty() || r.eq_ignore_ascii_case("*OK")
}

fn parse_ph(response: &str) -> Option<f64> {
    let v = response.trim().parse::<f64>().ok()?;
    (v.is_finite() && PH_RANGE.contains(&v)).then_some(v)
}

fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &s[prefix.len()..])
}
