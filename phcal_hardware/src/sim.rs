//! Simulated EZO pH circuit.
//!
//! The model assumes the operator moves the probe to the solution the next
//! calibration point needs (7.00 after a clear, then 4.00, then 10.00). Each
//! reading closes part of the gap to that solution and carries a decaying,
//! alternating jitter, quantized to 0.01 pH like the real circuit, so it
//! settles after a handful of reads.

use phcal_traits::SensorBus;
use tracing::{debug, trace};

use crate::error::{HwError, Result};

const APPROACH: f64 = 0.5;
const INITIAL_JITTER: f64 = 0.04;
const JITTER_DECAY: f64 = 0.5;

pub struct SimulatedProbe {
    ph: f64,
    solution: f64,
    jitter: f64,
    reads: u64,
    cal_points: u8,
    pending: Option<String>,
    fail_all: bool,
}

impl Default for SimulatedProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedProbe {
    pub fn new() -> Self {
        Self {
            ph: 6.2,
            solution: 7.0,
            jitter: INITIAL_JITTER,
            reads: 0,
            cal_points: 0,
            pending: None,
            fail_all: false,
        }
    }

    /// Start from a device that already holds a full three-point calibration.
    pub fn calibrated() -> Self {
        Self {
            cal_points: 3,
            ..Self::new()
        }
    }

    /// Fail every request, as a disconnected bus would.
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::new()
        }
    }

    /// Number of calibration points currently stored.
    pub fn cal_points(&self) -> u8 {
        self.cal_points
    }

    fn move_to(&mut self, solution: f64) {
        self.solution = solution;
        self.jitter = INITIAL_JITTER;
    }

    fn next_reading(&mut self) -> f64 {
        self.ph += (self.solution - self.ph) * APPROACH;
        let sign = if self.reads % 2 == 0 { 1.0 } else { -1.0 };
        self.reads = self.reads.wrapping_add(1);
        let value = self.ph + sign * self.jitter;
        self.jitter *= JITTER_DECAY;
        (value * 100.0).round() / 100.0
    }

    fn slope(&self) -> &'static str {
        match self.cal_points {
            0 => "100.0,100.0,0.00",
            1 | 2 => "100.0,100.0,-0.42",
            _ => "99.7,100.3,-0.89",
        }
    }

    fn respond(&mut self, command: &str) -> Result<String> {
        let cmd = command.trim();
        let lower = cmd.to_ascii_lowercase();
        match lower.as_str() {
            "i" => Ok("?i,pH,2.16".to_string()),
            "r" => Ok(format!("{:.2}", self.next_reading())),
            "cal,?" => Ok(format!("?CAL,{}", self.cal_points)),
            "slope,?" => Ok(format!("?Slope,{}", self.slope())),
            "cal,clear" => {
                self.cal_points = 0;
                self.move_to(7.0);
                Ok(String::new())
            }
            "cal,mid,7.00" => {
                // Midpoint calibration discards the low/high points.
                self.cal_points = 1;
                self.move_to(4.0);
                Ok(String::new())
            }
            "cal,low,4.00" => {
                self.cal_points = self.cal_points.max(1) + 1;
                self.move_to(10.0);
                Ok(String::new())
            }
            "cal,high,10.00" => {
                self.cal_points = 3;
                self.move_to(7.0);
                Ok(String::new())
            }
            _ => Err(HwError::Syntax),
        }
    }
}

impl SensorBus for SimulatedProbe {
    fn write(&mut self, command: &str) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.fail_all {
            return Err(Box::new(HwError::I2c("simulated bus failure".into())));
        }
        trace!(cmd = command, "sim write");
        let answer = self.respond(command)?;
        debug!(cmd = command, answer = %answer, "sim answer");
        self.pending = Some(answer);
        Ok(())
    }

    fn read_response(&mut self) -> std::result::Result<String, Box<dyn std::error::Error + Send + Sync>> {
        if self.fail_all {
            return Err(Box::new(HwError::I2c("simulated bus failure".into())));
        }
        self.pending.take().ok_or_else(|| HwError::NoData.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(p: &mut SimulatedProbe, cmd: &str) -> String {
        p.write(cmd).unwrap();
        p.read_response().unwrap()
    }

    #[test]
    fn readings_settle_on_the_midpoint_solution() {
        let mut p = SimulatedProbe::new();
        let readings: Vec<String> = (0..20).map(|_| query(&mut p, "R")).collect();
        let tail = &readings[readings.len() - 4..];
        assert!(tail.iter().all(|r| r == "7.00"), "tail: {tail:?}");
    }

    #[test]
    fn calibration_sequence_tracks_points_and_solution() {
        let mut p = SimulatedProbe::new();
        assert_eq!(query(&mut p, "Cal,?"), "?CAL,0");
        assert_eq!(query(&mut p, "Cal,mid,7.00"), "");
        for _ in 0..20 {
            query(&mut p, "R");
        }
        assert_eq!(query(&mut p, "R"), "4.00");
        query(&mut p, "Cal,low,4.00");
        query(&mut p, "Cal,high,10.00");
        assert_eq!(query(&mut p, "Cal,?"), "?CAL,3");
        assert_eq!(query(&mut p, "Slope,?"), "?Slope,99.7,100.3,-0.89");
        query(&mut p, "Cal,clear");
        assert_eq!(p.cal_points(), 0);
    }

    #[test]
    fn unknown_command_is_a_syntax_error() {
        let mut p = SimulatedProbe::new();
        assert!(p.write("Foo,?").is_err());
    }

    #[test]
    fn read_without_command_has_no_data() {
        let mut p = SimulatedProbe::new();
        assert!(p.read_response().is_err());
    }

    #[test]
    fn failing_probe_rejects_everything() {
        let mut p = SimulatedProbe::failing();
        assert!(p.write("i").is_err());
        assert!(p.read_response().is_err());
    }
}
