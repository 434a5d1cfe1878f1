use std::time::Duration;
use tracing::{trace, warn};

use phcal_traits::SensorBus;
use rppal::i2c::I2c;

use crate::error::{HwError, Result};
use crate::ezo::{RESPONSE_LEN, decode_response, encode_command};
use crate::util::retry_while_pending;

/// Extra time granted when the circuit answers "still processing".
const PENDING_TIMEOUT: Duration = Duration::from_millis(1_500);
const PENDING_POLL: Duration = Duration::from_millis(50);

/// EZO pH circuit on a Linux I2C bus.
pub struct EzoI2c {
    i2c: I2c,
}

impl EzoI2c {
    pub fn new(bus: u8, address: u16) -> Result<Self> {
        let mut i2c = I2c::with_bus(bus).map_err(|e| HwError::I2c(format!("open bus {bus}: {e}")))?;
        i2c.set_slave_address(address)
            .map_err(|e| HwError::I2c(format!("set address 0x{address:02x}: {e}")))?;
        Ok(Self { i2c })
    }

    fn read_frame(&mut self) -> Result<String> {
        let mut frame = [0u8; RESPONSE_LEN];
        self.i2c
            .read(&mut frame)
            .map_err(|e| HwError::I2c(e.to_string()))?;
        decode_response(&frame)
    }
}

impl SensorBus for EzoI2c {
    fn write(&mut self, command: &str) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let bytes = encode_command(command)?;
        trace!(cmd = command, "ezo write");
        self.i2c
            .write(&bytes)
            .map_err(|e| HwError::I2c(e.to_string()))?;
        Ok(())
    }

    fn read_response(&mut self) -> std::result::Result<String, Box<dyn std::error::Error + Send + Sync>> {
        match retry_while_pending(|| self.read_frame(), PENDING_TIMEOUT, PENDING_POLL) {
            Ok(payload) => {
                trace!(payload = %payload, "ezo read");
                Ok(payload)
            }
            Err(e) => {
                warn!(error = %e, "ezo read failed");
                Err(Box::new(e))
            }
        }
    }
}
