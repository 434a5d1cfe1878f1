pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Request/response channel to the pH circuit.
///
/// `write` hands one ASCII command to the device; `read_response` fetches the
/// device's answer to the last command. Callers wait the command's settle
/// delay in between, the device is not ready before that.
pub trait SensorBus {
    fn write(&mut self, command: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn read_response(&mut self) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

/// Line-oriented operator console.
pub trait Console {
    /// Next trimmed input line if one is available; never blocks.
    fn try_read_line(
        &mut self,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>>;
    fn write_line(&mut self, text: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
