//! Transport adapters for the EZO pH circuit.
//!
//! - `ezo`: I2C frame encoding/decoding (pure, no hardware needed)
//! - `sim`: deterministic simulated circuit used when the `hardware` feature is off
//! - `i2c`: real bus via rppal (`hardware` feature, Linux only)
pub mod error;
pub mod ezo;
pub mod sim;
pub mod util;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod i2c;

pub use sim::SimulatedProbe;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use i2c::EzoI2c;
