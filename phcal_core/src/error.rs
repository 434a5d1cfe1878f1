use thiserror::Error;

use crate::point::CalPoint;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalError {
    #[error("transport error on '{command}': {message}")]
    Transport { command: String, message: String },
    #[error("invalid response to '{command}': {response:?}")]
    InvalidResponse { command: String, response: String },
    #[error("device rejected '{command}': {response}")]
    Rejected { command: String, response: String },
    #[error("timeout: {point} not stable after {elapsed_ms} ms")]
    Timeout { point: CalPoint, elapsed_ms: u64 },
    #[error("console error: {0}")]
    Console(String),
    #[error("console closed")]
    ConsoleClosed,
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing sensor bus")]
    MissingBus,
    #[error("missing console")]
    MissingConsole,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
