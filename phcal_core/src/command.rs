//! Operator command parsing.
//!
//! Input is trimmed and matched case-insensitively.

use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    Start,
    Stop,
    Restart,
    /// Probe is in the requested solution.
    Ok,
    /// Treat the current readings as stable.
    Set,
    /// Show live stability statistics.
    Check,
    /// `set_stable_windows <n>`
    SetStableWindows(u32),
    /// Bare positive integer, the answer to the startup prompt.
    Number(u32),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("invalid command: '{0}'")]
    Unknown(String),
    #[error("invalid stable window count '{0}': enter a positive integer")]
    InvalidWindows(String),
}

fn positive(arg: &str) -> Result<u32, CommandError> {
    match arg.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(CommandError::InvalidWindows(arg.to_string())),
    }
}

impl FromStr for OperatorCommand {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let lower = line.to_ascii_lowercase();
        let mut parts = lower.split_whitespace();
        let head = parts.next().unwrap_or("");
        let rest: Vec<&str> = parts.collect();

        let cmd = match (head, rest.as_slice()) {
            ("start", []) => Self::Start,
            ("stop", []) => Self::Stop,
            ("restart", []) => Self::Restart,
            ("ok", []) => Self::Ok,
            ("set", []) => Self::Set,
            ("check", []) => Self::Check,
            ("set_stable_windows", [n]) => Self::SetStableWindows(positive(n)?),
            ("set_stable_windows", _) => {
                return Err(CommandError::InvalidWindows(rest.join(" ")));
            }
            (h, []) if h.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '+') => {
                Self::Number(positive(h)?)
            }
            _ => return Err(CommandError::Unknown(line.to_string())),
        };
        Ok(cmd)
    }
}
