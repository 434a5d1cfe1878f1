use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Re-run `attempt` while the device reports it is still processing,
/// sleeping `poll_interval` between attempts, until `timeout` expires.
/// Any other outcome (success or a different error) is returned as-is.
pub fn retry_while_pending<T>(
    mut attempt: impl FnMut() -> Result<T>,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<T> {
    let deadline = Instant::now() + timeout;
    loop {
        match attempt() {
            Err(HwError::Pending) => {
                if Instant::now() >= deadline {
                    return Err(HwError::Pending);
                }
                std::thread::sleep(poll_interval);
            }
            other => return other,
        }
    }
}
