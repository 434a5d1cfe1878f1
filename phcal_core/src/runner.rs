use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{CalError, Result as CoreResult};
use crate::workflow::{Activity, Workflow};

/// Outcome of an interactive run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub sessions_completed: u32,
    /// True when the loop ended because the console input closed.
    pub console_closed: bool,
}

/// Drive the workflow until `shutdown` is raised or the console closes.
///
/// Either way an active session is ended as if the operator typed `stop`.
/// Console write failures and other unexpected errors are returned after
/// the same cleanup.
pub fn run(workflow: &mut Workflow, shutdown: &AtomicBool) -> CoreResult<RunSummary> {
    workflow.greet()?;
    tracing::info!("calibration loop start");

    let mut console_closed = false;
    let outcome = loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("shutdown requested");
            break Ok(());
        }
        match workflow.tick() {
            Ok(Activity::Busy) => {}
            Ok(Activity::Idle) => {
                let tick = workflow.idle_tick();
                workflow.clock().sleep(tick);
            }
            Err(CalError::ConsoleClosed) => {
                tracing::info!("console closed");
                console_closed = true;
                break Ok(());
            }
            Err(e) => break Err(e),
        }
    };

    // Best-effort: the console may already be gone.
    if let Err(e) = workflow.shutdown() {
        tracing::warn!(error = %e, "shutdown cleanup failed");
    }
    outcome?;

    let summary = RunSummary {
        sessions_completed: workflow.sessions_completed(),
        console_closed,
    };
    tracing::info!(sessions = summary.sessions_completed, "calibration loop end");
    Ok(summary)
}
