#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core pH calibration logic (hardware-agnostic).
//!
//! All device traffic goes through `phcal_traits::SensorBus` and all operator
//! interaction through `phcal_traits::Console`; time comes from an injected
//! `phcal_traits::Clock`.
//!
//! ## Architecture
//!
//! - **Statistics**: fixed-capacity reading window, mean and population stddev (`stats`)
//! - **Stability**: exact-repeat and windowed detectors behind one trait (`stability`)
//! - **Probe**: command layer with settle delays and response validation (`probe`)
//! - **Step**: one calibration point, confirm → poll → calibrate (`step`)
//! - **Workflow**: IDLE → CHECKING_PRIOR → MID → LOW → HIGH → REPORTING (`workflow`)
//! - **Runner**: tick loop with cooperative shutdown (`runner`)

pub mod builder;
pub mod command;
pub mod config;
pub mod console;
pub mod conversions;
pub mod error;
pub mod point;
pub mod probe;
pub mod runner;
pub mod session;
pub mod stability;
pub mod stats;
pub mod status;
pub mod step;
pub mod workflow;

pub use builder::WorkflowBuilder;
pub use command::{CommandError, OperatorCommand};
pub use config::{StabilityCfg, StabilityMode, TimingCfg};
pub use console::{ChannelConsole, ConsoleClosed};
pub use error::{BuildError, CalError};
pub use point::CalPoint;
pub use probe::Probe;
pub use runner::{RunSummary, run};
pub use session::{CalibrationSession, WorkflowState};
pub use stability::{ExactRepeat, StabilityStrategy, Verdict, WindowStats, Windowed};
pub use stats::StatsWindow;
pub use status::StepStatus;
pub use step::CalibrationStep;
pub use workflow::{Activity, Workflow};
