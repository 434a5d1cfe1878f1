//! Command execution: config mapping, backend assembly, and the four commands.

use std::io::{BufReader, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use eyre::WrapErr;
use phcal_core::error::Result as CoreResult;
use phcal_core::{
    ChannelConsole, Probe, StabilityCfg, StabilityStrategy, TimingCfg, Windowed, Workflow,
};
use phcal_traits::SensorBus;
use phcal_traits::clock::MonotonicClock;
use serde_json::json;

use crate::cli::ModeArg;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub type Backend = phcal_hardware::EzoI2c;
#[cfg(not(all(feature = "hardware", target_os = "linux")))]
pub type Backend = phcal_hardware::SimulatedProbe;

/// Open the configured transport. Without the `hardware` feature this is the
/// simulated circuit; `PHCAL_TEST_SIM_FAIL=1` makes it fail every request.
pub fn open_backend(cfg: &phcal_config::Config) -> eyre::Result<Backend> {
    #[cfg(all(feature = "hardware", target_os = "linux"))]
    {
        let bus = phcal_hardware::EzoI2c::new(cfg.bus.i2c_bus, cfg.bus.address)
            .wrap_err("open EZO pH circuit")?;
        tracing::info!(
            i2c_bus = cfg.bus.i2c_bus,
            address = cfg.bus.address,
            "EZO pH circuit opened"
        );
        Ok(bus)
    }
    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    {
        let _ = cfg;
        if std::env::var("PHCAL_TEST_SIM_FAIL").is_ok_and(|v| v == "1") {
            tracing::warn!("simulated probe forced to fail");
            return Ok(phcal_hardware::SimulatedProbe::failing());
        }
        tracing::info!("using simulated pH circuit");
        Ok(phcal_hardware::SimulatedProbe::new())
    }
}

fn probe(bus: impl SensorBus + 'static, timing: &TimingCfg) -> Probe {
    Probe::new(Box::new(bus), Arc::new(MonotonicClock::new()), timing)
}

fn print_line(text: &str) -> eyre::Result<()> {
    let mut out = std::io::stdout().lock();
    writeln!(out, "{text}").wrap_err("write to stdout")?;
    Ok(())
}

/// Interactive calibration loop on stdin/stdout.
pub fn run_interactive(
    cfg: &phcal_config::Config,
    mode: Option<ModeArg>,
    stable_windows: Option<u32>,
    bus: impl SensorBus + 'static,
    shutdown: &AtomicBool,
    json: bool,
) -> CoreResult<()> {
    let mut stability = StabilityCfg::from(&cfg.stability);
    if let Some(m) = mode {
        stability.mode = m.into();
    }
    let timing = TimingCfg::from(&cfg.timing);

    let console = ChannelConsole::spawn(BufReader::new(std::io::stdin()), std::io::stdout());
    let mut builder = Workflow::builder()
        .with_bus(bus)
        .with_console(console)
        .with_stability(stability)
        .with_timing(timing);
    if let Some(n) = stable_windows {
        builder = builder.with_required_windows(n);
    }
    let mut workflow = builder.build()?;

    let summary = phcal_core::run(&mut workflow, shutdown)?;
    tracing::info!(
        sessions = summary.sessions_completed,
        console_closed = summary.console_closed,
        "run finished"
    );
    if json {
        print_line(
            &json!({
                "sessions_completed": summary.sessions_completed,
                "console_closed": summary.console_closed,
            })
            .to_string(),
        )?;
    }
    Ok(())
}

/// `Cal,?` and `Slope,?`.
pub fn status(
    cfg: &phcal_config::Config,
    bus: impl SensorBus + 'static,
    json: bool,
) -> CoreResult<()> {
    let mut probe = probe(bus, &TimingCfg::from(&cfg.timing));
    let points = probe.calibration_status()?;
    let slope = probe.slope()?;
    tracing::info!(points, slope = %slope, "status");
    if json {
        print_line(
            &json!({
                "calibrated": points > 0,
                "points": points,
                "slope": slope,
            })
            .to_string(),
        )
    } else {
        if points == 0 {
            print_line("Calibration: none")?;
        } else {
            print_line(&format!("Calibration: {points} point(s)"))?;
        }
        print_line(&format!("Slope: {slope}"))
    }
}

/// Sample `windows` full windows and report each one. Calibration is never touched.
pub fn check(
    cfg: &phcal_config::Config,
    windows: u32,
    bus: impl SensorBus + 'static,
    shutdown: &AtomicBool,
    json: bool,
) -> CoreResult<()> {
    let stability = StabilityCfg::from(&cfg.stability);
    let mut probe = probe(bus, &TimingCfg::from(&cfg.timing));
    let mut detector = Windowed::new(
        stability.window,
        stability.threshold_ph,
        stability.required_windows,
    );

    let mut reported = 0u32;
    let mut reads = 0usize;
    while reported < windows {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!(reported, "check interrupted");
            break;
        }
        let ph = probe.read_ph()?;
        detector.update(ph);
        reads += 1;
        // The detector evaluates on every full, non-overlapping window.
        if reads % stability.window != 0 {
            continue;
        }
        let Some(w) = detector.last_window() else {
            continue;
        };
        reported += 1;
        let line = if json {
            json!({
                "window": reported,
                "mean": w.mean,
                "stddev": w.stddev,
                "stable": w.stable,
                "stable_windows": detector.count(),
            })
            .to_string()
        } else {
            format!(
                "window {reported}: mean {:.3} pH, stddev {:.4} pH, {} ({}/{} stable)",
                w.mean,
                w.stddev,
                if w.stable { "stable" } else { "unstable" },
                detector.count(),
                detector.required()
            )
        };
        print_line(&line)?;
    }
    Ok(())
}

/// Ask the circuit to identify itself.
pub fn self_check(
    cfg: &phcal_config::Config,
    bus: impl SensorBus + 'static,
    json: bool,
) -> CoreResult<()> {
    let mut probe = probe(bus, &TimingCfg::from(&cfg.timing));
    let info = probe.info()?;
    tracing::info!(device = %info, "self-check ok");
    if json {
        print_line(&json!({ "ok": true, "device": info }).to_string())
    } else {
        print_line(&format!("OK: {info}"))
    }
}
