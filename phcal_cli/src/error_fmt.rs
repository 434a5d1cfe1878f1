//! Human-readable error descriptions and structured JSON error formatting.

use phcal_core::error::{BuildError, CalError};
use phcal_hardware::error::HwError;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingBus => {
                "What happened: No sensor bus was provided to the calibration workflow.\nLikely causes: The pH circuit failed to open or was not passed to the builder.\nHow to fix: Ensure the transport is created successfully and passed via with_bus(...).".to_string()
            }
            BuildError::MissingConsole => {
                "What happened: No operator console was provided to the calibration workflow.\nLikely causes: The console was not passed to the builder.\nHow to fix: Pass a console via with_console(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML or on the command line.\nHow to fix: Edit the config file or the flag, then rerun."
            ),
        };
    }

    if let Some(ce) = err.downcast_ref::<CalError>() {
        return match ce {
            CalError::Transport { command, message } => format!(
                "What happened: Talking to the pH circuit failed while sending '{command}' ({message}).\nLikely causes: Wrong I2C bus or address, loose wiring, or the circuit is in UART mode.\nHow to fix: Check [bus] in the config and the wiring, then run `phcal self-check`."
            ),
            CalError::InvalidResponse { command, response } => format!(
                "What happened: The pH circuit answered '{command}' with something unexpected ({response:?}).\nLikely causes: Electrical noise, another device at the same address, or a probe out of solution.\nHow to fix: Make sure the probe is immersed and no other device shares the address."
            ),
            CalError::Rejected { command, response } => format!(
                "What happened: The pH circuit rejected '{command}' ({response}).\nLikely causes: Firmware that does not support the command.\nHow to fix: Check the circuit firmware version with `phcal self-check`."
            ),
            CalError::Timeout { point, elapsed_ms } => format!(
                "What happened: The {point} did not stabilize within {elapsed_ms} ms.\nLikely causes: Probe not fully immersed, contaminated buffer, or an aging probe.\nHow to fix: Rinse the probe, use fresh buffer, or raise timing.step_timeout_ms."
            ),
            CalError::Console(_) | CalError::ConsoleClosed => format!(
                "What happened: {ce}.\nLikely causes: The operator terminal went away.\nHow to fix: Rerun `phcal run` from an interactive terminal."
            ),
        };
    }

    if let Some(he) = err.downcast_ref::<HwError>() {
        return format!(
            "What happened: pH circuit error: {he}.\nLikely causes: Missing I2C permissions, wrong bus number, or no device at the address.\nHow to fix: Check [bus] in the config and that the process may open /dev/i2c-N."
        );
    }

    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("invalid configuration")
        || lower.contains("read config")
        || lower.starts_with("stability.")
        || lower.starts_with("timing.")
        || lower.starts_with("bus.")
        || lower.starts_with("logging.")
    {
        return format!(
            "What happened: Configuration is invalid or unreadable ({msg}).\nLikely causes: A typo in the TOML, an unknown stability mode, or out-of-range values.\nHow to fix: Edit the TOML config and try again."
        );
    }

    if lower.contains("open ezo") {
        return "What happened: Failed to open the pH circuit.\nLikely causes: Wrong I2C bus number or insufficient permissions.\nHow to fix: Fix [bus] in the config; add the user to the i2c group.".to_string();
    }

    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

fn is_config_error(err: &eyre::Report) -> bool {
    if matches!(err.downcast_ref::<BuildError>(), Some(BuildError::InvalidConfig(_))) {
        return true;
    }
    let lower = err.to_string().to_ascii_lowercase();
    lower.contains("invalid configuration")
        || lower.contains("read config")
        || ["stability.", "timing.", "bus.", "logging."]
            .iter()
            .any(|p| lower.starts_with(p))
}

/// Stable exit codes: 3 device/transport, 4 stabilization timeout, 5 configuration, 1 anything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(ce) = err.downcast_ref::<CalError>() {
        match ce {
            CalError::Transport { .. }
            | CalError::InvalidResponse { .. }
            | CalError::Rejected { .. } => return 3,
            CalError::Timeout { .. } => return 4,
            CalError::Console(_) | CalError::ConsoleClosed => return 1,
        }
    }
    if err.downcast_ref::<HwError>().is_some() {
        return 3;
    }
    if is_config_error(err) {
        return 5;
    }
    1
}

/// Stable machine-readable name for the error class.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(ce) = err.downcast_ref::<CalError>() {
        return match ce {
            CalError::Transport { .. } => "Transport",
            CalError::InvalidResponse { .. } => "InvalidResponse",
            CalError::Rejected { .. } => "Rejected",
            CalError::Timeout { .. } => "Timeout",
            CalError::Console(_) | CalError::ConsoleClosed => "Console",
        };
    }
    if err.downcast_ref::<HwError>().is_some() {
        return "Hardware";
    }
    if is_config_error(err) {
        return "Config";
    }
    "Error"
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let reason = reason_name(err);
    match err.downcast_ref::<CalError>() {
        Some(CalError::Timeout { point, elapsed_ms }) => json!({
            "reason": reason,
            "details": { "point": point.label(), "elapsed_ms": elapsed_ms },
            "message": humanize(err),
        })
        .to_string(),
        _ => json!({ "reason": reason, "message": humanize(err) }).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phcal_core::CalPoint;

    #[test]
    fn transport_maps_to_device_exit_code() {
        let err = eyre::Report::new(CalError::Transport {
            command: "R".into(),
            message: "nack".into(),
        });
        assert_eq!(exit_code_for_error(&err), 3);
        assert!(humanize(&err).contains("sending 'R'"));
    }

    #[test]
    fn timeout_json_carries_point() {
        let err = eyre::Report::new(CalError::Timeout {
            point: CalPoint::Low,
            elapsed_ms: 1200,
        });
        assert_eq!(exit_code_for_error(&err), 4);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Timeout");
        assert_eq!(v["details"]["elapsed_ms"], 1200);
    }

    #[test]
    fn config_strings_map_to_config_exit_code() {
        let err = eyre::eyre!("stability.window must be >= 2");
        assert_eq!(exit_code_for_error(&err), 5);
        assert_eq!(reason_name(&err), "Config");
    }

    #[test]
    fn invalid_builder_config_maps_to_config_exit_code() {
        let err = eyre::Report::new(BuildError::InvalidConfig("stability.window must be >= 2"));
        assert_eq!(exit_code_for_error(&err), 5);
        assert_eq!(reason_name(&err), "Config");
        assert!(humanize(&err).contains("Invalid configuration (stability.window"));
    }

    #[test]
    fn unknown_errors_are_generic() {
        let err = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&err), 1);
        assert!(humanize(&err).starts_with("Something went wrong."));
    }
}
