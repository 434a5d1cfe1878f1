mod common;

use common::{ScriptConsole, ScriptedBus};
use phcal_core::error::BuildError;
use phcal_core::{StabilityCfg, TimingCfg, Workflow, WorkflowState};
use rstest::rstest;

fn build_err(b: phcal_core::WorkflowBuilder) -> BuildError {
    let err = b.build().expect_err("build should fail");
    match err.downcast_ref::<BuildError>() {
        Some(e) => e.clone(),
        None => panic!("expected BuildError, got: {err:?}"),
    }
}

#[rstest]
fn missing_bus_yields_typed_build_error() {
    let err = build_err(Workflow::builder().with_console(ScriptConsole::new()));
    assert!(matches!(err, BuildError::MissingBus));
}

#[rstest]
fn missing_console_yields_typed_build_error() {
    let err = build_err(Workflow::builder().with_bus(ScriptedBus::new()));
    assert!(matches!(err, BuildError::MissingConsole));
}

#[rstest]
#[case::window_too_small(StabilityCfg { window: 1, ..StabilityCfg::default() }, "window")]
#[case::zero_threshold(StabilityCfg { threshold_ph: 0.0, ..StabilityCfg::default() }, "threshold_ph")]
#[case::nan_threshold(StabilityCfg { threshold_ph: f64::NAN, ..StabilityCfg::default() }, "threshold_ph")]
#[case::zero_required(StabilityCfg { required_windows: 0, ..StabilityCfg::default() }, "required_windows")]
#[case::single_repeat(StabilityCfg { repeat_count: 1, ..StabilityCfg::default() }, "repeat_count")]
fn invalid_stability_is_rejected(#[case] stability: StabilityCfg, #[case] field: &str) {
    let err = build_err(
        Workflow::builder()
            .with_bus(ScriptedBus::new())
            .with_console(ScriptConsole::new())
            .with_stability(stability),
    );
    match err {
        BuildError::InvalidConfig(msg) => assert!(msg.contains(field), "{msg}"),
        other => panic!("expected InvalidConfig, got {other:?}"),
    }
}

#[rstest]
#[case::zero_read_settle(TimingCfg { read_settle_ms: 0, ..TimingCfg::default() })]
#[case::timeout_shorter_than_read(TimingCfg { step_timeout_ms: 500, ..TimingCfg::default() })]
#[case::zero_idle_tick(TimingCfg { idle_tick_ms: 0, ..TimingCfg::default() })]
fn invalid_timing_is_rejected(#[case] timing: TimingCfg) {
    let err = build_err(
        Workflow::builder()
            .with_bus(ScriptedBus::new())
            .with_console(ScriptConsole::new())
            .with_timing(timing),
    );
    assert!(matches!(err, BuildError::InvalidConfig(_)));
}

#[test]
fn required_windows_override_is_validated_and_applied() {
    let err = build_err(
        Workflow::builder()
            .with_bus(ScriptedBus::new())
            .with_console(ScriptConsole::new())
            .with_required_windows(0),
    );
    assert!(matches!(err, BuildError::InvalidConfig(_)));

    let wf = Workflow::builder()
        .with_bus(ScriptedBus::new())
        .with_console(ScriptConsole::new())
        .with_required_windows(5)
        .build()
        .unwrap();
    assert_eq!(wf.stability().required_windows, 5);
    assert_eq!(wf.state(), WorkflowState::Idle);
}
