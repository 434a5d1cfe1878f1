use phcal_hardware::SimulatedProbe;
use phcal_traits::SensorBus;
use rstest::rstest;

fn query(p: &mut SimulatedProbe, cmd: &str) -> Result<String, String> {
    p.write(cmd).map_err(|e| e.to_string())?;
    p.read_response().map_err(|e| e.to_string())
}

#[rstest]
#[case("i", "?i,pH,2.16")]
#[case("Cal,?", "?CAL,0")]
#[case("Slope,?", "?Slope,100.0,100.0,0.00")]
#[case("Cal,clear", "")]
fn fresh_probe_answers(#[case] cmd: &str, #[case] expected: &str) {
    let mut p = SimulatedProbe::new();
    assert_eq!(query(&mut p, cmd).unwrap(), expected);
}

#[test]
fn calibrated_probe_reports_prior_calibration() {
    let mut p = SimulatedProbe::calibrated();
    assert_eq!(query(&mut p, "Cal,?").unwrap(), "?CAL,3");
    assert_eq!(query(&mut p, "Slope,?").unwrap(), "?Slope,99.7,100.3,-0.89");
}

#[test]
fn readings_are_two_decimal_ph_values() {
    let mut p = SimulatedProbe::new();
    for _ in 0..10 {
        let r = query(&mut p, "R").unwrap();
        let (_, frac) = r.split_once('.').expect("decimal point");
        assert_eq!(frac.len(), 2, "reading {r}");
        let v: f64 = r.parse().unwrap();
        assert!((5.0..=9.0).contains(&v), "reading {v}");
    }
}

#[test]
fn failing_probe_reports_bus_error() {
    let mut p = SimulatedProbe::failing();
    let err = query(&mut p, "R").unwrap_err();
    assert!(err.contains("simulated bus failure"));
}
