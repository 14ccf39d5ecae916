use i2cbus::monitor::DATA_CHANGED;
use i2cbus::*;

fn run_with_glitches(glitches: Vec<Glitch>) -> SimulationReport {
    let mut config = SimConfig::default();
    config.glitches.scheduled = glitches;
    simulate(config).unwrap()
}

#[test]
fn test_glitch_during_clock_high_is_one_violation() {
    // Bit 7 is held between the clock rise at 20 and the next setup at 25
    let report = run_with_glitches(vec![Glitch::toggle(22)]);

    let violations: Vec<_> = report.violations().collect();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].time, 22);
    assert_eq!(violations[0].property, Property::DataStability);
    assert_eq!(violations[0].message, DATA_CHANGED);
    assert!(!report.is_clean());

    // The run continues: the byte was latched before the glitch and the transfer still completes
    assert_eq!(report.observed_bytes, vec![0xA5]);
    assert_eq!(report.summary.stops, 1);
    assert_eq!(report.summary.glitches_injected, 1);
    assert_eq!(report.completed_at, 200);
}

#[test]
fn test_glitch_between_start_and_first_bit() {
    // Clock still high and data low right after the START
    let report = run_with_glitches(vec![Glitch::toggle(12)]);

    let violations: Vec<_> = report.violations().collect();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].time, 12);
    assert_eq!(report.summary.starts, 1);
}

#[test]
fn test_glitch_coincident_with_clock_rise() {
    // Driver raises the clock at 30, the glitch flips data on the same instant
    let report = run_with_glitches(vec![Glitch::toggle(30)]);

    let violations: Vec<_> = report.violations().collect();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].time, 30);

    // Bit 6 is latched with the glitched level and the frame stays aligned:
    // the stop-phase rise at 100 is not taken as a ninth bit
    assert_eq!(
        report.latched_bits,
        vec![true, true, true, false, false, true, false, true]
    );
    let stability_passes: Vec<u64> = report
        .results
        .iter()
        .filter(|r| r.property == Property::DataStability && r.outcome == Outcome::Pass)
        .map(|r| r.time)
        .collect();
    assert_eq!(stability_passes, vec![20, 40, 50, 60, 70, 80, 90, 100]);

    // A byte with a corrupted bit is never reported as seen on the bus
    assert!(report.observed_bytes.is_empty());
    assert_eq!(report.summary.stops, 1);
    assert_eq!(report.completed_at, 200);
}

#[test]
fn test_glitch_during_stop_hold_reads_as_early_stop() {
    // Clock high and data low after the stop-phase rise at 100: a rising
    // data edge here is a STOP on the wire, whoever drives it
    let report = run_with_glitches(vec![Glitch::toggle(102)]);

    assert!(report.is_clean());
    let stops: Vec<u64> = report
        .results
        .iter()
        .filter(|r| r.property == Property::Stop)
        .map(|r| r.time)
        .collect();
    assert_eq!(stops, vec![102]);
    assert_eq!(report.observed_bytes, vec![0xA5]);
    assert_eq!(report.summary.glitches_injected, 1);
    assert_eq!(report.summary.transfers_completed, 1);
}

#[test]
fn test_glitch_while_clock_low_is_not_a_violation() {
    // Setup phase of bit 7: the line may change, the corrupted value is latched at 20
    let report = run_with_glitches(vec![Glitch::toggle(17)]);

    assert!(report.is_clean());
    assert_eq!(report.observed_bytes, vec![0x25]);
    assert_eq!(report.summary.stops, 1);
}

#[test]
fn test_glitch_on_idle_bus_reads_as_start() {
    // After the STOP the bus is idle with both lines high
    let report = run_with_glitches(vec![Glitch::new(150, GlitchKind::ForceLow)]);

    assert!(report.is_clean());
    assert_eq!(report.summary.starts, 2);
    let starts: Vec<u64> = report
        .results
        .iter()
        .filter(|r| r.property == Property::Start)
        .map(|r| r.time)
        .collect();
    assert_eq!(starts, vec![10, 150]);
}

#[test]
fn test_forcing_current_level_has_no_effect() {
    // Data is already high during the bit 7 hold
    let report = run_with_glitches(vec![Glitch::new(22, GlitchKind::ForceHigh)]);

    assert!(report.is_clean());
    assert_eq!(report.summary.glitches_injected, 0);
    assert_eq!(report.results, simulate(SimConfig::default()).unwrap().results);
}

#[test]
fn test_each_glitch_reported_at_its_own_time() {
    let report = run_with_glitches(vec![Glitch::toggle(22), Glitch::toggle(42)]);

    let times: Vec<u64> = report.violations().map(|v| v.time).collect();
    assert_eq!(times, vec![22, 42]);
}

#[test]
fn test_random_glitches_are_deterministic() {
    let mut config = SimConfig::default();
    config.glitches.random_count = 8;
    config.glitches.seed = 7;

    let first = simulate(config.clone()).unwrap();
    let second = simulate(config).unwrap();

    assert_eq!(
        first.results_to_json_lines().unwrap(),
        second.results_to_json_lines().unwrap()
    );
    assert_eq!(first.summary, second.summary);
    assert_eq!(first.completed_at, 200);
}

#[test]
fn test_glitch_outside_run_is_a_configuration_error() {
    let mut config = SimConfig::default();
    config.glitches.scheduled.push(Glitch::toggle(200));

    assert!(matches!(
        simulate(config),
        Err(ConfigError::GlitchOutsideRun { time: 200, duration: 200 })
    ));
}
