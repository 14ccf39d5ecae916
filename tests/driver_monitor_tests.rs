use i2cbus::*;

/// Drive `steps` rising edges ten units apart, sampling the monitor after each.
fn step_and_sample(driver: &mut BusDriver, monitor: &mut PropertyMonitor, now: &mut u64, steps: usize) {
    for _ in 0..steps {
        *now += 10;
        driver.on_clock_edge(Edge::Rising, *now, false);
        monitor.sample(*now, driver.levels(), false);
    }
}

#[test]
fn test_reset_is_idempotent_from_every_state() {
    // 20 micro-steps cover every reachable state of one transfer
    for steps in 0..=20 {
        let mut driver = BusDriver::new(0xA5);
        let mut now = 0;
        for _ in 0..steps {
            now += 10;
            driver.on_clock_edge(Edge::Rising, now, false);
        }

        driver.reset(now + 1);
        assert_eq!(driver.state(), TransferState::Idle, "after {} steps", steps);
        assert_eq!(driver.levels(), BusLevels::IDLE, "after {} steps", steps);

        let transitions = driver.reset(now + 2);
        assert!(transitions.is_empty());
        assert_eq!(driver.state(), TransferState::Idle);
        assert_eq!(driver.levels(), BusLevels::IDLE);
    }
}

#[test]
fn test_state_sequence_for_one_transfer() {
    let mut driver = BusDriver::new(0x81);
    let mut states = vec![driver.state()];
    for n in 1..=20 {
        driver.on_clock_edge(Edge::Rising, n * 10, false);
        states.push(driver.state());
    }

    assert_eq!(states[1], TransferState::Start);
    assert_eq!(states[2], TransferState::BitCell { index: 7, phase: BitPhase::Setup });
    assert_eq!(states[3], TransferState::BitCell { index: 7, phase: BitPhase::Hold });
    assert_eq!(states[16], TransferState::BitCell { index: 0, phase: BitPhase::Setup });
    assert_eq!(states[17], TransferState::BitCell { index: 0, phase: BitPhase::Hold });
    assert_eq!(states[18], TransferState::Stop(BitPhase::Setup));
    assert_eq!(states[19], TransferState::Stop(BitPhase::Hold));
    assert_eq!(states[20], TransferState::Idle);
}

#[test]
fn test_held_reset_keeps_driver_idle() {
    let mut driver = BusDriver::new(0xFF);
    for n in 1..=5 {
        let transitions = driver.on_clock_edge(Edge::Rising, n * 10, true);
        assert!(transitions.is_empty());
        assert_eq!(driver.state(), TransferState::Idle);
    }
    assert_eq!(driver.get_stats().transfers_started, 0);
}

#[test]
fn test_driver_output_never_violates_stability() {
    for payload in [0x00, 0xFF, 0xA5, 0x5A, 0x01, 0x80] {
        let mut driver = BusDriver::new(payload);
        let mut monitor = PropertyMonitor::new();
        let mut now = 0;
        step_and_sample(&mut driver, &mut monitor, &mut now, 25);

        assert_eq!(monitor.violations().count(), 0, "payload 0x{:02X}", payload);
        assert_eq!(monitor.observed_bytes(), &[payload]);
        assert_eq!(monitor.get_stats().starts, 1);
        assert_eq!(monitor.get_stats().stops, 1);
    }
}

#[test]
fn test_reset_mid_transfer_restarts_cleanly() {
    let mut driver = BusDriver::new(0xA5);
    let mut monitor = PropertyMonitor::new();
    let mut now = 0;

    // START, bit 7, bit 6, then setup of bit 5
    step_and_sample(&mut driver, &mut monitor, &mut now, 6);
    assert!(monitor.bus_busy());

    now += 10;
    driver.on_clock_edge(Edge::Rising, now, true);
    let new = monitor.sample(now, driver.levels(), true);
    assert!(new.is_empty());
    assert!(!monitor.bus_busy());
    assert_eq!(driver.get_stats().transfers_aborted, 1);

    // Re-armed by the reset: a complete second transfer follows
    step_and_sample(&mut driver, &mut monitor, &mut now, 20);

    assert_eq!(monitor.violations().count(), 0);
    assert_eq!(monitor.get_stats().starts, 2);
    assert_eq!(monitor.get_stats().stops, 1);
    assert_eq!(monitor.observed_bytes(), &[0xA5]);
    assert_eq!(monitor.latched_bits().len(), 10);
}

#[test]
fn test_monitor_keeps_only_last_sample() {
    let mut driver = BusDriver::new(0xA5);
    let mut monitor = PropertyMonitor::new();
    let mut now = 0;
    step_and_sample(&mut driver, &mut monitor, &mut now, 3);

    assert_eq!(monitor.last_sample_time(), 30);
    assert_eq!(monitor.get_stats().samples, 3);
}

#[test]
fn test_results_are_appended_never_rewritten() {
    let mut driver = BusDriver::new(0xA5);
    let mut monitor = PropertyMonitor::new();
    let mut now = 0;

    step_and_sample(&mut driver, &mut monitor, &mut now, 5);
    let early: Vec<PropertyResult> = monitor.results().to_vec();

    step_and_sample(&mut driver, &mut monitor, &mut now, 15);
    assert!(monitor.results().len() > early.len());
    assert_eq!(&monitor.results()[..early.len()], early.as_slice());
}
