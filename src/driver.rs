use crate::signal::{BusLevels, Edge, Signal, SignalId, TimingEvent};
use heapless::Vec;
use serde::{Deserialize, Serialize};
use static_assertions::const_assert_eq;

pub const BITS_PER_FRAME: usize = 8;
const MSB_INDEX: u8 = (BITS_PER_FRAME - 1) as u8;

// A micro-step touches at most the clock and the data line
pub const MAX_TRANSITIONS_PER_STEP: usize = 2;

const_assert_eq!(BITS_PER_FRAME, u8::BITS as usize);

pub type Transitions = Vec<TimingEvent, MAX_TRANSITIONS_PER_STEP>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BitPhase {
    /// Clock low, data being placed on the line
    Setup,
    /// Clock high, data latched
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferState {
    Idle,
    Start,
    /// Bit cell for payload bit `index`, counting down from 7 (MSB first)
    BitCell { index: u8, phase: BitPhase },
    /// Stop sequence: data pulled low with the clock low (setup), clock released
    /// high (hold), then data released high, which returns the bus to idle
    Stop(BitPhase),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DriverStats {
    pub steps: u32,
    pub resets: u32,
    pub transfers_started: u32,
    pub transfers_completed: u32,
    pub transfers_aborted: u32,
}

/// Bus master driving one transfer of a fixed payload.
///
/// The driver advances exactly one micro-step per rising edge of the time
/// source and owns the clock and data lines. Every step is an instantaneous
/// assignment; the time between steps is whatever the scheduler decides.
#[derive(Debug, Clone)]
pub struct BusDriver {
    payload: u8,
    state: TransferState,
    clock: Signal,
    data: Signal,
    // Cleared when a transfer starts, set again by reset
    armed: bool,
    stats: DriverStats,
}

impl BusDriver {
    pub fn new(payload: u8) -> Self {
        Self {
            payload,
            state: TransferState::Idle,
            clock: Signal::new(SignalId::Clock, true),
            data: Signal::new(SignalId::Data, true),
            armed: true,
            stats: DriverStats::default(),
        }
    }

    /// Force both lines high and return to `Idle`. Idempotent.
    pub fn reset(&mut self, time: u64) -> Transitions {
        let mut out = Transitions::new();

        if self.in_transfer() {
            self.stats.transfers_aborted = self.stats.transfers_aborted.saturating_add(1);
        }

        self.drive_clock(true, time, &mut out);
        self.drive_data(true, time, &mut out);
        self.state = TransferState::Idle;
        self.armed = true;
        self.stats.resets = self.stats.resets.saturating_add(1);

        out
    }

    /// Sole driving input. Only rising edges of the time source advance the
    /// state machine; a held reset takes priority over the transfer.
    pub fn on_clock_edge(&mut self, edge: Edge, time: u64, reset_asserted: bool) -> Transitions {
        if edge != Edge::Rising {
            return Transitions::new();
        }

        if reset_asserted {
            return self.reset(time);
        }

        let mut out = Transitions::new();
        self.step(time, &mut out);
        out
    }

    fn step(&mut self, time: u64, out: &mut Transitions) {
        let next = match self.state {
            TransferState::Idle => {
                if !self.armed {
                    return;
                }
                self.armed = false;
                self.stats.transfers_started = self.stats.transfers_started.saturating_add(1);
                // Falling data with the clock high is the START condition
                self.drive_data(false, time, out);
                TransferState::Start
            }
            TransferState::Start => self.begin_bit(MSB_INDEX, time, out),
            TransferState::BitCell { index, phase: BitPhase::Setup } => {
                self.drive_clock(true, time, out);
                TransferState::BitCell { index, phase: BitPhase::Hold }
            }
            TransferState::BitCell { index: 0, phase: BitPhase::Hold } => {
                self.drive_clock(false, time, out);
                self.drive_data(false, time, out);
                TransferState::Stop(BitPhase::Setup)
            }
            TransferState::BitCell { index, phase: BitPhase::Hold } => {
                self.begin_bit(index - 1, time, out)
            }
            TransferState::Stop(BitPhase::Setup) => {
                self.drive_clock(true, time, out);
                TransferState::Stop(BitPhase::Hold)
            }
            TransferState::Stop(BitPhase::Hold) => {
                // Rising data with the clock high is the STOP condition
                self.drive_data(true, time, out);
                self.stats.transfers_completed = self.stats.transfers_completed.saturating_add(1);
                TransferState::Idle
            }
        };

        self.state = next;
        self.stats.steps = self.stats.steps.saturating_add(1);
    }

    fn begin_bit(&mut self, index: u8, time: u64, out: &mut Transitions) -> TransferState {
        // Clock goes low before the data changes
        self.drive_clock(false, time, out);
        self.drive_data(self.bit(index), time, out);
        TransferState::BitCell { index, phase: BitPhase::Setup }
    }

    fn drive_clock(&mut self, level: bool, time: u64, out: &mut Transitions) {
        if let Some(event) = self.clock.set(level, time) {
            let _ = out.push(event);
        }
    }

    fn drive_data(&mut self, level: bool, time: u64, out: &mut Transitions) {
        if let Some(event) = self.data.set(level, time) {
            let _ = out.push(event);
        }
    }

    /// Override the data line from outside the state machine (fault injection).
    /// The next driver step drives the line again as usual.
    pub fn force_data(&mut self, level: bool, time: u64) -> Option<TimingEvent> {
        self.data.set(level, time)
    }

    pub fn bit(&self, index: u8) -> bool {
        debug_assert!(index <= MSB_INDEX, "bit index {} out of range", index);
        (self.payload >> index) & 1 == 1
    }

    pub fn in_transfer(&self) -> bool {
        self.state != TransferState::Idle
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    pub fn payload(&self) -> u8 {
        self.payload
    }

    pub fn levels(&self) -> BusLevels {
        BusLevels {
            clock: self.clock.value(),
            data: self.data.value(),
        }
    }

    pub fn clock_line(&self) -> &Signal {
        &self.clock
    }

    pub fn data_line(&self) -> &Signal {
        &self.data
    }

    pub fn get_stats(&self) -> &DriverStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_steps(driver: &mut BusDriver, now: &mut u64, steps: u64) {
        for _ in 0..steps {
            *now += 10;
            driver.on_clock_edge(Edge::Rising, *now, false);
        }
    }

    #[test]
    fn test_driver_starts_idle_with_lines_released() {
        let driver = BusDriver::new(0xA5);
        assert_eq!(driver.state(), TransferState::Idle);
        assert_eq!(driver.levels(), BusLevels::IDLE);
    }

    #[test]
    fn test_start_pulls_data_low_with_clock_high() {
        let mut driver = BusDriver::new(0xA5);
        let transitions = driver.on_clock_edge(Edge::Rising, 10, false);

        assert_eq!(driver.state(), TransferState::Start);
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].signal, SignalId::Data);
        assert_eq!(transitions[0].edge, Edge::Falling);
        assert!(driver.levels().clock);
    }

    #[test]
    fn test_falling_edges_do_not_advance() {
        let mut driver = BusDriver::new(0xA5);
        let transitions = driver.on_clock_edge(Edge::Falling, 10, false);
        assert!(transitions.is_empty());
        assert_eq!(driver.state(), TransferState::Idle);
    }

    #[test]
    fn test_bit_cells_msb_first() {
        let mut driver = BusDriver::new(0xA5);
        let mut now = 0;
        run_steps(&mut driver, &mut now, 2);

        // Setup of bit 7 pulls the clock low and places a 1
        assert_eq!(driver.state(), TransferState::BitCell { index: 7, phase: BitPhase::Setup });
        assert_eq!(driver.levels(), BusLevels { clock: false, data: true });

        run_steps(&mut driver, &mut now, 1);
        assert_eq!(driver.state(), TransferState::BitCell { index: 7, phase: BitPhase::Hold });
        assert!(driver.levels().clock);
    }

    #[test]
    fn test_full_transfer_returns_to_idle_once() {
        let mut driver = BusDriver::new(0x3C);
        let mut now = 0;
        // start + 16 bit steps + 3 stop steps
        run_steps(&mut driver, &mut now, 20);

        assert_eq!(driver.state(), TransferState::Idle);
        assert_eq!(driver.levels(), BusLevels::IDLE);
        assert_eq!(driver.get_stats().transfers_completed, 1);

        // Not re-armed without a reset
        run_steps(&mut driver, &mut now, 5);
        assert_eq!(driver.state(), TransferState::Idle);
        assert_eq!(driver.get_stats().transfers_started, 1);
    }

    #[test]
    fn test_reset_aborts_transfer() {
        let mut driver = BusDriver::new(0x00);
        let mut now = 0;
        run_steps(&mut driver, &mut now, 4);
        assert!(driver.in_transfer());

        driver.on_clock_edge(Edge::Rising, now + 10, true);
        assert_eq!(driver.state(), TransferState::Idle);
        assert_eq!(driver.levels(), BusLevels::IDLE);
        assert_eq!(driver.get_stats().transfers_aborted, 1);
    }

    #[test]
    fn test_force_data_is_overwritten_by_next_step() {
        let mut driver = BusDriver::new(0xFF);
        let mut now = 0;
        run_steps(&mut driver, &mut now, 3); // bit 7 hold, data high

        assert!(driver.force_data(false, now + 2).is_some());
        assert!(!driver.levels().data);

        run_steps(&mut driver, &mut now, 1); // bit 6 setup
        assert!(driver.levels().data);
    }
}
