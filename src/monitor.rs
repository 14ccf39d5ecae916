//! Protocol property monitor.
//!
//! The monitor samples the two bus lines after every scheduler event and
//! evaluates three independent properties against a rolling history of one
//! sample per line:
//!
//! - **START**: data falls while the clock is held high and the bus is idle.
//! - **STOP**: data rises while the clock is held high after a full byte.
//! - **Data stability**: data must not change while the clock is high. Checked
//!   on every clock rising edge, and on any data edge inside a clock-high window
//!   that is not a START or STOP.
//!
//! START and STOP are observations: they are only reported when the transition
//! actually happens. Stability evaluations are reported every time they fire,
//! pass or violation. Outcomes are never errors; the caller decides what a
//! violation means.

use crate::driver::BITS_PER_FRAME;
use crate::signal::BusLevels;
use heapless::Vec;
use serde::{Deserialize, Serialize};

const MAX_OBSERVED_BYTES: usize = 16;
const MAX_LATCHED_BITS: usize = MAX_OBSERVED_BYTES * BITS_PER_FRAME;

pub const START_DETECTED: &str = "START condition detected";
pub const STOP_DETECTED: &str = "STOP condition detected";
pub const DATA_STABLE: &str = "Data stable during clock high";
pub const DATA_CHANGED: &str = "Data changed during clock high";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Property {
    Start,
    Stop,
    DataStability,
}

impl Property {
    pub fn name(self) -> &'static str {
        match self {
            Property::Start => "START",
            Property::Stop => "STOP",
            Property::DataStability => "DATA_STABILITY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Pass,
    Violation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyResult {
    pub property: Property,
    pub time: u64,
    pub outcome: Outcome,
    pub message: String,
}

impl PropertyResult {
    fn new(property: Property, time: u64, outcome: Outcome, message: &str) -> Self {
        Self {
            property,
            time,
            outcome,
            message: message.to_string(),
        }
    }

    pub fn is_violation(&self) -> bool {
        self.outcome == Outcome::Violation
    }
}

/// Previous value of one line and when it was sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineHistory {
    value: bool,
    sampled_at: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Frame {
    busy: bool,
    bits_latched: usize,
    shift: u8,
    // A bit was latched while data was moving; the byte is not reported
    corrupt: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MonitorStats {
    pub samples: u32,
    pub evaluations: u32,
    pub starts: u32,
    pub stops: u32,
    pub violations: u32,
    pub suppressed_by_reset: u32,
    pub corrupt_frames: u32,
}

#[derive(Debug, Clone)]
pub struct PropertyMonitor {
    clock: LineHistory,
    data: LineHistory,
    frame: Frame,
    results: std::vec::Vec<PropertyResult>,
    latched_bits: Vec<bool, MAX_LATCHED_BITS>,
    observed_bytes: Vec<u8, MAX_OBSERVED_BYTES>,
    stats: MonitorStats,
}

impl PropertyMonitor {
    pub fn new() -> Self {
        Self::with_initial_levels(BusLevels::IDLE)
    }

    pub fn with_initial_levels(levels: BusLevels) -> Self {
        Self {
            clock: LineHistory { value: levels.clock, sampled_at: 0 },
            data: LineHistory { value: levels.data, sampled_at: 0 },
            frame: Frame::default(),
            results: std::vec::Vec::new(),
            latched_bits: Vec::new(),
            observed_bytes: Vec::new(),
            stats: MonitorStats::default(),
        }
    }

    /// Observe the bus after the driver has applied its update for `time`.
    /// Returns the results appended by this sample.
    pub fn sample(&mut self, time: u64, levels: BusLevels, reset_asserted: bool) -> &[PropertyResult] {
        let first_new = self.results.len();
        self.stats.samples = self.stats.samples.saturating_add(1);

        if reset_asserted {
            // Properties are disabled while reset is held
            if self.frame.busy || levels != self.previous_levels() {
                self.stats.suppressed_by_reset = self.stats.suppressed_by_reset.saturating_add(1);
            }
            self.frame = Frame::default();
        } else {
            self.evaluate(time, levels);
        }

        self.clock = LineHistory { value: levels.clock, sampled_at: time };
        self.data = LineHistory { value: levels.data, sampled_at: time };

        &self.results[first_new..]
    }

    fn evaluate(&mut self, time: u64, levels: BusLevels) {
        let clock_rose = !self.clock.value && levels.clock;
        let clock_held_high = self.clock.value && levels.clock;
        let data_fell = self.data.value && !levels.data;
        let data_rose = !self.data.value && levels.data;

        if clock_rose {
            self.check_latch(time, levels.data);
        } else if clock_held_high {
            if data_fell && !self.frame.busy {
                self.frame = Frame { busy: true, ..Frame::default() };
                self.stats.starts = self.stats.starts.saturating_add(1);
                self.record(Property::Start, time, Outcome::Pass, START_DETECTED);
            } else if data_rose && self.frame.busy && self.frame.bits_latched >= BITS_PER_FRAME {
                self.frame = Frame::default();
                self.stats.stops = self.stats.stops.saturating_add(1);
                self.record(Property::Stop, time, Outcome::Pass, STOP_DETECTED);
            } else if data_fell || data_rose {
                self.record(Property::DataStability, time, Outcome::Violation, DATA_CHANGED);
            }
        }
    }

    fn check_latch(&mut self, time: u64, data: bool) {
        let stable = data == self.data.value;
        if stable {
            self.record(Property::DataStability, time, Outcome::Pass, DATA_STABLE);
        } else {
            self.record(Property::DataStability, time, Outcome::Violation, DATA_CHANGED);
        }

        if !self.frame.busy || self.frame.bits_latched >= BITS_PER_FRAME {
            return;
        }

        // The sampled level still occupies its bit cell so the frame stays aligned
        self.frame.shift = (self.frame.shift << 1) | u8::from(data);
        self.frame.bits_latched += 1;
        self.frame.corrupt |= !stable;
        if self.latched_bits.is_full() {
            self.latched_bits.remove(0);
        }
        let _ = self.latched_bits.push(data);

        if self.frame.bits_latched == BITS_PER_FRAME {
            if self.frame.corrupt {
                self.stats.corrupt_frames = self.stats.corrupt_frames.saturating_add(1);
                return;
            }
            if self.observed_bytes.is_full() {
                self.observed_bytes.remove(0);
            }
            let _ = self.observed_bytes.push(self.frame.shift);
        }
    }

    fn record(&mut self, property: Property, time: u64, outcome: Outcome, message: &str) {
        self.stats.evaluations = self.stats.evaluations.saturating_add(1);
        if outcome == Outcome::Violation {
            self.stats.violations = self.stats.violations.saturating_add(1);
        }
        self.results.push(PropertyResult::new(property, time, outcome, message));
    }

    fn previous_levels(&self) -> BusLevels {
        BusLevels {
            clock: self.clock.value,
            data: self.data.value,
        }
    }

    /// Append-only log of every evaluation so far, in time order.
    pub fn results(&self) -> &[PropertyResult] {
        &self.results
    }

    pub fn violations(&self) -> impl Iterator<Item = &PropertyResult> {
        self.results.iter().filter(|r| r.is_violation())
    }

    /// Bits latched on clock rising edges inside a frame, in bus order. Only
    /// the most recent bits are kept.
    pub fn latched_bits(&self) -> &[bool] {
        &self.latched_bits
    }

    /// Completed bytes seen on the bus, most recent last. A frame with a bit
    /// latched while data was changing yields no byte.
    pub fn observed_bytes(&self) -> &[u8] {
        &self.observed_bytes
    }

    pub fn bus_busy(&self) -> bool {
        self.frame.busy
    }

    pub fn last_sample_time(&self) -> u64 {
        self.data.sampled_at.max(self.clock.sampled_at)
    }

    pub fn get_stats(&self) -> &MonitorStats {
        &self.stats
    }

    pub fn into_results(self) -> std::vec::Vec<PropertyResult> {
        self.results
    }
}

impl Default for PropertyMonitor {
    fn default() -> Self {
        Self::new()
    }
}
