use crate::config::{ConfigError, SimConfig};
use crate::signal::{Edge, SignalId, TimingEvent};
use serde::{Deserialize, Serialize};

// A half period below one time unit would put rising and falling edges on the same instant
pub const MIN_CLOCK_PERIOD: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResetStage {
    Assert,
    Release,
    Done,
}

/// Periodic time source plus the one-shot reset pulse.
///
/// Rising edges fall on `k * period`, falling edges half a period later.
/// Reset is asserted at 0 and released after `reset_pulse_width`. At equal
/// timestamps the reset event comes first, so a clock edge always sees the
/// reset level that is valid at that instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scheduler {
    period: u64,
    duration: u64,
    reset_pulse_width: u64,
}

impl Scheduler {
    pub fn new(duration: u64, period: u64, reset_pulse_width: u64) -> Result<Self, ConfigError> {
        if period < MIN_CLOCK_PERIOD {
            return Err(ConfigError::ClockPeriodTooShort { period, min: MIN_CLOCK_PERIOD });
        }
        if duration == 0 {
            return Err(ConfigError::ZeroDuration);
        }
        if reset_pulse_width == 0 {
            return Err(ConfigError::ZeroResetPulseWidth);
        }

        Ok(Self {
            period,
            duration,
            reset_pulse_width,
        })
    }

    pub fn from_config(config: &SimConfig) -> Result<Self, ConfigError> {
        Self::new(
            config.simulation_duration,
            config.clock_period,
            config.reset_pulse_width,
        )
    }

    /// Lazy edge sequence for one run. Every call starts over from time zero.
    pub fn run(&self) -> ClockEdges {
        ClockEdges {
            half_period: self.period / 2,
            period: self.period,
            duration: self.duration,
            reset_pulse_width: self.reset_pulse_width,
            next_edge_time: 0,
            next_edge: Edge::Rising,
            reset_stage: ResetStage::Assert,
        }
    }

    pub fn period(&self) -> u64 {
        self.period
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn reset_pulse_width(&self) -> u64 {
        self.reset_pulse_width
    }

    /// Number of time-source rising edges inside the run.
    pub fn rising_edge_count(&self) -> u64 {
        self.duration.div_ceil(self.period)
    }
}

/// Iterator over source clock and reset events, strictly before the run duration.
#[derive(Debug, Clone)]
pub struct ClockEdges {
    half_period: u64,
    period: u64,
    duration: u64,
    reset_pulse_width: u64,
    next_edge_time: u64,
    next_edge: Edge,
    reset_stage: ResetStage,
}

impl ClockEdges {
    fn pending_reset(&self) -> Option<TimingEvent> {
        match self.reset_stage {
            ResetStage::Assert => Some(TimingEvent::new(0, SignalId::Reset, Edge::Rising, true)),
            ResetStage::Release => Some(TimingEvent::new(
                self.reset_pulse_width,
                SignalId::Reset,
                Edge::Falling,
                false,
            )),
            ResetStage::Done => None,
        }
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }
}

impl Iterator for ClockEdges {
    type Item = TimingEvent;

    fn next(&mut self) -> Option<TimingEvent> {
        if let Some(reset) = self.pending_reset() {
            if reset.time < self.duration && reset.time <= self.next_edge_time {
                self.reset_stage = match self.reset_stage {
                    ResetStage::Assert => ResetStage::Release,
                    _ => ResetStage::Done,
                };
                return Some(reset);
            }
        }

        if self.next_edge_time >= self.duration {
            return None;
        }

        let time = self.next_edge_time;
        let edge = self.next_edge;

        match edge {
            Edge::Rising => {
                self.next_edge_time += self.half_period;
                self.next_edge = Edge::Falling;
            }
            _ => {
                self.next_edge_time += self.period - self.half_period;
                self.next_edge = Edge::Rising;
            }
        }

        Some(TimingEvent::new(time, SignalId::SourceClock, edge, edge == Edge::Rising))
    }
}
