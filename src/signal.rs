use serde::{Deserialize, Serialize};

/// Lines observable on the simulated bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalId {
    /// Periodic time source that paces both driver and monitor
    SourceClock,
    /// Asynchronous reset, owned by the scheduler's reset pulse
    Reset,
    /// Bus clock line, owned by the driver
    Clock,
    /// Bus data line, owned by the driver (and forced by fault injection)
    Data,
}

impl SignalId {
    pub fn name(self) -> &'static str {
        match self {
            SignalId::SourceClock => "source_clock",
            SignalId::Reset => "reset",
            SignalId::Clock => "clock",
            SignalId::Data => "data",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Edge {
    Rising,
    Falling,
    /// Level held without a transition, used for end-of-run markers
    LevelStable,
}

impl Edge {
    pub fn between(previous: bool, current: bool) -> Self {
        match (previous, current) {
            (false, true) => Edge::Rising,
            (true, false) => Edge::Falling,
            _ => Edge::LevelStable,
        }
    }
}

/// Immutable record of one line event. `level` is the value after the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingEvent {
    pub time: u64,
    pub signal: SignalId,
    pub edge: Edge,
    pub level: bool,
}

impl TimingEvent {
    pub fn new(time: u64, signal: SignalId, edge: Edge, level: bool) -> Self {
        Self { time, signal, edge, level }
    }
}

/// A named boolean line with the time of its last transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    id: SignalId,
    value: bool,
    changed_at: u64,
}

impl Signal {
    pub fn new(id: SignalId, value: bool) -> Self {
        Self {
            id,
            value,
            changed_at: 0,
        }
    }

    pub fn id(&self) -> SignalId {
        self.id
    }

    pub fn value(&self) -> bool {
        self.value
    }

    pub fn changed_at(&self) -> u64 {
        self.changed_at
    }

    /// Drive the line. Returns the transition, or `None` if the level was already held.
    pub fn set(&mut self, value: bool, time: u64) -> Option<TimingEvent> {
        if self.value == value {
            return None;
        }

        debug_assert!(
            time >= self.changed_at,
            "{} driven backwards in time: {} < {}",
            self.id.name(), time, self.changed_at
        );

        self.value = value;
        self.changed_at = time;
        Some(TimingEvent::new(time, self.id, Edge::between(!value, value), value))
    }
}

/// Snapshot of the two bus lines as seen by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusLevels {
    pub clock: bool,
    pub data: bool,
}

impl BusLevels {
    pub const IDLE: BusLevels = BusLevels { clock: true, data: true };
}

impl Default for BusLevels {
    fn default() -> Self {
        Self::IDLE
    }
}
