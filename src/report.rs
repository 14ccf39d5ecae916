use crate::config::SimConfig;
use crate::monitor::{Outcome, Property, PropertyResult};
use crate::signal::{SignalId, TimingEvent};
use arrayvec::ArrayString;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RunSummary {
    pub starts: u32,
    pub stops: u32,
    pub stability_passes: u32,
    pub violations: u32,
    pub glitches_injected: u32,
    pub transfers_completed: u32,
    pub transfers_aborted: u32,
}

/// Everything one run produced. Consumers decide whether violations are fatal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub config: SimConfig,
    pub results: Vec<PropertyResult>,
    pub trace: Vec<TimingEvent>,
    pub latched_bits: Vec<bool>,
    pub observed_bytes: Vec<u8>,
    pub completed_at: u64,
    pub summary: RunSummary,
}

impl SimulationReport {
    /// True when no property evaluation in the run was a violation.
    pub fn is_clean(&self) -> bool {
        !self.results.iter().any(PropertyResult::is_violation)
    }

    pub fn violations(&self) -> impl Iterator<Item = &PropertyResult> {
        self.results.iter().filter(|r| r.is_violation())
    }

    pub fn count(&self, property: Property, outcome: Outcome) -> usize {
        self.results
            .iter()
            .filter(|r| r.property == property && r.outcome == outcome)
            .count()
    }

    pub fn first(&self, property: Property) -> Option<&PropertyResult> {
        self.results.iter().find(|r| r.property == property)
    }

    pub fn trace_iter(&self) -> impl Iterator<Item = &TimingEvent> {
        self.trace.iter()
    }

    /// Bus clock and data transitions only, as a waveform viewer would draw them.
    pub fn bus_trace(&self) -> impl Iterator<Item = &TimingEvent> {
        self.trace
            .iter()
            .filter(|e| matches!(e.signal, SignalId::Clock | SignalId::Data))
    }

    /// One JSON object per line, in log order.
    pub fn results_to_json_lines(&self) -> Result<String, serde_json::Error> {
        to_json_lines(&self.results)
    }

    pub fn trace_to_json_lines(&self) -> Result<String, serde_json::Error> {
        to_json_lines(&self.trace)
    }
}

fn to_json_lines<T: Serialize>(items: &[T]) -> Result<String, serde_json::Error> {
    let mut out = String::new();
    for item in items {
        out.push_str(&serde_json::to_string(item)?);
        out.push('\n');
    }
    Ok(out)
}

/// MSB-first bit pattern of a byte, e.g. `10100101` for `0xA5`.
pub fn bit_pattern(byte: u8) -> ArrayString<8> {
    let mut pattern = ArrayString::new();
    for index in (0..8).rev() {
        pattern.push(if (byte >> index) & 1 == 1 { '1' } else { '0' });
    }
    pattern
}
