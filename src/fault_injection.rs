use crate::config::ConfigError;
use crate::driver::BusDriver;
use crate::signal::TimingEvent;
use heapless::Vec;
use serde::{Deserialize, Serialize};

pub const MAX_GLITCHES: usize = 32;

const DEFAULT_SEED: u64 = 0x1234_5678_9ABC_DEF0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GlitchKind {
    /// Invert whatever the data line currently carries
    Toggle,
    ForceLow,
    ForceHigh,
}

impl GlitchKind {
    fn level(self, current: bool) -> bool {
        match self {
            GlitchKind::Toggle => !current,
            GlitchKind::ForceLow => false,
            GlitchKind::ForceHigh => true,
        }
    }
}

/// A forced data-line change at an absolute simulation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Glitch {
    pub time: u64,
    pub kind: GlitchKind,
}

impl Glitch {
    pub fn new(time: u64, kind: GlitchKind) -> Self {
        Self { time, kind }
    }

    pub fn toggle(time: u64) -> Self {
        Self::new(time, GlitchKind::Toggle)
    }
}

/// Configuration for data-line fault injection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlitchConfig {
    pub scheduled: std::vec::Vec<Glitch>,
    /// Extra toggles at pseudo-random times, reproducible from `seed`
    pub random_count: u32,
    pub seed: u64,
}

impl Default for GlitchConfig {
    fn default() -> Self {
        Self {
            scheduled: std::vec::Vec::new(),
            random_count: 0,
            seed: DEFAULT_SEED,
        }
    }
}

impl GlitchConfig {
    pub fn is_empty(&self) -> bool {
        self.scheduled.is_empty() && self.random_count == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GlitchStats {
    pub planned: u32,
    pub injected: u32,
    /// Glitches that forced the line to the level it already had
    pub ineffective: u32,
}

/// Deterministic data-line glitch injector
#[derive(Debug, Clone)]
pub struct GlitchInjector {
    plan: Vec<Glitch, MAX_GLITCHES>,
    cursor: usize,
    stats: GlitchStats,

    // Simple Linear Congruential Generator for reproducible random glitches
    rng_state: u64,
}

impl GlitchInjector {
    pub fn new(config: &GlitchConfig, duration: u64) -> Result<Self, ConfigError> {
        let mut injector = Self {
            plan: Vec::new(),
            cursor: 0,
            stats: GlitchStats::default(),
            rng_state: config.seed,
        };

        for glitch in &config.scheduled {
            injector.plan_glitch(*glitch, duration)?;
        }

        // Random glitches need room strictly between time zero and the end of the run
        if duration > 1 {
            for _ in 0..config.random_count {
                let time = 1 + u64::from(injector.random_u32()) % (duration - 1);
                injector.plan_glitch(Glitch::toggle(time), duration)?;
            }
        }

        // Stable sort keeps configuration order for glitches at the same instant
        injector.plan.sort_by_key(|glitch| glitch.time);
        injector.stats.planned = injector.plan.len() as u32;

        Ok(injector)
    }

    pub fn disabled() -> Self {
        Self {
            plan: Vec::new(),
            cursor: 0,
            stats: GlitchStats::default(),
            rng_state: DEFAULT_SEED,
        }
    }

    fn plan_glitch(&mut self, glitch: Glitch, duration: u64) -> Result<(), ConfigError> {
        if glitch.time >= duration {
            return Err(ConfigError::GlitchOutsideRun {
                time: glitch.time,
                duration,
            });
        }

        self.plan.push(glitch).map_err(|_| ConfigError::TooManyGlitches {
            count: self.plan.len() + 1,
            max: MAX_GLITCHES,
        })
    }

    /// Next planned glitch with `time <= limit`, in time order.
    pub fn next_due(&mut self, limit: u64) -> Option<Glitch> {
        let glitch = *self.plan.get(self.cursor)?;
        if glitch.time > limit {
            return None;
        }
        self.cursor += 1;
        Some(glitch)
    }

    /// Force the driver's data line. Returns the transition, if the level changed.
    pub fn apply(&mut self, glitch: Glitch, driver: &mut BusDriver) -> Option<TimingEvent> {
        let level = glitch.kind.level(driver.levels().data);
        let transition = driver.force_data(level, glitch.time);

        if transition.is_some() {
            self.stats.injected = self.stats.injected.saturating_add(1);
        } else {
            self.stats.ineffective = self.stats.ineffective.saturating_add(1);
        }

        transition
    }

    pub fn remaining(&self) -> &[Glitch] {
        &self.plan[self.cursor..]
    }

    pub fn plan(&self) -> &[Glitch] {
        &self.plan
    }

    pub fn get_stats(&self) -> &GlitchStats {
        &self.stats
    }

    fn next_random(&mut self) -> u64 {
        // X(n+1) = (aX(n) + c) mod 2^64, Numerical Recipes parameters
        self.rng_state = self.rng_state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        self.rng_state
    }

    fn random_u32(&mut self) -> u32 {
        (self.next_random() >> 16) as u32
    }
}

impl Default for GlitchInjector {
    fn default() -> Self {
        Self::disabled()
    }
}
