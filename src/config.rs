use crate::fault_injection::{GlitchConfig, MAX_GLITCHES};
use crate::scheduler::MIN_CLOCK_PERIOD;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_PAYLOAD: u8 = 0xA5;
pub const DEFAULT_CLOCK_PERIOD: u64 = 5;
pub const DEFAULT_RESET_PULSE_WIDTH: u64 = 10;
pub const DEFAULT_SIMULATION_DURATION: u64 = 200;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("clock period {period} is too short (minimum {min})")]
    ClockPeriodTooShort { period: u64, min: u64 },

    #[error("reset pulse width must be positive")]
    ZeroResetPulseWidth,

    #[error("simulation duration must be positive")]
    ZeroDuration,

    #[error("reset pulse width {width} does not end before the run ends at {duration}")]
    ResetOutlastsRun { width: u64, duration: u64 },

    #[error("glitch at {time} is outside the run (duration {duration})")]
    GlitchOutsideRun { time: u64, duration: u64 },

    #[error("too many glitches: {count} requested, at most {max} supported")]
    TooManyGlitches { count: usize, max: usize },

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Parameters for one simulation run. All times are abstract time units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub payload: u8,
    pub clock_period: u64,
    pub reset_pulse_width: u64,
    pub simulation_duration: u64,
    pub glitches: GlitchConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            payload: DEFAULT_PAYLOAD,
            clock_period: DEFAULT_CLOCK_PERIOD,
            reset_pulse_width: DEFAULT_RESET_PULSE_WIDTH,
            simulation_duration: DEFAULT_SIMULATION_DURATION,
            glitches: GlitchConfig::default(),
        }
    }
}

impl SimConfig {
    pub fn with_payload(payload: u8) -> Self {
        Self {
            payload,
            ..Self::default()
        }
    }

    /// Fail fast on timing that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clock_period < MIN_CLOCK_PERIOD {
            return Err(ConfigError::ClockPeriodTooShort {
                period: self.clock_period,
                min: MIN_CLOCK_PERIOD,
            });
        }
        if self.reset_pulse_width == 0 {
            return Err(ConfigError::ZeroResetPulseWidth);
        }
        if self.simulation_duration == 0 {
            return Err(ConfigError::ZeroDuration);
        }
        if self.reset_pulse_width >= self.simulation_duration {
            return Err(ConfigError::ResetOutlastsRun {
                width: self.reset_pulse_width,
                duration: self.simulation_duration,
            });
        }

        let requested = self.glitches.scheduled.len() + self.glitches.random_count as usize;
        if requested > MAX_GLITCHES {
            return Err(ConfigError::TooManyGlitches {
                count: requested,
                max: MAX_GLITCHES,
            });
        }
        if let Some(glitch) = self
            .glitches
            .scheduled
            .iter()
            .find(|g| g.time >= self.simulation_duration)
        {
            return Err(ConfigError::GlitchOutsideRun {
                time: glitch.time,
                duration: self.simulation_duration,
            });
        }

        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}
