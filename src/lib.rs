//! # Two-Wire Bus Simulator
//!
//! A cycle-accurate model of a two-wire serial bus (clock and data line) driven
//! by a single master, together with a property monitor that checks the bus
//! handshaking rules on every sampled edge.
//!
//! ## Features
//!
//! - **Bus driver**: explicit state machine for one transfer (START, 8 bit
//!   cells MSB first, STOP), one micro-step per time-source rising edge
//! - **Property monitor**: START, STOP and data-stability properties evaluated
//!   over a one-sample rolling history, every outcome logged with its timestamp
//! - **Scheduler**: periodic time source and reset pulse as a lazy, restartable
//!   event sequence
//! - **Fault injection**: scheduled or seeded data-line glitches
//! - **Deterministic**: identical configurations yield identical result logs
//!
//! ## Quick Start
//!
//! ```rust
//! use i2cbus::{simulate, SimConfig};
//!
//! let report = simulate(SimConfig::default()).unwrap();
//! assert!(report.is_clean());
//! assert_eq!(report.observed_bytes, vec![0xA5]);
//! assert_eq!(report.completed_at, 200);
//! ```
//!
//! ## Architecture
//!
//! - [`scheduler`] - Time source and reset pulse
//! - [`driver`] - Bus master state machine
//! - [`monitor`] - Protocol property checks
//! - [`fault_injection`] - Data-line glitches for negative testing
//! - [`simulation`] - Orchestrates one run
//! - [`report`] - Result log, trace and summary

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::must_use_candidate)]

pub mod signal;
pub mod driver;
pub mod monitor;
pub mod scheduler;
pub mod fault_injection;
pub mod config;
pub mod simulation;
pub mod report;

// Re-export main public types for convenience
pub use config::{ConfigError, SimConfig};
pub use driver::{BitPhase, BusDriver, TransferState};
pub use fault_injection::{Glitch, GlitchConfig, GlitchKind};
pub use monitor::{Outcome, Property, PropertyMonitor, PropertyResult};
pub use report::SimulationReport;
pub use scheduler::Scheduler;
pub use signal::{BusLevels, Edge, SignalId, TimingEvent};
pub use simulation::{simulate, BusSimulation};
