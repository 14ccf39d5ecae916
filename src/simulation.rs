use crate::config::{ConfigError, SimConfig};
use crate::driver::{BusDriver, Transitions};
use crate::fault_injection::{Glitch, GlitchInjector};
use crate::monitor::{Outcome, Property, PropertyMonitor};
use crate::report::{RunSummary, SimulationReport};
use crate::scheduler::Scheduler;
use crate::signal::{Edge, Signal, SignalId, TimingEvent};
use tracing::{debug, info, warn};

/// One self-contained simulation run.
///
/// Owns its own lines, driver state and monitor history, so independent runs
/// can execute on separate threads. For every scheduler event the order is
/// fixed: reset line, driver step, coincident glitches, then monitor sample.
#[derive(Debug)]
pub struct BusSimulation {
    config: SimConfig,
    scheduler: Scheduler,
    driver: BusDriver,
    monitor: PropertyMonitor,
    injector: GlitchInjector,
    reset_line: Signal,
    trace: Vec<TimingEvent>,
}

impl BusSimulation {
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let scheduler = Scheduler::from_config(&config)?;
        let injector = GlitchInjector::new(&config.glitches, config.simulation_duration)?;
        let driver = BusDriver::new(config.payload);
        let monitor = PropertyMonitor::with_initial_levels(driver.levels());

        Ok(Self {
            config,
            scheduler,
            driver,
            monitor,
            injector,
            reset_line: Signal::new(SignalId::Reset, false),
            trace: Vec::new(),
        })
    }

    /// Run to the configured duration. Violations never stop the run.
    pub fn run(mut self) -> SimulationReport {
        let duration = self.config.simulation_duration;

        info!(
            payload = self.config.payload,
            period = self.config.clock_period,
            duration,
            "starting bus simulation"
        );

        for event in self.scheduler.run() {
            if let Some(before) = event.time.checked_sub(1) {
                self.inject_until(before);
            }
            self.dispatch(event);
        }

        // Glitches after the last edge but inside the run
        self.inject_until(duration - 1);

        self.finish()
    }

    fn dispatch(&mut self, event: TimingEvent) {
        self.trace.push(event);

        match event.signal {
            SignalId::Reset => {
                if let Some(transition) = self.reset_line.set(event.level, event.time) {
                    debug!(time = transition.time, asserted = transition.level, "reset line");
                }
            }
            SignalId::SourceClock => {
                let transitions =
                    self.driver
                        .on_clock_edge(event.edge, event.time, self.reset_line.value());
                self.record_transitions(&transitions);

                // Glitches on this instant land after the driver update
                self.apply_due_glitches(event.time);
            }
            SignalId::Clock | SignalId::Data => {}
        }

        self.sample(event.time);
    }

    fn inject_until(&mut self, limit: u64) {
        while let Some(glitch) = self.injector.next_due(limit) {
            self.apply_glitch(glitch);
            self.sample(glitch.time);
        }
    }

    fn apply_due_glitches(&mut self, time: u64) {
        while let Some(glitch) = self.injector.next_due(time) {
            self.apply_glitch(glitch);
        }
    }

    fn apply_glitch(&mut self, glitch: Glitch) {
        match self.injector.apply(glitch, &mut self.driver) {
            Some(transition) => {
                debug!(time = glitch.time, kind = ?glitch.kind, level = transition.level, "data line glitch");
                self.trace.push(transition);
            }
            None => {
                debug!(time = glitch.time, kind = ?glitch.kind, "glitch left data line unchanged");
            }
        }
    }

    fn record_transitions(&mut self, transitions: &Transitions) {
        for transition in transitions {
            debug!(
                time = transition.time,
                signal = transition.signal.name(),
                level = transition.level,
                state = ?self.driver.state(),
                "bus transition"
            );
            self.trace.push(*transition);
        }
    }

    fn sample(&mut self, time: u64) {
        let levels = self.driver.levels();
        let reset = self.reset_line.value();

        for result in self.monitor.sample(time, levels, reset) {
            match result.outcome {
                Outcome::Pass if result.property == Property::DataStability => {
                    debug!(time = result.time, "{}", result.message);
                }
                Outcome::Pass => info!(time = result.time, property = result.property.name(), "{}", result.message),
                Outcome::Violation => warn!(time = result.time, property = result.property.name(), "{}", result.message),
            }
        }
    }

    fn finish(mut self) -> SimulationReport {
        let completed_at = self.config.simulation_duration;

        // Final levels, for waveform viewers that need a closing value
        let clock = self.driver.clock_line().value();
        let data = self.driver.data_line().value();
        self.trace.push(TimingEvent::new(completed_at, SignalId::Clock, Edge::LevelStable, clock));
        self.trace.push(TimingEvent::new(completed_at, SignalId::Data, Edge::LevelStable, data));

        let monitor_stats = self.monitor.get_stats();
        let driver_stats = self.driver.get_stats();
        let summary = RunSummary {
            starts: monitor_stats.starts,
            stops: monitor_stats.stops,
            stability_passes: self
                .monitor
                .results()
                .iter()
                .filter(|r| r.property == Property::DataStability && r.outcome == Outcome::Pass)
                .count() as u32,
            violations: monitor_stats.violations,
            glitches_injected: self.injector.get_stats().injected,
            transfers_completed: driver_stats.transfers_completed,
            transfers_aborted: driver_stats.transfers_aborted,
        };

        if summary.violations > 0 {
            warn!(violations = summary.violations, completed_at, "simulation completed with protocol violations");
        } else {
            info!(completed_at, "simulation completed");
        }

        SimulationReport {
            latched_bits: self.monitor.latched_bits().to_vec(),
            observed_bytes: self.monitor.observed_bytes().to_vec(),
            results: self.monitor.into_results(),
            config: self.config,
            trace: self.trace,
            completed_at,
            summary,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn driver(&self) -> &BusDriver {
        &self.driver
    }

    pub fn monitor(&self) -> &PropertyMonitor {
        &self.monitor
    }
}

/// Validate `config`, run it, and return the report.
pub fn simulate(config: SimConfig) -> Result<SimulationReport, ConfigError> {
    Ok(BusSimulation::new(config)?.run())
}
