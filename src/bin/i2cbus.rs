use clap::{App, Arg, ArgMatches};
use colored::*;
use i2cbus::monitor::{Outcome, Property};
use i2cbus::report::{bit_pattern, SimulationReport};
use i2cbus::{simulate, Glitch, GlitchKind, SimConfig};
use tracing::Level;

fn main() {
    let matches = App::new("i2cbus")
        .version("0.1.0")
        .author("Space Systems Engineering Team")
        .about("🔌 Two-wire bus simulator - drives one transfer and checks START/STOP/data-stability")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("JSON configuration file; flags below override it")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("payload")
                .long("payload")
                .value_name("BYTE")
                .help("Byte to transmit (decimal or 0x-prefixed hex)")
                .takes_value(true)
                .validator(|v| parse_payload(&v).map(|_| ())),
        )
        .arg(
            Arg::with_name("period")
                .long("period")
                .value_name("UNITS")
                .help("Time-source clock period")
                .takes_value(true)
                .validator(validate_number),
        )
        .arg(
            Arg::with_name("reset-width")
                .long("reset-width")
                .value_name("UNITS")
                .help("Reset pulse width")
                .takes_value(true)
                .validator(validate_number),
        )
        .arg(
            Arg::with_name("duration")
                .short("d")
                .long("duration")
                .value_name("UNITS")
                .help("Simulation duration")
                .takes_value(true)
                .validator(validate_number),
        )
        .arg(
            Arg::with_name("glitch")
                .short("g")
                .long("glitch")
                .value_name("TIME[:toggle|low|high]")
                .help("Force the data line at TIME (repeatable)")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .validator(|v| parse_glitch(&v).map(|_| ())),
        )
        .arg(
            Arg::with_name("random-glitches")
                .long("random-glitches")
                .value_name("COUNT")
                .help("Number of pseudo-random data-line toggles")
                .takes_value(true)
                .validator(validate_number),
        )
        .arg(
            Arg::with_name("seed")
                .long("seed")
                .value_name("SEED")
                .help("Seed for random glitches")
                .takes_value(true)
                .validator(validate_number),
        )
        .arg(
            Arg::with_name("format")
                .short("f")
                .long("format")
                .value_name("FORMAT")
                .help("Output format")
                .takes_value(true)
                .possible_values(&["json", "table", "compact"])
                .default_value("table"),
        )
        .arg(
            Arg::with_name("trace")
                .short("t")
                .long("trace")
                .help("Print the bus transitions"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Enable debug logging"),
        )
        .get_matches();

    let level = if matches.is_present("verbose") { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = match build_config(&matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "❌ Configuration error:".bright_red().bold(), e);
            std::process::exit(2);
        }
    };

    let report = match simulate(config) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{} {}", "❌ Configuration error:".bright_red().bold(), e);
            std::process::exit(2);
        }
    };

    let format = matches.value_of("format").unwrap_or("table");
    if let Err(e) = print_report(&report, format, matches.is_present("trace")) {
        eprintln!("{} {}", "❌ Output error:".bright_red().bold(), e);
        std::process::exit(2);
    }

    if !report.is_clean() {
        std::process::exit(1);
    }
}

fn build_config(matches: &ArgMatches<'_>) -> Result<SimConfig, Box<dyn std::error::Error>> {
    let mut config = match matches.value_of("config") {
        Some(path) => SimConfig::from_json_file(path)?,
        None => SimConfig::default(),
    };

    if let Some(payload) = matches.value_of("payload") {
        config.payload = parse_payload(payload)?;
    }
    if let Some(period) = matches.value_of("period") {
        config.clock_period = period.parse()?;
    }
    if let Some(width) = matches.value_of("reset-width") {
        config.reset_pulse_width = width.parse()?;
    }
    if let Some(duration) = matches.value_of("duration") {
        config.simulation_duration = duration.parse()?;
    }
    if let Some(glitches) = matches.values_of("glitch") {
        for glitch in glitches {
            config.glitches.scheduled.push(parse_glitch(glitch)?);
        }
    }
    if let Some(count) = matches.value_of("random-glitches") {
        config.glitches.random_count = count.parse()?;
    }
    if let Some(seed) = matches.value_of("seed") {
        config.glitches.seed = seed.parse()?;
    }

    config.validate()?;
    Ok(config)
}

fn validate_number(value: String) -> Result<(), String> {
    value
        .parse::<u64>()
        .map(|_| ())
        .map_err(|_| "Value must be a non-negative integer".to_string())
}

fn parse_payload(value: &str) -> Result<u8, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => value.parse::<u8>(),
    };
    parsed.map_err(|_| format!("Payload must be a byte (0-255 or 0x00-0xFF), got '{}'", value))
}

fn parse_glitch(value: &str) -> Result<Glitch, String> {
    let (time, kind) = match value.split_once(':') {
        Some((time, kind)) => (time, kind),
        None => (value, "toggle"),
    };

    let time = time
        .parse::<u64>()
        .map_err(|_| format!("Glitch time must be an integer, got '{}'", time))?;
    let kind = match kind {
        "toggle" => GlitchKind::Toggle,
        "low" => GlitchKind::ForceLow,
        "high" => GlitchKind::ForceHigh,
        other => return Err(format!("Unknown glitch kind '{}'", other)),
    };

    Ok(Glitch::new(time, kind))
}

fn print_report(report: &SimulationReport, format: &str, trace: bool) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        "json" => {
            print!("{}", report.results_to_json_lines()?);
            if trace {
                print!("{}", report.trace_to_json_lines()?);
            }
        }
        "compact" => {
            let bytes: Vec<String> = report.observed_bytes.iter().map(|b| format!("0x{:02X}", b)).collect();
            let verdict = if report.is_clean() { "PASS".bright_green() } else { "FAIL".bright_red() };
            println!(
                "{} start={} stop={} violations={} bytes=[{}] completed={}",
                verdict,
                report.summary.starts,
                report.summary.stops,
                report.summary.violations,
                bytes.join(","),
                report.completed_at
            );
        }
        _ => print_table(report, trace),
    }
    Ok(())
}

fn print_table(report: &SimulationReport, trace: bool) {
    let config = &report.config;
    println!("{}", "🔌 Bus Simulation Report".bright_blue().bold());
    println!(
        "{} 0x{:02X} ({})  {} {}  {} {}  {} {}",
        "Payload:".bright_white(),
        config.payload,
        bit_pattern(config.payload),
        "Period:".bright_white(),
        config.clock_period,
        "Reset:".bright_white(),
        config.reset_pulse_width,
        "Duration:".bright_white(),
        config.simulation_duration
    );
    println!();

    if trace {
        println!("{}", "Bus transitions".bright_blue().bold());
        for event in report.bus_trace() {
            println!(
                "  {:>6}  {:<6} {:?} -> {}",
                event.time,
                event.signal.name(),
                event.edge,
                u8::from(event.level)
            );
        }
        println!();
    }

    println!("{}", "Property results".bright_blue().bold());
    for result in &report.results {
        let marker = match result.outcome {
            Outcome::Pass => "✅".green(),
            Outcome::Violation => "❌".red(),
        };
        let name = match (result.property, result.outcome) {
            (_, Outcome::Violation) => result.property.name().bright_red(),
            (Property::DataStability, Outcome::Pass) => result.property.name().dimmed(),
            _ => result.property.name().bright_green(),
        };
        println!("  {} {:>6}  {:<15} {}", marker, result.time, name, result.message);
    }
    println!();

    println!("{}", "Summary".bright_blue().bold());
    println!("  {} {}", "START conditions:".bright_white(), report.summary.starts);
    println!("  {} {}", "STOP conditions:".bright_white(), report.summary.stops);
    println!("  {} {}", "Stable latches:".bright_white(), report.summary.stability_passes);
    for byte in &report.observed_bytes {
        println!("  {} 0x{:02X} ({})", "Observed byte:".bright_white(), byte, bit_pattern(*byte));
    }
    if report.summary.glitches_injected > 0 {
        println!("  {} {}", "Glitches injected:".bright_white(), report.summary.glitches_injected);
    }
    let violations = if report.summary.violations == 0 {
        "0".bright_green()
    } else {
        report.summary.violations.to_string().bright_red()
    };
    println!("  {} {}", "Violations:".bright_white(), violations);
    println!("{} {}", "🏁 Simulation completed at".bright_blue(), report.completed_at);
}
