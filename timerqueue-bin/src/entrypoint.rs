//! `timerqueue-sim` entry point.
//!
//! Parses and validates arguments, configures logging and runs one idle
//! timeout simulation in the requested drive mode.

use clap::Parser;
use std::time::Duration;

use crate::sim::{run_realtime, run_virtual, SimConfig, SimReport};

/// Idle-timeout simulator for the timer queue
#[derive(Parser, Debug)]
#[command(name = "timerqueue-sim")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Drives a timer queue with simulated session idle timeouts", long_about = None)]
struct Args {
    /// Number of simulated sessions
    #[arg(short = 'n', long = "sessions", default_value = "1000")]
    sessions: usize,

    /// Idle timeout per session in milliseconds
    #[arg(short = 't', long = "timeout-ms", default_value = "500")]
    timeout_ms: u64,

    /// Clock step (virtual) or activity period (realtime) in milliseconds
    #[arg(long = "tick-ms", default_value = "50")]
    tick_ms: u64,

    /// Total simulated time in milliseconds
    #[arg(short = 'd', long = "duration-ms", default_value = "5000")]
    duration_ms: u64,

    /// Sessions touched per tick
    #[arg(long = "touches-per-tick", default_value = "16")]
    touches_per_tick: u32,

    /// Probability that a touch closes the session instead (0.0-1.0)
    #[arg(long = "close-ratio", default_value = "0.02")]
    close_ratio: f64,

    /// Rearm sessions from their own expiry notification
    #[arg(short = 'k', long = "keepalive")]
    keepalive: bool,

    /// Run against the wall clock with a separate activity thread
    #[arg(short = 'r', long = "realtime")]
    realtime: bool,

    /// Seed for the activity generator
    #[arg(long = "seed", default_value = "1")]
    seed: u64,

    /// Verbosity level (can be specified multiple times)
    #[arg(short = 'v', long = "verbosity", action = clap::ArgAction::Count)]
    verbosity: u8,
}

/// Validate command-line arguments and build the simulation config.
fn validate_args(args: &Args) -> Result<SimConfig, String> {
    if args.sessions == 0 {
        return Err("session count must be greater than zero".to_string());
    }
    if args.timeout_ms == 0 {
        return Err("idle timeout must be greater than zero".to_string());
    }
    if args.tick_ms == 0 {
        return Err("tick must be greater than zero".to_string());
    }
    if args.duration_ms < args.tick_ms {
        return Err(format!(
            "duration must cover at least one tick, got {}ms < {}ms",
            args.duration_ms, args.tick_ms
        ));
    }
    if !args.close_ratio.is_finite() || !(0.0..=1.0).contains(&args.close_ratio) {
        return Err(format!(
            "close ratio must be between 0.0 and 1.0, got {}",
            args.close_ratio
        ));
    }

    Ok(SimConfig {
        sessions: args.sessions,
        timeout: Duration::from_millis(args.timeout_ms),
        tick: Duration::from_millis(args.tick_ms),
        duration: Duration::from_millis(args.duration_ms),
        touches_per_tick: args.touches_per_tick,
        close_ratio: args.close_ratio,
        keepalive: args.keepalive,
        realtime: args.realtime,
        seed: args.seed,
    })
}

fn log_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn init_logging(verbosity: u8) {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_filter(verbosity)),
    )
    .format_timestamp_millis()
    .try_init();
}

/// Print configuration information
fn print_configuration(config: &SimConfig) {
    eprintln!("Configuration:");
    eprintln!("  Sessions: {}", config.sessions);
    eprintln!("  Idle timeout: {:?}", config.timeout);
    eprintln!("  Tick: {:?}", config.tick);
    eprintln!("  Duration: {:?}", config.duration);
    eprintln!("  Touches per tick: {}", config.touches_per_tick);
    eprintln!("  Close ratio: {}", config.close_ratio);
    eprintln!("  Keepalive: {}", config.keepalive);
    eprintln!("  Realtime: {}", config.realtime);
    eprintln!("  Seed: {}", config.seed);
}

fn render_report(report: &SimReport) -> String {
    format!(
        "ticks={} fired={} touched={} closed={} expired_sessions={} remaining={} \
         inserts={} reschedules={} removals={}",
        report.ticks,
        report.fired,
        report.touched,
        report.closed,
        report.expired_sessions,
        report.remaining,
        report.stats.inserts,
        report.stats.reschedules,
        report.stats.removals,
    )
}

fn run_with_parsed_args(args: &Args) -> i32 {
    init_logging(args.verbosity);

    let config = match validate_args(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: {e}");
            return 1;
        }
    };

    if args.verbosity > 0 {
        eprintln!("{}", timerqueue_core::bootstrap_signature());
        print_configuration(&config);
        eprintln!();
    }

    let report = if config.realtime {
        match run_realtime(&config) {
            Ok(report) => report,
            Err(e) => {
                eprintln!("ERROR: Realtime simulation failed: {e}");
                return 1;
            }
        }
    } else {
        run_virtual(&config)
    };

    log::info!("simulation finished after {} ticks", report.ticks);
    println!("{}", render_report(&report));
    0
}

/// Runs entrypoint using an explicit argv vector.
#[must_use]
pub fn run_from_argv(argv: &[String]) -> i32 {
    let parsed_args = match Args::try_parse_from(argv.iter().cloned()) {
        Ok(parsed) => parsed,
        Err(err) => {
            let _ = err.print();
            return err.exit_code();
        }
    };
    run_with_parsed_args(&parsed_args)
}

/// Runs entrypoint using process environment arguments.
#[must_use]
pub fn run_from_env() -> i32 {
    let argv: Vec<String> = std::env::args().collect();
    run_from_argv(&argv)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            sessions: 100,
            timeout_ms: 500,
            tick_ms: 50,
            duration_ms: 1000,
            touches_per_tick: 4,
            close_ratio: 0.02,
            keepalive: false,
            realtime: false,
            seed: 1,
            verbosity: 0,
        }
    }

    fn argv(args: &[&str]) -> Vec<String> {
        std::iter::once("timerqueue-sim")
            .chain(args.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn validate_args_accepts_defaults() {
        let config = validate_args(&base_args()).expect("defaults are valid");
        assert_eq!(config.timeout, Duration::from_millis(500));
        assert_eq!(config.tick, Duration::from_millis(50));
        assert!(!config.realtime);
    }

    #[test]
    fn validate_args_rejects_zero_values() {
        let mut args = base_args();
        args.sessions = 0;
        assert!(validate_args(&args).is_err());

        let mut args = base_args();
        args.timeout_ms = 0;
        assert!(validate_args(&args).is_err());

        let mut args = base_args();
        args.tick_ms = 0;
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn validate_args_rejects_short_duration() {
        let mut args = base_args();
        args.duration_ms = 10;
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn validate_args_rejects_bad_close_ratio() {
        for ratio in [-0.1, 1.5, f64::NAN] {
            let mut args = base_args();
            args.close_ratio = ratio;
            assert!(validate_args(&args).is_err(), "ratio {ratio} accepted");
        }
    }

    #[test]
    fn log_filter_grows_with_verbosity() {
        assert_eq!(log_filter(0), "warn");
        assert_eq!(log_filter(1), "info");
        assert_eq!(log_filter(2), "debug");
        assert_eq!(log_filter(9), "trace");
    }

    #[test]
    fn parser_reads_flags() {
        let args = Args::try_parse_from(argv(&["-n", "10", "-k", "-vv", "--seed", "42"]))
            .expect("flags parse");
        assert_eq!(args.sessions, 10);
        assert!(args.keepalive);
        assert_eq!(args.verbosity, 2);
        assert_eq!(args.seed, 42);
        assert_eq!(args.timeout_ms, 500);
    }

    #[test]
    fn run_from_argv_reports_errors_with_exit_code() {
        assert_eq!(run_from_argv(&argv(&["--sessions", "0"])), 1);
        assert_eq!(run_from_argv(&argv(&["--duration-ms", "200"])), 0);
        assert_ne!(run_from_argv(&argv(&["--no-such-flag"])), 0);
    }

    #[test]
    fn report_lists_queue_counters() {
        let report = SimReport {
            ticks: 3,
            fired: 2,
            ..SimReport::default()
        };
        let line = render_report(&report);
        assert!(line.starts_with("ticks=3 fired=2 "));
        assert!(line.contains("reschedules=0"));
    }
}
