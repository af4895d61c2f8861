//! # procgen
//!
//! Runs the coupled generator/processor model to an end time and prints the
//! boundary outputs as JSON.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use devs_core::{DevsError, DevsResult, Tracer, WriterSink};
use devs_models::{standard_factory, COUPLED_GENERATOR};
use devs_sim::{RootCoordinator, SimConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Classic DEVS generator/processor demo
#[derive(Parser, Debug)]
#[command(name = "procgen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Simulated end time
    #[arg(short, long)]
    end_time: Option<f64>,

    /// JSON configuration file (end time and trace settings)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Traced operations: dint, dext, ta, out, slct, set or '*'
    #[arg(long, value_delimiter = ',')]
    trace_ops: Vec<String>,

    /// Traced model paths or '*'
    #[arg(long, value_delimiter = ',')]
    trace_paths: Vec<String>,

    /// Write trace lines to this file instead of the log
    #[arg(long)]
    trace_file: Option<PathBuf>,

    /// Generator period
    #[arg(long, default_value_t = 3.0)]
    period: f64,

    /// Processor service time
    #[arg(long, default_value_t = 4.0)]
    service_time: f64,

    /// Name of the top model
    #[arg(long, default_value = "coupled")]
    name: String,
}

fn load_config(cli: &Cli) -> DevsResult<SimConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| DevsError::Config(format!("read {}: {}", path.display(), e)))?;
            SimConfig::from_json(&text)?
        }
        None => SimConfig::default(),
    };
    if let Some(end_time) = cli.end_time {
        config.end_time = end_time.into();
    }
    if !cli.trace_ops.is_empty() {
        config.trace.ops = cli.trace_ops.clone();
    }
    if !cli.trace_paths.is_empty() {
        config.trace.paths = cli.trace_paths.clone();
    }
    config.validate()?;
    Ok(config)
}

fn run(cli: &Cli) -> DevsResult<()> {
    let config = load_config(cli)?;
    let arg = serde_json::json!({
        "period": cli.period,
        "service_time": cli.service_time,
    });
    let factory = standard_factory();
    let top = (COUPLED_GENERATOR, cli.name.as_str(), &arg);
    let mut root = match &cli.trace_file {
        Some(path) => {
            let file = File::create(path)
                .map_err(|e| DevsError::Config(format!("create {}: {}", path.display(), e)))?;
            let sink = WriterSink::new(BufWriter::new(file), config.trace.layout);
            let tracer = Tracer::new(Box::new(sink), config.trace.filter());
            RootCoordinator::new(&factory, top, config, tracer)?
        }
        None => RootCoordinator::with_log_trace(&factory, top, config)?,
    };
    let report = root.run()?;

    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| DevsError::Config(format!("serialize report: {}", e)))?;
    println!("{}", json);
    Ok(())
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from(["procgen", "-e", "25", "--trace-ops", "slct,set"]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.end_time.as_f64(), 25.0);
        assert_eq!(config.trace.ops, vec!["slct", "set"]);
        assert_eq!(config.trace.paths, vec!["*"]);
    }

    #[test]
    fn test_run_with_log_trace() {
        let cli = Cli::parse_from(["procgen", "-e", "10", "--trace-ops", "*"]);
        run(&cli).unwrap();
    }

    #[test]
    fn test_cli_rejects_unknown_op() {
        let cli = Cli::parse_from(["procgen", "--trace-ops", "bogus"]);
        assert!(load_config(&cli).is_err());
    }
}
