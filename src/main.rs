//! Command-line driver: loads a saved circuit, ticks it, and prints a JSON report.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use blockwire::{
    init_logging, Circuit, CircuitSnapshot, Schedule, UnitRegistry, Value, DEFAULT_TICKS,
    DEFAULT_TICK_SECONDS,
};
use clap::Parser;
use log::info;
use serde::Serialize;

/// Loads a saved circuit, ticks it, and prints the schedule and final values
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Circuit snapshot in JSON form
    #[arg(long)]
    circuit: PathBuf,
    /// Number of ticks to run
    #[arg(long, default_value_t = DEFAULT_TICKS)]
    ticks: u64,
    /// Seconds per tick
    #[arg(long, default_value_t = DEFAULT_TICK_SECONDS)]
    dt: f32,
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    ticks: u64,
    schedule: Option<&'a Schedule>,
    values: BTreeMap<String, &'a Value>,
}

fn report(circuit: &Circuit) -> Report<'_> {
    let values = circuit
        .topology()
        .connectors()
        .filter_map(|c| circuit.value(&c.id).map(|v| (c.id.to_string(), v)))
        .collect();
    Report {
        ticks: circuit.tick_count(),
        schedule: circuit.schedule(),
        values,
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let text = fs::read_to_string(&args.circuit)
        .with_context(|| format!("reading {}", args.circuit.display()))?;
    let snapshot = CircuitSnapshot::from_json(&text)
        .with_context(|| format!("parsing {}", args.circuit.display()))?;
    let registry = UnitRegistry::with_builtin_units();
    let mut circuit = Circuit::from_snapshot(&snapshot, &registry).context("loading circuit")?;

    for _ in 0..args.ticks {
        circuit.evaluate_tick(args.dt).context("evaluating tick")?;
    }
    info!("ran {} ticks", circuit.tick_count());

    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, &report(&circuit)).context("writing report")?;
    writeln!(out).context("writing report")?;
    Ok(())
}
