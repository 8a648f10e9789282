//! # SERVOX Motion Runner
//!
//! Commissioning tool: loads a machine description, brings up the
//! simulated register bus, and runs a command sequence against one named
//! axis. Sequences come from a TOML file or fall back to a built-in
//! demonstration matched to the axis kind.
//!
//! The physical transport is an external collaborator; this binary runs
//! everything against the software-emulated drives.

use clap::Parser;
use servox_bus::{share, RegisterTransport};
use servox_common::config::{AxisKind, ConfigLoader, MachineConfig};
use servox_drive::SimTransport;
use servox_motion::assembly::build_controller;
use servox_motion::command::{Command, CommandSequence};
use serde::Deserialize;
use std::path::PathBuf;
use std::process;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

/// SERVOX Motion Runner — command sequences against simulated drives
#[derive(Parser, Debug)]
#[command(name = "servox_motion")]
#[command(author = "SERVOX")]
#[command(version)]
#[command(about = "Run motion command sequences against simulated P100S drives")]
struct Args {
    /// Path to the machine description TOML.
    #[arg(default_value = "config/machine.toml")]
    config: PathBuf,

    /// Axis to drive (defaults to the first configured axis).
    #[arg(long)]
    axis: Option<String>,

    /// Path to a sequence TOML ([[sequence]] tables); defaults to a
    /// built-in demonstration for the axis kind.
    #[arg(long, value_name = "FILE")]
    sequence: Option<PathBuf>,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

/// On-disk sequence format.
#[derive(Debug, Deserialize)]
struct SequenceFile {
    sequence: CommandSequence,
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    info!("SERVOX Motion Runner v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("SERVOX Motion Runner done");
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = MachineConfig::load(&args.config)?;
    config.validate()?;
    info!(
        "Config OK: {} axes on bus '{}'",
        config.axes.len(),
        config.bus.device
    );

    // Simulated bus with every configured axis present.
    let mut sim = SimTransport::new();
    for axis in &config.axes {
        sim.add_axis(axis.id, axis.gear);
    }
    sim.open(&config.bus.device)?;
    let transport = share(sim);

    let mut controller = build_controller(transport, &config)?;

    let axis = match &args.axis {
        Some(name) => name.clone(),
        None => config.axes[0].name.clone(),
    };
    let kind = config
        .axes
        .iter()
        .find(|a| a.name == axis)
        .map(|a| a.kind)
        .ok_or_else(|| format!("axis '{axis}' is not in the machine config"))?;

    let sequence = match &args.sequence {
        Some(path) => {
            let file = SequenceFile::load(path)?;
            info!("Loaded {} commands from {}", file.sequence.len(), path.display());
            file.sequence
        }
        None => {
            info!("No sequence file given, using the built-in {kind:?} demonstration");
            demo_sequence(kind)
        }
    };

    controller.execute_sequence(&axis, &sequence)?;
    info!("Sequence on '{axis}' finished");
    Ok(())
}

/// Built-in demonstration sequence for an axis kind.
fn demo_sequence(kind: AxisKind) -> Vec<Command> {
    match kind {
        AxisKind::Linear => vec![
            Command::InitEnvironment,
            Command::SetPositionSpeed { mm_per_sec: 10.0 },
            Command::SetJogSpeed { mm_per_sec: 5.0 },
            Command::AbsoluteMove { target_mm: 25.0 },
            Command::Wait { milliseconds: 100 },
            Command::RelativeMove { delta_mm: -5.0 },
            Command::GoHome,
        ],
        AxisKind::Rotary | AxisKind::GearRotary => vec![
            Command::InitEnvironment,
            Command::SetAngularPositionSpeed { degrees_per_sec: 36.0 },
            Command::SetAngularJogSpeed { degrees_per_sec: 18.0 },
            Command::AbsoluteAngularMove { target_degrees: 90.0 },
            Command::Wait { milliseconds: 100 },
            Command::RelativeAngularMove { degrees: -45.0 },
            Command::GoHome,
        ],
    }
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
