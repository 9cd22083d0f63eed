use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use instant::Instant;
use log::{info, warn};
use serde::Serialize;

use junction_sim::{
    config::{SimulationConfig, Validate},
    control::ControlKind,
    simulation::{Simulation, SimulationStats},
};

/// Blocked-spawn percentage above which a run's averages are flagged.
const BLOCKED_SHARE_WARNING: f32 = 10.0;

#[derive(Parser)]
#[command(name = "junction-sim")]
#[command(about = "Compare a signalized intersection with a roundabout under identical demand")]
struct Args {
    /// Simulation configuration file
    #[arg(short, long, default_value = "sim.toml")]
    config: String,

    /// Simulated duration in seconds
    #[arg(short, long, default_value_t = 120.0)]
    duration: f32,

    /// Wall-clock length of one tick in milliseconds
    #[arg(long, default_value_t = 16.0)]
    tick: f32,

    /// Vehicles spawned per second
    #[arg(long)]
    spawn_rate: Option<f32>,

    /// Simulation speed multiplier
    #[arg(long)]
    speed: Option<f32>,

    /// Green phase duration in milliseconds
    #[arg(long)]
    green: Option<f32>,

    /// Random seed for reproducible runs
    #[arg(short, long)]
    seed: Option<u64>,

    /// Run only one junction type
    #[arg(long, value_enum)]
    only: Option<Layout>,

    /// Simulated seconds between progress reports
    #[arg(long, default_value_t = 10.0)]
    report_every: f32,

    /// Print final statistics as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Enable verbose logging for detailed simulation progress
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Layout {
    /// Four-phase traffic light
    Signal,
    /// Two-lane yield roundabout
    Roundabout,
}

impl From<Layout> for ControlKind {
    fn from(layout: Layout) -> Self {
        match layout {
            Layout::Signal => ControlKind::Signal,
            Layout::Roundabout => ControlKind::Roundabout,
        }
    }
}

#[derive(Serialize)]
struct RunReport {
    kind: ControlKind,
    simulated_seconds: f64,
    stats: SimulationStats,
}

fn log_progress(simulation: &Simulation) {
    let stats = simulation.stats();
    info!(
        "[{}] t={:.0}s: {} active, {} done/min, {:.1}s avg wait, {} queued, {:.0}% moving, {:.0}% of spawns blocked",
        simulation.kind(),
        simulation.time() / 1000.0,
        simulation.vehicles().len(),
        stats.throughput,
        stats.avg_wait_time,
        stats.queue_length,
        stats.efficiency,
        stats.blocked_share()
    );
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info })
        .init();
    info!("Starting junction simulator");

    let mut config = SimulationConfig::load_from_file(&args.config)?;
    if let Some(seed) = args.seed {
        config.simulation.seed = Some(seed);
    }
    if let Some(rate) = args.spawn_rate {
        config.simulation.spawn_rate = rate;
    }
    if let Some(speed) = args.speed {
        config.simulation.speed_multiplier = speed;
    }
    if let Some(green) = args.green {
        config.signal.green_duration = green;
    }
    config.validate()?;

    if !(args.tick > 0.0) || !(args.duration > 0.0) {
        bail!("Tick length and duration must be positive");
    }

    info!(
        "Loaded configuration: {:.1} vehicles/s, {:.0}ms green, seed {:?}",
        config.simulation.spawn_rate, config.signal.green_duration, config.simulation.seed
    );

    let kinds: Vec<ControlKind> = match args.only {
        Some(layout) => vec![layout.into()],
        None => ControlKind::ALL.to_vec(),
    };

    let mut simulations: Vec<Simulation> = kinds
        .iter()
        .map(|&kind| Simulation::new(kind, config.clone()))
        .collect();

    let duration_ms = f64::from(args.duration) * 1000.0;
    let report_ms = f64::from(args.report_every.max(0.0)) * 1000.0;
    let mut next_report = report_ms;
    let started = Instant::now();
    let mut ticks: u64 = 0;

    info!("Running {:.0} simulated seconds...", args.duration);

    while simulations.iter().any(|s| s.time() < duration_ms) {
        for simulation in simulations.iter_mut().filter(|s| s.time() < duration_ms) {
            simulation.tick(args.tick);
        }
        ticks += 1;

        let now = simulations.iter().map(|s| s.time()).fold(f64::INFINITY, f64::min);
        if report_ms > 0.0 && now >= next_report {
            simulations.iter().for_each(log_progress);
            next_report += report_ms;
        }
    }

    info!(
        "Finished {} ticks in {:.2}s wall time",
        ticks,
        started.elapsed().as_secs_f32()
    );

    let reports: Vec<RunReport> = simulations
        .iter()
        .map(|simulation| RunReport {
            kind: simulation.kind(),
            simulated_seconds: simulation.time() / 1000.0,
            stats: simulation.stats().clone(),
        })
        .collect();

    for report in &reports {
        let stats = &report.stats;
        info!(
            "{}: {} completed of {} spawned ({} offered, {} blocked), {:.2}s avg wait, {} in last minute",
            report.kind,
            stats.completed_vehicles,
            stats.total_vehicles,
            stats.offered_vehicles,
            stats.blocked_spawns,
            stats.avg_wait_time,
            stats.throughput
        );
        // Wait and throughput only cover vehicles that got in
        if stats.blocked_share() > BLOCKED_SHARE_WARNING {
            warn!(
                "{}: {:.0}% of offered demand never entered, compare averages with care",
                report.kind,
                stats.blocked_share()
            );
        }
    }

    if let [signal, roundabout] = reports.as_slice() {
        let faster = if roundabout.stats.avg_wait_time < signal.stats.avg_wait_time {
            roundabout.kind
        } else {
            signal.kind
        };
        info!(
            "Average wait: signal {:.2}s vs roundabout {:.2}s, {} wins",
            signal.stats.avg_wait_time, roundabout.stats.avg_wait_time, faster
        );
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    Ok(())
}
