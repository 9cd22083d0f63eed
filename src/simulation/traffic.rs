use super::snapshot::{SimulationSnapshot, VehicleSnapshot};
use super::{advance_vehicles, SimulationStats, ThroughputWindow, Vehicle, VehicleId, FRAME_MS};
use crate::config::SimulationConfig;
use crate::control::{Control, ControlKind, RightOfWay};
use crate::geometry::{distance, random_range, Direction};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Upper bound on integration steps per tick. Scaled time beyond
/// `MAX_SUBSTEPS * step_ms` is dropped.
pub const MAX_SUBSTEPS: usize = 4096;

/// Spawn attempts allowed per integration step. Demand beyond it is dropped.
pub const MAX_SPAWNS_PER_STEP: usize = 64;

fn seeded_rng(seed: Option<u64>) -> StdRng {
    if let Some(seed) = seed {
        StdRng::seed_from_u64(seed)
    } else {
        StdRng::from_entropy()
    }
}

/// One junction under simulation: owns its vehicles, its control structure
/// and the statistics derived from them.
pub struct Simulation {
    kind: ControlKind,
    config: SimulationConfig,
    control: Control,
    vehicles: Vec<Vehicle>,
    spawn_timer: f32,
    spawn_rate: f32,
    speed_multiplier: f32,
    paused: bool,
    time: f64,
    next_vehicle_id: u64,
    throughput: ThroughputWindow,
    stats: SimulationStats,
    rng: StdRng,
}

impl Simulation {
    pub fn new(kind: ControlKind, config: SimulationConfig) -> Self {
        let control = Control::new(kind, &config);
        let rng = seeded_rng(config.simulation.seed);
        let throughput = ThroughputWindow::new(f64::from(config.simulation.throughput_horizon_ms));

        info!("Created {} simulation ({})", kind, control.name());

        Self {
            kind,
            spawn_rate: config.simulation.spawn_rate,
            speed_multiplier: config.simulation.speed_multiplier,
            config,
            control,
            vehicles: Vec::new(),
            spawn_timer: 0.0,
            paused: false,
            time: 0.0,
            next_vehicle_id: 0,
            throughput,
            stats: SimulationStats::default(),
            rng,
        }
    }

    /// Advances the simulation by `dt` wall-clock milliseconds, scaled by the
    /// speed multiplier and split into bounded sub-steps.
    pub fn tick(&mut self, dt: f32) {
        if self.paused {
            return;
        }

        // NaN inputs collapse to zero through max/min
        let wall = dt.max(0.0).min(self.config.simulation.max_tick_ms);
        let mut elapsed = wall * self.speed_multiplier.max(0.0);

        // Also false for NaN, e.g. a zero tick at infinite speed
        if elapsed > 0.0 {
            let step_limit = if self.config.simulation.step_ms > 0.0 {
                self.config.simulation.step_ms
            } else {
                FRAME_MS
            };

            let budget = step_limit * MAX_SUBSTEPS as f32;
            if elapsed > budget {
                warn!(
                    "Tick of {} ms simulated time truncated to {} ms",
                    elapsed, budget
                );
                elapsed = budget;
            }

            let steps = ((elapsed / step_limit).ceil() as usize).clamp(1, MAX_SUBSTEPS);
            let step = elapsed / steps as f32;

            for _ in 0..steps {
                self.step(step);
            }
        }

        self.throughput.purge(self.time);
        self.stats.refresh(
            &self.vehicles,
            &self.throughput,
            self.config.simulation.queue_speed_threshold,
        );
    }

    fn step(&mut self, dt: f32) {
        self.time += f64::from(dt);
        self.control.advance(dt);

        self.spawn_timer += dt;
        let interval = self.spawn_interval();
        let mut attempts = 0;
        while self.spawn_timer >= interval && attempts < MAX_SPAWNS_PER_STEP {
            self.spawn_timer -= interval;
            self.spawn_vehicle();
            attempts += 1;
        }
        if self.spawn_timer >= interval {
            debug!("Dropping spawn backlog of {} ms", self.spawn_timer);
            self.spawn_timer = 0.0;
        }

        advance_vehicles(&mut self.vehicles, dt, &mut self.control);
        self.control.release_departed(&mut self.vehicles);
        self.retire_completed();
    }

    fn spawn_interval(&self) -> f32 {
        if self.spawn_rate > 0.0 {
            1000.0 / self.spawn_rate
        } else {
            f32::INFINITY
        }
    }

    fn spawn_vehicle(&mut self) {
        self.stats.offered_vehicles += 1;

        let entry = Direction::ALL[self.rng.gen_range(0..Direction::ALL.len())];
        let exit = entry.clockwise(self.rng.gen_range(1..Direction::ALL.len()));
        let params = &self.config.vehicles;
        let max_speed = random_range(&mut self.rng, params.min_max_speed, params.max_max_speed);
        let path = self.control.generate_path(entry, exit);

        if let Some(spawn_point) = path.first() {
            let clearance = params.length;
            if self
                .vehicles
                .iter()
                .any(|v| distance(&v.position, spawn_point) < clearance)
            {
                self.stats.blocked_spawns += 1;
                debug!("Spawn at {:?} blocked by a queued vehicle", entry);
                return;
            }
        }

        let id = VehicleId(self.next_vehicle_id);
        self.next_vehicle_id += 1;

        debug!("Spawned vehicle {:?} {:?} -> {:?}", id, entry, exit);
        self.vehicles
            .push(Vehicle::new(id, path, entry, exit, max_speed, params));
        self.stats.total_vehicles += 1;
    }

    fn retire_completed(&mut self) {
        if !self.vehicles.iter().any(|v| v.completed) {
            return;
        }

        let (completed, live): (Vec<_>, Vec<_>) = std::mem::take(&mut self.vehicles)
            .into_iter()
            .partition(|v| v.completed);
        self.vehicles = live;

        for mut vehicle in completed {
            self.control.release(&mut vehicle);
            self.record_completion(vehicle.wait_time);
            debug!(
                "Vehicle {:?} completed after waiting {:.0} ms",
                vehicle.id, vehicle.wait_time
            );
        }
    }

    /// Counts one completed trip at the current clock.
    pub fn record_completion(&mut self, wait_ms: f32) {
        self.throughput.record(self.time);
        self.stats.completed_vehicles += 1;
        self.stats.total_wait_time += f64::from(wait_ms);
    }

    /// Returns the simulation to its freshly constructed state. Commanded
    /// spawn rate, speed, pause and green duration are kept.
    pub fn reset(&mut self) {
        self.vehicles.clear();
        self.spawn_timer = 0.0;
        self.time = 0.0;
        self.next_vehicle_id = 0;
        self.throughput = ThroughputWindow::new(f64::from(self.config.simulation.throughput_horizon_ms));
        self.stats = SimulationStats::default();
        self.rng = seeded_rng(self.config.simulation.seed);
        self.control = Control::new(self.kind, &self.config);

        info!("Reset {} simulation", self.kind);
    }

    pub fn set_spawn_rate(&mut self, rate: f32) {
        if !(rate > 0.0) {
            warn!("Spawn rate {} disables spawning", rate);
        }
        self.spawn_rate = rate;
    }

    pub fn set_simulation_speed(&mut self, multiplier: f32) {
        self.speed_multiplier = multiplier;
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Only affects signalized junctions.
    pub fn set_green_duration(&mut self, duration_ms: f32) {
        if let Some(intersection) = self.control.as_signal_mut() {
            intersection.set_green_duration(duration_ms);
            self.config.signal.green_duration = duration_ms;
        }
    }

    pub fn kind(&self) -> ControlKind {
        self.kind
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn control(&self) -> &Control {
        &self.control
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Simulated clock, in ms.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn spawn_rate(&self) -> f32 {
        self.spawn_rate
    }

    pub fn simulation_speed(&self) -> f32 {
        self.speed_multiplier
    }

    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            kind: self.kind,
            time_ms: self.time,
            vehicles: self.vehicles.iter().map(VehicleSnapshot::from).collect(),
            control: self.control.snapshot(),
            stats: self.stats.clone(),
        }
    }
}
