use super::Vehicle;
use serde::Serialize;
use std::collections::VecDeque;

/// Completion timestamps inside a sliding time horizon. Stamps are kept in
/// f64 so long runs still resolve single steps.
#[derive(Debug, Clone)]
pub struct ThroughputWindow {
    horizon_ms: f64,
    completions: VecDeque<f64>,
}

impl ThroughputWindow {
    pub fn new(horizon_ms: f64) -> Self {
        Self {
            horizon_ms,
            completions: VecDeque::new(),
        }
    }

    pub fn horizon_ms(&self) -> f64 {
        self.horizon_ms
    }

    pub fn record(&mut self, time_ms: f64) {
        self.completions.push_back(time_ms);
    }

    /// Drops completions at or beyond the horizon relative to `now_ms`.
    pub fn purge(&mut self, now_ms: f64) {
        let horizon = self.horizon_ms;
        self.completions.retain(|&t| now_ms - t < horizon);
    }

    pub fn len(&self) -> usize {
        self.completions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.completions.is_empty()
    }

    pub fn clear(&mut self) {
        self.completions.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationStats {
    /// Completions within the throughput horizon.
    pub throughput: usize,
    /// Mean wait per completed vehicle, in seconds.
    pub avg_wait_time: f32,
    pub queue_length: usize,
    /// Share of live vehicles that are moving, in percent.
    pub efficiency: f32,
    pub total_vehicles: u64,
    pub completed_vehicles: u64,
    /// Summed wait of completed vehicles, in ms.
    pub total_wait_time: f64,
    /// Every spawn the demand model asked for, placed or not.
    pub offered_vehicles: u64,
    /// Offered spawns dropped because the spawn point was occupied.
    pub blocked_spawns: u64,
}

impl Default for SimulationStats {
    fn default() -> Self {
        Self {
            throughput: 0,
            avg_wait_time: 0.0,
            queue_length: 0,
            efficiency: 100.0,
            total_vehicles: 0,
            completed_vehicles: 0,
            total_wait_time: 0.0,
            offered_vehicles: 0,
            blocked_spawns: 0,
        }
    }
}

impl SimulationStats {
    /// Share of offered spawns that never entered the network, in percent.
    pub fn blocked_share(&self) -> f32 {
        if self.offered_vehicles == 0 {
            0.0
        } else {
            self.blocked_spawns as f32 / self.offered_vehicles as f32 * 100.0
        }
    }

    pub fn refresh(&mut self, vehicles: &[Vehicle], window: &ThroughputWindow, queue_speed_threshold: f32) {
        self.throughput = window.len();

        self.avg_wait_time = if self.completed_vehicles > 0 {
            (self.total_wait_time / self.completed_vehicles as f64 / 1000.0) as f32
        } else {
            0.0
        };

        self.queue_length = vehicles
            .iter()
            .filter(|v| v.is_queued(queue_speed_threshold))
            .count();

        self.efficiency = if vehicles.is_empty() {
            100.0
        } else {
            let moving = vehicles.len() - self.queue_length;
            moving as f32 / vehicles.len() as f32 * 100.0
        };
    }
}
