use super::Validate;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationParams {
    /// Vehicles per second across all arms.
    pub spawn_rate: f32,
    pub speed_multiplier: f32,
    /// Longest wall-clock step accepted by a single tick.
    pub max_tick_ms: f32,
    /// Longest internal integration step.
    pub step_ms: f32,
    pub throughput_horizon_ms: f32,
    /// Vehicles slower than this count as queued.
    pub queue_speed_threshold: f32,
    pub seed: Option<u64>,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            spawn_rate: 1.5,
            speed_multiplier: 1.0,
            max_tick_ms: 100.0,
            step_ms: 16.0,
            throughput_horizon_ms: 60_000.0,
            queue_speed_threshold: 0.5,
            seed: None,
        }
    }
}

/// Per-vehicle kinematic limits. Speeds are world units per 16 ms frame.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VehicleParams {
    pub min_max_speed: f32,
    pub max_max_speed: f32,
    pub acceleration: f32,
    pub deceleration: f32,
    pub safe_distance: f32,
    pub length: f32,
    pub width: f32,
    pub trail_length: usize,
}

impl Default for VehicleParams {
    fn default() -> Self {
        Self {
            min_max_speed: 1.8,
            max_max_speed: 2.2,
            acceleration: 0.08,
            deceleration: 0.15,
            safe_distance: 22.0,
            length: 10.0,
            width: 5.0,
            trail_length: 8,
        }
    }
}

impl Validate for SimulationParams {
    fn validate(&self) -> Result<()> {
        // Zero is allowed and simply disables spawning.
        if self.spawn_rate < 0.0 {
            return Err(anyhow!("Spawn rate must be non-negative"));
        }

        if self.speed_multiplier <= 0.0 {
            return Err(anyhow!("Speed multiplier must be positive"));
        }

        if self.max_tick_ms <= 0.0 || self.step_ms <= 0.0 {
            return Err(anyhow!("Tick and step lengths must be positive"));
        }

        if self.throughput_horizon_ms <= 0.0 {
            return Err(anyhow!("Throughput horizon must be positive"));
        }

        if self.queue_speed_threshold < 0.0 {
            return Err(anyhow!("Queue speed threshold must be non-negative"));
        }

        Ok(())
    }
}

impl Validate for VehicleParams {
    fn validate(&self) -> Result<()> {
        if self.min_max_speed <= 0.0 {
            return Err(anyhow!("Vehicle max speed range must be positive"));
        }

        if self.min_max_speed > self.max_max_speed {
            return Err(anyhow!(
                "Vehicle max speed range is inverted ({} > {})",
                self.min_max_speed,
                self.max_max_speed
            ));
        }

        if self.acceleration <= 0.0 || self.deceleration <= 0.0 {
            return Err(anyhow!("Vehicle acceleration values must be positive"));
        }

        if self.safe_distance <= 0.0 {
            return Err(anyhow!("Safe following distance must be positive"));
        }

        if self.length <= 0.0 || self.width <= 0.0 {
            return Err(anyhow!("Vehicle dimensions must be positive"));
        }

        if self.safe_distance <= self.length {
            return Err(anyhow!(
                "Safe following distance {} must exceed vehicle length {}",
                self.safe_distance,
                self.length
            ));
        }

        Ok(())
    }
}
