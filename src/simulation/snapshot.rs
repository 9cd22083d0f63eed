//! Serializable read-only views handed to renderers and reports.

use super::{SimulationStats, Vehicle, VehicleId, VehicleState};
use crate::control::{ControlKind, LightColor, SignalPhase};
use crate::geometry::{speed_to_color, Point, Rgb};
use serde::Serialize;

fn coords(point: &Point) -> [f32; 2] {
    [point.x, point.y]
}

#[derive(Debug, Clone, Serialize)]
pub struct VehicleSnapshot {
    pub id: VehicleId,
    pub position: [f32; 2],
    pub heading: f32,
    pub speed: f32,
    pub color: Rgb,
    /// Most recent point first.
    pub trail: Vec<[f32; 2]>,
    pub state: VehicleState,
}

impl From<&Vehicle> for VehicleSnapshot {
    fn from(vehicle: &Vehicle) -> Self {
        Self {
            id: vehicle.id,
            position: coords(&vehicle.position),
            heading: vehicle.heading,
            speed: vehicle.speed,
            color: speed_to_color(vehicle.speed, vehicle.max_speed),
            trail: vehicle.trail.iter().map(coords).collect(),
            state: vehicle.state,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlSnapshot {
    Signal {
        phase: SignalPhase,
        north_south: LightColor,
        east_west: LightColor,
        elapsed_ms: f32,
    },
    Roundabout {
        center: [f32; 2],
        outer_radius: f32,
        inner_radius: f32,
        outer_lane_radius: f32,
        inner_lane_radius: f32,
        circulating: usize,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationSnapshot {
    pub kind: ControlKind,
    pub time_ms: f64,
    pub vehicles: Vec<VehicleSnapshot>,
    pub control: ControlSnapshot,
    pub stats: SimulationStats,
}
