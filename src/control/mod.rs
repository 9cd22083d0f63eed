use crate::config::SimulationConfig;
use crate::geometry::{Axis, Direction, Point};
use crate::simulation::snapshot::ControlSnapshot;
use crate::simulation::{Neighbors, Vehicle};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod roundabout;
pub mod signal;

pub use roundabout::*;
pub use signal::*;

/// Shared interface of the junction control structures. Vehicles ask it for
/// permission every step and get their route from it at spawn.
pub trait RightOfWay {
    /// Advances any internal clock by `dt` milliseconds.
    fn advance(&mut self, dt: f32);

    /// Decides whether `vehicle` may keep moving. May update the vehicle's
    /// state, commitment and circulation flags.
    fn can_proceed(&mut self, vehicle: &mut Vehicle, neighbors: &Neighbors<'_>, dt: f32) -> bool;

    /// Waypoints from the spawn point on `entry` to the despawn point on `exit`.
    fn generate_path(&self, entry: Direction, exit: Direction) -> Vec<Point>;

    /// Forgets any bookkeeping held for `vehicle`.
    fn release(&mut self, _vehicle: &mut Vehicle) {}

    /// Releases vehicles that left the controlled area this step.
    fn release_departed(&mut self, _vehicles: &mut [Vehicle]) {}

    fn center(&self) -> Point;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    Signal,
    Roundabout,
}

impl ControlKind {
    pub const ALL: [ControlKind; 2] = [ControlKind::Signal, ControlKind::Roundabout];
}

impl fmt::Display for ControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlKind::Signal => write!(f, "signal"),
            ControlKind::Roundabout => write!(f, "roundabout"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Control {
    Signal(Intersection),
    Roundabout(Roundabout),
}

impl Control {
    pub fn new(kind: ControlKind, config: &SimulationConfig) -> Self {
        match kind {
            ControlKind::Signal => Control::Signal(Intersection::new(&config.signal)),
            ControlKind::Roundabout => Control::Roundabout(Roundabout::new(&config.roundabout)),
        }
    }

    pub fn kind(&self) -> ControlKind {
        match self {
            Control::Signal(_) => ControlKind::Signal,
            Control::Roundabout(_) => ControlKind::Roundabout,
        }
    }

    pub fn as_signal(&self) -> Option<&Intersection> {
        match self {
            Control::Signal(intersection) => Some(intersection),
            Control::Roundabout(_) => None,
        }
    }

    pub fn as_signal_mut(&mut self) -> Option<&mut Intersection> {
        match self {
            Control::Signal(intersection) => Some(intersection),
            Control::Roundabout(_) => None,
        }
    }

    pub fn as_roundabout(&self) -> Option<&Roundabout> {
        match self {
            Control::Roundabout(roundabout) => Some(roundabout),
            Control::Signal(_) => None,
        }
    }

    pub fn snapshot(&self) -> ControlSnapshot {
        match self {
            Control::Signal(intersection) => ControlSnapshot::Signal {
                phase: intersection.phase(),
                north_south: intersection.light(Axis::NorthSouth),
                east_west: intersection.light(Axis::EastWest),
                elapsed_ms: intersection.elapsed(),
            },
            Control::Roundabout(roundabout) => {
                let center = roundabout.center();
                ControlSnapshot::Roundabout {
                    center: [center.x, center.y],
                    outer_radius: roundabout.outer_radius(),
                    inner_radius: roundabout.inner_radius(),
                    outer_lane_radius: roundabout.outer_lane_radius(),
                    inner_lane_radius: roundabout.inner_lane_radius(),
                    circulating: roundabout.circulating_count(),
                }
            }
        }
    }
}

impl RightOfWay for Control {
    fn advance(&mut self, dt: f32) {
        match self {
            Control::Signal(intersection) => intersection.advance(dt),
            Control::Roundabout(roundabout) => roundabout.advance(dt),
        }
    }

    fn can_proceed(&mut self, vehicle: &mut Vehicle, neighbors: &Neighbors<'_>, dt: f32) -> bool {
        match self {
            Control::Signal(intersection) => intersection.can_proceed(vehicle, neighbors, dt),
            Control::Roundabout(roundabout) => roundabout.can_proceed(vehicle, neighbors, dt),
        }
    }

    fn generate_path(&self, entry: Direction, exit: Direction) -> Vec<Point> {
        match self {
            Control::Signal(intersection) => intersection.generate_path(entry, exit),
            Control::Roundabout(roundabout) => roundabout.generate_path(entry, exit),
        }
    }

    fn release(&mut self, vehicle: &mut Vehicle) {
        match self {
            Control::Signal(intersection) => intersection.release(vehicle),
            Control::Roundabout(roundabout) => roundabout.release(vehicle),
        }
    }

    fn release_departed(&mut self, vehicles: &mut [Vehicle]) {
        match self {
            Control::Signal(intersection) => intersection.release_departed(vehicles),
            Control::Roundabout(roundabout) => roundabout.release_departed(vehicles),
        }
    }

    fn center(&self) -> Point {
        match self {
            Control::Signal(intersection) => intersection.center(),
            Control::Roundabout(roundabout) => roundabout.center(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Control::Signal(intersection) => intersection.name(),
            Control::Roundabout(roundabout) => roundabout.name(),
        }
    }
}
