use crate::config::VehicleParams;
use crate::control::{Control, RightOfWay};
use crate::geometry::{angle_between, distance, heading_vector, wrap_angle, Direction, Point};
use serde::Serialize;
use std::collections::VecDeque;
use std::f32::consts::PI;

/// Reference frame length. Speeds are world units per frame and
/// acceleration/deceleration are speed changes per frame.
pub const FRAME_MS: f32 = 16.0;

pub const WAYPOINT_CAPTURE_RADIUS: f32 = 10.0;
pub const STEERING_GAIN: f32 = 0.15;
/// Extra speed allowed over the leader's per unit of gap beyond the safe distance.
pub const FOLLOW_GAIN: f32 = 0.1;
/// Half-angle of the forward cone scanned for a leader.
pub const LEADER_CONE: f32 = PI / 3.0;
/// A leader's heading must be within this angle of the follower's.
pub const LEADER_HEADING_TOLERANCE: f32 = PI / 2.0;
pub const TURN_LOOKAHEAD: f32 = 30.0;
pub const TURN_ANGLE_THRESHOLD: f32 = 0.5;
pub const TURN_SPEED_FACTOR: f32 = 0.6;
const TRAIL_SPACING: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct VehicleId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VehicleState {
    Driving,
    Waiting,
    InControlledZone,
}

/// Nearest vehicle ahead, as seen by [`Vehicle::find_leader`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Leader {
    pub distance: f32,
    pub speed: f32,
}

impl Leader {
    pub const NONE: Leader = Leader {
        distance: f32::INFINITY,
        speed: 0.0,
    };

    pub fn is_present(&self) -> bool {
        self.distance.is_finite()
    }
}

/// Read-only view of every vehicle except the one being updated.
#[derive(Debug, Clone, Copy)]
pub struct Neighbors<'a> {
    before: &'a [Vehicle],
    after: &'a [Vehicle],
}

impl<'a> Neighbors<'a> {
    pub fn new(before: &'a [Vehicle], after: &'a [Vehicle]) -> Self {
        Self { before, after }
    }

    pub fn of(vehicles: &'a [Vehicle]) -> Self {
        Self::new(vehicles, &[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Vehicle> + 'a {
        let (before, after) = (self.before, self.after);
        before.iter().chain(after.iter())
    }
}

#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: VehicleId,
    pub position: Point,
    pub heading: f32,
    pub speed: f32,
    pub max_speed: f32,
    pub acceleration: f32,
    pub deceleration: f32,
    pub safe_distance: f32,
    pub length: f32,
    pub width: f32,
    pub path: Vec<Point>,
    pub waypoint_index: usize,
    pub entry: Direction,
    pub exit: Direction,
    pub state: VehicleState,
    /// Accumulated time spent held by the control structure, in ms.
    pub wait_time: f32,
    /// Past the stop or yield line; never re-evaluated for stopping.
    pub committed: bool,
    /// Registered as circulating in a roundabout.
    pub circulating: bool,
    /// Gap-confirmation time at a roundabout yield line, in ms.
    pub commit_timer: f32,
    pub trail: VecDeque<Point>,
    pub max_trail: usize,
    pub completed: bool,
}

impl Vehicle {
    pub fn new(
        id: VehicleId,
        path: Vec<Point>,
        entry: Direction,
        exit: Direction,
        max_speed: f32,
        params: &VehicleParams,
    ) -> Self {
        let position = path.first().copied().unwrap_or_else(Point::origin);
        let heading = path
            .get(1)
            .map(|next| angle_between(&position, next))
            .unwrap_or(0.0);

        Self {
            id,
            position,
            heading,
            speed: 0.0,
            max_speed,
            acceleration: params.acceleration,
            deceleration: params.deceleration,
            safe_distance: params.safe_distance,
            length: params.length,
            width: params.width,
            path,
            waypoint_index: 0,
            entry,
            exit,
            state: VehicleState::Driving,
            wait_time: 0.0,
            committed: false,
            circulating: false,
            commit_timer: 0.0,
            trail: VecDeque::with_capacity(params.trail_length),
            max_trail: params.trail_length,
            completed: false,
        }
    }

    pub fn waypoint(&self) -> Option<Point> {
        self.path.get(self.waypoint_index).copied()
    }

    /// Advances the vehicle by `dt` milliseconds: steering, speed choice and
    /// integration. Completed vehicles are left untouched.
    pub fn advance(&mut self, dt: f32, neighbors: &Neighbors<'_>, control: &mut Control) {
        if self.completed {
            return;
        }

        self.record_trail();

        let Some(mut waypoint) = self.waypoint() else {
            self.completed = true;
            return;
        };

        if distance(&self.position, &waypoint) < WAYPOINT_CAPTURE_RADIUS {
            self.waypoint_index += 1;
            match self.waypoint() {
                Some(next) => waypoint = next,
                None => {
                    self.completed = true;
                    return;
                }
            }
        }

        let dt = dt.max(0.0);
        let frames = dt / FRAME_MS;

        // Damped steering toward the waypoint
        let target_angle = angle_between(&self.position, &waypoint);
        let correction = wrap_angle(target_angle - self.heading);
        self.heading = wrap_angle(self.heading + correction * (STEERING_GAIN * frames).min(1.0));

        let mut target_speed = self.max_speed;

        let leader = self.find_leader(neighbors);
        if leader.is_present() {
            let surplus = (leader.distance - self.safe_distance).max(0.0);
            target_speed = target_speed.min(leader.speed + FOLLOW_GAIN * surplus);
        }

        if !control.can_proceed(self, neighbors, dt) {
            target_speed = 0.0;
            self.wait_time += dt;
        }

        if self.approaching_turn(&waypoint, target_angle) {
            target_speed *= TURN_SPEED_FACTOR;
        }

        // Braking is roughly twice as strong as accelerating
        if self.speed < target_speed {
            self.speed = (self.speed + self.acceleration * frames).min(target_speed);
        } else {
            self.speed = (self.speed - self.deceleration * frames).max(target_speed);
        }
        self.speed = self.speed.min(self.max_speed).max(0.0);

        self.position += heading_vector(self.heading) * self.speed * frames;
    }

    /// Nearest vehicle this one yields to within twice the safe distance and
    /// inside the forward cone, or [`Leader::NONE`].
    pub fn find_leader(&self, neighbors: &Neighbors<'_>) -> Leader {
        let envelope = self.safe_distance * 2.0;

        neighbors
            .iter()
            .filter(|other| self.yields_to(other))
            .filter_map(|other| {
                let gap = distance(&self.position, &other.position);
                if gap > envelope {
                    return None;
                }

                let bearing = angle_between(&self.position, &other.position);
                let off_axis = wrap_angle(bearing - self.heading).abs();
                (off_axis < LEADER_CONE).then_some(Leader {
                    distance: gap,
                    speed: other.speed,
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
            .unwrap_or(Leader::NONE)
    }

    /// Right of way between two vehicles. Only older vehicles travelling
    /// roughly the same way can hold this one back, and vehicles past a stop
    /// or yield line ignore those still behind one. Leader chains therefore
    /// always end at the oldest vehicle involved and never loop.
    pub fn yields_to(&self, other: &Vehicle) -> bool {
        if other.completed || other.id >= self.id {
            return false;
        }
        if self.committed && !other.committed {
            return false;
        }

        wrap_angle(other.heading - self.heading).abs() < LEADER_HEADING_TOLERANCE
    }

    pub fn is_queued(&self, speed_threshold: f32) -> bool {
        self.speed < speed_threshold
    }

    fn approaching_turn(&self, waypoint: &Point, heading_to_waypoint: f32) -> bool {
        let Some(next) = self.path.get(self.waypoint_index + 1) else {
            return false;
        };

        if distance(&self.position, waypoint) >= TURN_LOOKAHEAD {
            return false;
        }

        let next_leg = angle_between(waypoint, next);
        wrap_angle(next_leg - heading_to_waypoint).abs() > TURN_ANGLE_THRESHOLD
    }

    fn record_trail(&mut self) {
        let moved = self
            .trail
            .front()
            .map_or(true, |last| distance(&self.position, last) > TRAIL_SPACING);

        if moved {
            self.trail.push_front(self.position);
            self.trail.truncate(self.max_trail);
        }
    }
}

/// Updates every vehicle in order, in place. Each vehicle sees the positions
/// already written this step by the vehicles before it.
pub fn advance_vehicles(vehicles: &mut [Vehicle], dt: f32, control: &mut Control) {
    for index in 0..vehicles.len() {
        let (before, rest) = vehicles.split_at_mut(index);
        if let Some((vehicle, after)) = rest.split_first_mut() {
            let neighbors = Neighbors::new(before, after);
            vehicle.advance(dt, &neighbors, control);
        }
    }
}
