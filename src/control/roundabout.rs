use super::RightOfWay;
use crate::config::RoundaboutLayout;
use crate::geometry::{distance, normalize_angle, point_on_circle, Direction, Point};
use crate::simulation::{Neighbors, Vehicle, VehicleId, VehicleState};
use log::debug;
use std::collections::BTreeSet;
use std::f32::consts::{PI, TAU};

/// Circulating vehicles closer than this to an entrant block its entry.
pub const CONFLICT_DISTANCE: f32 = 18.0;
/// Ring traffic closer than this to the point where an entrant joins or
/// crosses a lane blocks its entry.
pub const MERGE_CLEARANCE: f32 = 30.0;
/// A gap must stay open this long before a yielding vehicle is registered.
pub const ENTRY_CONFIRMATION_MS: f32 = 50.0;
/// Vehicles further than `outer + EXIT_MARGIN` have left the ring. This is
/// also the outer edge of the yield band, so registration never happens
/// beyond it.
pub const EXIT_MARGIN: f32 = 12.0;
const YIELD_BAND_INSIDE: f32 = 5.0;
const APPROACH_GAP: f32 = 8.0;
/// Angle travelled past the last skipped arm before leaving the inner lane.
const PAST_SKIPPED_ARM: f32 = 0.2;
const LANE_CHANGE_LEAD: f32 = 0.3;
const ARC_STEP: f32 = PI / 3.0;

/// First angle at or after `start` (clockwise) equal to `target` modulo a
/// full turn. A zero sweep becomes a full lap.
fn angle_after(start: f32, target: f32) -> f32 {
    let sweep = normalize_angle(target - start);
    if sweep < 1e-4 {
        start + TAU
    } else {
        start + sweep
    }
}

/// Two-lane roundabout circulating clockwise, with yield-on-entry.
#[derive(Debug, Clone)]
pub struct Roundabout {
    center: Point,
    outer_radius: f32,
    inner_radius: f32,
    lane_width: f32,
    outer_lane_radius: f32,
    inner_lane_radius: f32,
    lane_offset: f32,
    spawn_distance: f32,
    circulating: BTreeSet<VehicleId>,
}

impl Roundabout {
    pub fn new(layout: &RoundaboutLayout) -> Self {
        let lane_width = (layout.outer_radius - layout.inner_radius) / 2.0;

        Self {
            center: layout.center(),
            outer_radius: layout.outer_radius,
            inner_radius: layout.inner_radius,
            lane_width,
            outer_lane_radius: layout.outer_radius - lane_width / 2.0,
            inner_lane_radius: layout.inner_radius + lane_width / 2.0,
            lane_offset: layout.lane_offset,
            spawn_distance: layout.spawn_distance,
            circulating: BTreeSet::new(),
        }
    }

    pub fn outer_radius(&self) -> f32 {
        self.outer_radius
    }

    pub fn inner_radius(&self) -> f32 {
        self.inner_radius
    }

    pub fn lane_width(&self) -> f32 {
        self.lane_width
    }

    pub fn outer_lane_radius(&self) -> f32 {
        self.outer_lane_radius
    }

    pub fn inner_lane_radius(&self) -> f32 {
        self.inner_lane_radius
    }

    pub fn exit_radius(&self) -> f32 {
        self.outer_radius + EXIT_MARGIN
    }

    /// Returns false if the vehicle was already registered.
    pub fn register(&mut self, id: VehicleId) -> bool {
        self.circulating.insert(id)
    }

    pub fn unregister(&mut self, id: VehicleId) -> bool {
        self.circulating.remove(&id)
    }

    pub fn is_registered(&self, id: VehicleId) -> bool {
        self.circulating.contains(&id)
    }

    pub fn circulating_count(&self) -> usize {
        self.circulating.len()
    }

    pub fn circulating_ids(&self) -> impl Iterator<Item = VehicleId> + '_ {
        self.circulating.iter().copied()
    }

    /// Numbered exit taken from `entry`: 1 is the first arm clockwise, 4 a
    /// full lap back to the entry arm.
    pub fn exit_number(entry: Direction, exit: Direction) -> usize {
        match entry.clockwise_offset(exit) {
            0 => 4,
            offset => offset,
        }
    }

    /// True when a registered circulating vehicle is close to the candidate,
    /// or is on the ring close to a point where the candidate's lane joins
    /// or crosses a ring lane.
    pub fn has_conflicting_vehicle(&self, candidate: &Vehicle, neighbors: &Neighbors<'_>) -> bool {
        neighbors
            .iter()
            .filter(|other| {
                other.id != candidate.id && other.circulating && self.circulating.contains(&other.id)
            })
            .any(|other| {
                if distance(&candidate.position, &other.position) < CONFLICT_DISTANCE {
                    return true;
                }

                distance(&other.position, &self.center) <= self.outer_radius
                    && self
                        .merge_points(candidate.entry, candidate.exit)
                        .any(|point| distance(&point, &other.position) < MERGE_CLEARANCE)
            })
    }

    /// Where the inbound lane from `entry` meets the outer lane, and the inner
    /// lane too for trips that use it.
    pub fn merge_points(&self, entry: Direction, exit: Direction) -> impl Iterator<Item = Point> + '_ {
        let inner = (Self::exit_number(entry, exit) > 1).then_some(self.inner_lane_radius);

        std::iter::once(self.outer_lane_radius)
            .chain(inner)
            .map(move |radius| point_on_circle(&self.center, radius, self.join_angle(entry, radius)))
    }

    /// Angle between an arm's center line and the point where one of its
    /// lanes crosses the ring lane of `radius`.
    fn lane_angle(&self, radius: f32) -> f32 {
        (self.lane_offset / radius).min(1.0).asin()
    }

    fn join_angle(&self, entry: Direction, radius: f32) -> f32 {
        entry.angle() + self.lane_angle(radius)
    }

    fn leave_angle(&self, exit: Direction) -> f32 {
        exit.angle() - self.lane_angle(self.outer_lane_radius)
    }

    fn enter(&mut self, vehicle: &mut Vehicle) {
        self.register(vehicle.id);
        vehicle.circulating = true;
        vehicle.committed = true;
        vehicle.state = VehicleState::InControlledZone;
    }

    fn depart(&mut self, vehicle: &mut Vehicle) {
        self.unregister(vehicle.id);
        vehicle.circulating = false;
        vehicle.state = VehicleState::Driving;
    }

    fn in_yield_band(&self, d: f32) -> bool {
        d > self.outer_radius - YIELD_BAND_INSIDE && d < self.exit_radius()
    }

    fn push_arc(&self, path: &mut Vec<Point>, start: f32, end: f32, radius: f32) {
        let sweep = angle_after(start, end) - start;
        let steps = ((sweep / ARC_STEP).ceil() as usize).max(2);

        for step in 1..=steps {
            let angle = start + sweep * step as f32 / steps as f32;
            path.push(point_on_circle(&self.center, radius, angle));
        }
    }
}

impl RightOfWay for Roundabout {
    fn advance(&mut self, _dt: f32) {}

    fn can_proceed(&mut self, vehicle: &mut Vehicle, neighbors: &Neighbors<'_>, dt: f32) -> bool {
        let d = distance(&vehicle.position, &self.center);

        if vehicle.circulating {
            if d > self.exit_radius() {
                self.depart(vehicle);
            }
            return true;
        }

        // Exiting traffic passes back through the yield band
        if vehicle.committed {
            return true;
        }

        if self.in_yield_band(d) {
            if self.has_conflicting_vehicle(vehicle, neighbors) {
                vehicle.commit_timer = 0.0;
                vehicle.state = VehicleState::Waiting;
                return false;
            }

            // Keeps rolling while the gap is confirmed
            vehicle.commit_timer += dt;
            if vehicle.commit_timer >= ENTRY_CONFIRMATION_MS {
                self.enter(vehicle);
                debug!("Vehicle {:?} entered roundabout", vehicle.id);
            } else {
                vehicle.state = VehicleState::Driving;
            }
            return true;
        }

        if d <= self.outer_radius && d > self.inner_radius {
            self.enter(vehicle);
        }

        true
    }

    fn generate_path(&self, entry: Direction, exit: Direction) -> Vec<Point> {
        let c = self.center;
        let entry_lane = entry.lane_side() * self.lane_offset;
        let exit_lane = -exit.lane_side() * self.lane_offset;
        let far = self.outer_radius + self.spawn_distance;
        let near = self.outer_radius + APPROACH_GAP;
        let entry_angle = entry.angle();
        let leave_angle = self.leave_angle(exit);

        let mut path = vec![
            c + entry.arm() * far + entry_lane,
            c + entry.arm() * near + entry_lane,
        ];

        let exit_number = Self::exit_number(entry, exit);
        if exit_number == 1 {
            let join = self.join_angle(entry, self.outer_lane_radius);
            path.push(point_on_circle(&c, self.outer_lane_radius, join));
            self.push_arc(&mut path, join, leave_angle, self.outer_lane_radius);
        } else {
            // Longer trips use the inner lane, then move out before the exit
            let join = self.join_angle(entry, self.inner_lane_radius);
            path.push(point_on_circle(&c, self.inner_lane_radius, join));
            let last_skipped = entry.clockwise(exit_number - 1);
            let leave_inner = angle_after(entry_angle, last_skipped.angle()) + PAST_SKIPPED_ARM;
            self.push_arc(&mut path, join, leave_inner, self.inner_lane_radius);

            let lane_change = leave_inner + LANE_CHANGE_LEAD;
            path.push(point_on_circle(&c, self.outer_lane_radius, lane_change));
            self.push_arc(&mut path, lane_change, leave_angle, self.outer_lane_radius);
        }

        path.push(c + exit.arm() * near + exit_lane);
        path.push(c + exit.arm() * far + exit_lane);
        path
    }

    fn release(&mut self, vehicle: &mut Vehicle) {
        self.unregister(vehicle.id);
        vehicle.circulating = false;
    }

    fn release_departed(&mut self, vehicles: &mut [Vehicle]) {
        let exit_radius = self.exit_radius();
        for vehicle in vehicles.iter_mut().filter(|v| v.circulating) {
            if distance(&vehicle.position, &self.center) > exit_radius {
                self.depart(vehicle);
            }
        }
    }

    fn center(&self) -> Point {
        self.center
    }

    fn name(&self) -> &'static str {
        "Roundabout"
    }
}
