use super::RightOfWay;
use crate::config::SignalLayout;
use crate::geometry::{distance, Axis, Direction, Point};
use crate::simulation::{Neighbors, Vehicle, VehicleState};
use log::debug;
use serde::{Deserialize, Serialize};

/// Depth of the band outside the box where vehicles obey the lights.
pub const STOP_BAND_DEPTH: f32 = 20.0;
/// Distance from the box edge to the painted stop line.
const STOP_LINE_GAP: f32 = 8.0;
/// Fraction of the box size used for turning waypoints.
const MOUTH_FRACTION: f32 = 0.5;
const TURN_FRACTION: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LightColor {
    Green,
    Yellow,
    Red,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SignalPhase {
    NorthSouthGreen,
    NorthSouthYellow,
    EastWestGreen,
    EastWestYellow,
}

impl SignalPhase {
    pub const CYCLE: [SignalPhase; 4] = [
        SignalPhase::NorthSouthGreen,
        SignalPhase::NorthSouthYellow,
        SignalPhase::EastWestGreen,
        SignalPhase::EastWestYellow,
    ];

    pub fn index(self) -> usize {
        match self {
            SignalPhase::NorthSouthGreen => 0,
            SignalPhase::NorthSouthYellow => 1,
            SignalPhase::EastWestGreen => 2,
            SignalPhase::EastWestYellow => 3,
        }
    }

    pub fn next(self) -> Self {
        Self::CYCLE[(self.index() + 1) % Self::CYCLE.len()]
    }

    pub fn is_yellow(self) -> bool {
        matches!(self, SignalPhase::NorthSouthYellow | SignalPhase::EastWestYellow)
    }

    /// Light shown to the given axis during this phase. At most one axis is
    /// ever non-red.
    pub fn light(self, axis: Axis) -> LightColor {
        match (self, axis) {
            (SignalPhase::NorthSouthGreen, Axis::NorthSouth) => LightColor::Green,
            (SignalPhase::NorthSouthYellow, Axis::NorthSouth) => LightColor::Yellow,
            (SignalPhase::EastWestGreen, Axis::EastWest) => LightColor::Green,
            (SignalPhase::EastWestYellow, Axis::EastWest) => LightColor::Yellow,
            _ => LightColor::Red,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Turn {
    UTurn,
    NearSide,
    Straight,
    FarSide,
}

impl Turn {
    fn between(entry: Direction, exit: Direction) -> Self {
        match entry.clockwise_offset(exit) {
            0 => Turn::UTurn,
            1 => Turn::NearSide,
            2 => Turn::Straight,
            _ => Turn::FarSide,
        }
    }
}

/// Four-way junction run by a fixed-time, four-phase signal.
#[derive(Debug, Clone)]
pub struct Intersection {
    center: Point,
    size: f32,
    lane_offset: f32,
    spawn_distance: f32,
    green_duration: f32,
    yellow_duration: f32,
    red_duration: f32,
    phase: SignalPhase,
    elapsed: f32,
}

impl Intersection {
    pub fn new(layout: &SignalLayout) -> Self {
        Self {
            center: layout.center(),
            size: layout.size,
            lane_offset: layout.lane_offset,
            spawn_distance: layout.spawn_distance,
            green_duration: layout.green_duration,
            yellow_duration: layout.yellow_duration,
            red_duration: layout.green_duration,
            phase: SignalPhase::NorthSouthGreen,
            elapsed: 0.0,
        }
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn phase(&self) -> SignalPhase {
        self.phase
    }

    /// Time spent in the current phase, in ms.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn green_duration(&self) -> f32 {
        self.green_duration
    }

    pub fn yellow_duration(&self) -> f32 {
        self.yellow_duration
    }

    pub fn red_duration(&self) -> f32 {
        self.red_duration
    }

    pub fn phase_duration(&self, phase: SignalPhase) -> f32 {
        if phase.is_yellow() {
            self.yellow_duration
        } else {
            self.green_duration
        }
    }

    pub fn cycle_duration(&self) -> f32 {
        2.0 * (self.green_duration + self.yellow_duration)
    }

    pub fn light(&self, axis: Axis) -> LightColor {
        self.phase.light(axis)
    }

    pub fn light_for(&self, direction: Direction) -> LightColor {
        self.light(direction.axis())
    }

    pub fn is_green_for(&self, direction: Direction) -> bool {
        self.light_for(direction) == LightColor::Green
    }

    pub fn is_yellow_for(&self, direction: Direction) -> bool {
        self.light_for(direction) == LightColor::Yellow
    }

    /// Changes green (and the mirrored red) duration. Yellow is unchanged
    /// and the running phase keeps its elapsed time.
    pub fn set_green_duration(&mut self, duration_ms: f32) {
        self.green_duration = duration_ms;
        self.red_duration = duration_ms;
    }

    fn stop_band(&self, d: f32) -> bool {
        d > self.size && d < self.size + STOP_BAND_DEPTH
    }
}

impl RightOfWay for Intersection {
    fn advance(&mut self, dt: f32) {
        self.elapsed += dt.max(0.0);

        if self.elapsed >= self.phase_duration(self.phase) {
            self.elapsed = 0.0;
            self.phase = self.phase.next();
            debug!("Signal phase -> {:?}", self.phase);
        }
    }

    fn can_proceed(&mut self, vehicle: &mut Vehicle, _neighbors: &Neighbors<'_>, _dt: f32) -> bool {
        if vehicle.committed {
            return true;
        }

        let d = distance(&vehicle.position, &self.center);

        if d <= self.size {
            vehicle.committed = true;
            vehicle.state = VehicleState::InControlledZone;
            return true;
        }

        if self.stop_band(d) {
            // Yellow still admits vehicles that reach the band
            if self.is_green_for(vehicle.entry) || self.is_yellow_for(vehicle.entry) {
                vehicle.committed = true;
                vehicle.state = VehicleState::InControlledZone;
                return true;
            }

            vehicle.state = VehicleState::Waiting;
            return false;
        }

        true
    }

    fn generate_path(&self, entry: Direction, exit: Direction) -> Vec<Point> {
        let c = self.center;
        let entry_lane = entry.lane_side() * self.lane_offset;
        let exit_lane = -exit.lane_side() * self.lane_offset;
        let far = self.size + self.spawn_distance;
        let stop = self.size + STOP_LINE_GAP;
        let mouth = self.size * MOUTH_FRACTION;
        let turn = self.size * TURN_FRACTION;

        let mut path = vec![
            c + entry.arm() * far + entry_lane,
            c + entry.arm() * stop + entry_lane,
            c + entry.arm() * mouth + entry_lane,
        ];

        match Turn::between(entry, exit) {
            Turn::Straight => path.push(c + exit.arm() * mouth + exit_lane),
            Turn::NearSide => path.push(c + (entry.arm() + exit.arm()) * turn + entry_lane + exit_lane),
            Turn::FarSide => {
                // Crossing point sits off center so opposing far-side turns pass each other
                path.push(c + entry_lane + exit_lane);
                path.push(c + exit.arm() * turn + exit_lane);
            }
            Turn::UTurn => {
                path.push(c);
                path.push(c + exit.arm() * turn + exit_lane);
            }
        }

        path.push(c + exit.arm() * stop + exit_lane);
        path.push(c + exit.arm() * far + exit_lane);
        path
    }

    fn center(&self) -> Point {
        self.center
    }

    fn name(&self) -> &'static str {
        "Traffic Light Intersection"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_cycle_wraps() {
        let mut phase = SignalPhase::NorthSouthGreen;
        for _ in 0..4 {
            phase = phase.next();
        }
        assert_eq!(phase, SignalPhase::NorthSouthGreen);
    }

    #[test]
    fn only_one_axis_lit() {
        for phase in SignalPhase::CYCLE {
            let lit = [Axis::NorthSouth, Axis::EastWest]
                .iter()
                .filter(|&&axis| phase.light(axis) != LightColor::Red)
                .count();
            assert_eq!(lit, 1, "{:?}", phase);
        }
    }

    #[test]
    fn straight_path_stays_in_lane() {
        let intersection = Intersection::new(&SignalLayout::default());
        let path = intersection.generate_path(Direction::North, Direction::South);
        assert!(path.iter().all(|p| (p.x - 11.0).abs() < 1e-4));
        assert!(path.first().map_or(false, |p| p.y < -100.0));
        assert!(path.last().map_or(false, |p| p.y > 100.0));
    }
}
