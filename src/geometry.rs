//! Plane geometry helpers shared by vehicles and control structures.
//!
//! World coordinates follow screen convention: `x` grows east and `y` grows
//! south, so increasing angles turn clockwise on screen.

use nalgebra::{Point2, Vector2};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

pub type Vec2 = Vector2<f32>;
pub type Point = Point2<f32>;

pub fn distance(a: &Point, b: &Point) -> f32 {
    nalgebra::distance(a, b)
}

/// Angle of the ray from `from` to `to`.
pub fn angle_between(from: &Point, to: &Point) -> f32 {
    let delta = to - from;
    delta.y.atan2(delta.x)
}

/// Maps any angle into `[0, 2π)`.
pub fn normalize_angle(angle: f32) -> f32 {
    let normalized = angle.rem_euclid(TAU);
    // rem_euclid can round tiny negative inputs up to exactly TAU
    if normalized >= TAU {
        0.0
    } else {
        normalized
    }
}

/// Maps any angle into `[-π, π)`.
pub fn wrap_angle(angle: f32) -> f32 {
    normalize_angle(angle + PI) - PI
}

pub fn heading_vector(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

pub fn point_on_circle(center: &Point, radius: f32, angle: f32) -> Point {
    center + heading_vector(angle) * radius
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Uniform sample in `[min, max)`; returns `min` when the range is empty.
pub fn random_range<R: Rng + ?Sized>(rng: &mut R, min: f32, max: f32) -> f32 {
    min + rng.gen::<f32>() * (max - min).max(0.0)
}

/// Compass arm of a junction, listed in clockwise order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    East,
    South,
    West,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Axis {
    NorthSouth,
    EastWest,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn index(self) -> usize {
        match self {
            Direction::North => 0,
            Direction::East => 1,
            Direction::South => 2,
            Direction::West => 3,
        }
    }

    /// Direction `steps` arms further clockwise.
    pub fn clockwise(self, steps: usize) -> Direction {
        Self::ALL[(self.index() + steps) % 4]
    }

    /// Number of clockwise steps from `self` to `other`, in `0..4`.
    pub fn clockwise_offset(self, other: Direction) -> usize {
        (other.index() + 4 - self.index()) % 4
    }

    pub fn axis(self) -> Axis {
        match self {
            Direction::North | Direction::South => Axis::NorthSouth,
            Direction::East | Direction::West => Axis::EastWest,
        }
    }

    /// Unit vector from the junction center out along this arm.
    pub fn arm(self) -> Vec2 {
        match self {
            Direction::North => Vec2::new(0.0, -1.0),
            Direction::East => Vec2::new(1.0, 0.0),
            Direction::South => Vec2::new(0.0, 1.0),
            Direction::West => Vec2::new(-1.0, 0.0),
        }
    }

    /// Unit vector toward the side of the arm used by inbound traffic.
    /// Outbound traffic keeps to the opposite side.
    pub fn lane_side(self) -> Vec2 {
        match self {
            Direction::North => Vec2::new(1.0, 0.0),
            Direction::East => Vec2::new(0.0, 1.0),
            Direction::South => Vec2::new(-1.0, 0.0),
            Direction::West => Vec2::new(0.0, -1.0),
        }
    }

    /// Angle of the arm as seen from the junction center.
    pub fn angle(self) -> f32 {
        match self {
            Direction::North => -PI / 2.0,
            Direction::East => 0.0,
            Direction::South => PI / 2.0,
            Direction::West => PI,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    fn mix(r: (f32, f32), g: (f32, f32), b: (f32, f32), t: f32) -> Self {
        Self {
            r: lerp(r.0, r.1, t).round() as u8,
            g: lerp(g.0, g.1, t).round() as u8,
            b: lerp(b.0, b.1, t).round() as u8,
        }
    }
}

/// Display color for a vehicle: red when stopped, yellow around half speed,
/// green to cyan when cruising.
pub fn speed_to_color(speed: f32, max_speed: f32) -> Rgb {
    let ratio = if max_speed > 0.0 {
        (speed / max_speed).clamp(0.0, 1.0)
    } else {
        0.0
    };

    if ratio > 0.6 {
        let t = (ratio - 0.6) / 0.4;
        Rgb::mix((100.0, 0.0), (200.0, 255.0), (150.0, 220.0), t)
    } else if ratio > 0.3 {
        let t = (ratio - 0.3) / 0.3;
        Rgb::mix((255.0, 0.0), (200.0, 200.0), (50.0, 150.0), t)
    } else {
        let t = ratio / 0.3;
        Rgb::mix((255.0, 255.0), (80.0, 200.0), (80.0, 50.0), t)
    }
}
