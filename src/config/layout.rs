use super::Validate;
use crate::geometry::Point;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Geometry and timing of the signalized intersection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SignalLayout {
    pub center_x: f32,
    pub center_y: f32,
    /// Half-size of the box controlled by the lights.
    pub size: f32,
    /// Sideways offset of a lane from the arm's center line.
    pub lane_offset: f32,
    /// How far beyond the stop line vehicles spawn and despawn.
    pub spawn_distance: f32,
    pub green_duration: f32,
    pub yellow_duration: f32,
}

impl Default for SignalLayout {
    fn default() -> Self {
        Self {
            center_x: 0.0,
            center_y: 0.0,
            size: 60.0,
            lane_offset: 11.0,
            spawn_distance: 80.0,
            green_duration: 4000.0,
            yellow_duration: 1000.0,
        }
    }
}

impl SignalLayout {
    pub fn center(&self) -> Point {
        Point::new(self.center_x, self.center_y)
    }
}

/// Geometry of the two-lane roundabout.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoundaboutLayout {
    pub center_x: f32,
    pub center_y: f32,
    pub outer_radius: f32,
    /// Radius of the central island.
    pub inner_radius: f32,
    pub lane_offset: f32,
    pub spawn_distance: f32,
}

impl Default for RoundaboutLayout {
    fn default() -> Self {
        Self {
            center_x: 0.0,
            center_y: 0.0,
            outer_radius: 70.0,
            inner_radius: 30.0,
            lane_offset: 11.0,
            spawn_distance: 80.0,
        }
    }
}

impl RoundaboutLayout {
    pub fn center(&self) -> Point {
        Point::new(self.center_x, self.center_y)
    }
}

impl Validate for SignalLayout {
    fn validate(&self) -> Result<()> {
        if self.size <= 0.0 {
            return Err(anyhow!("Intersection size must be positive"));
        }

        if self.lane_offset < 0.0 {
            return Err(anyhow!("Lane offset must be non-negative"));
        }

        if self.spawn_distance <= 0.0 {
            return Err(anyhow!("Spawn distance must be positive"));
        }

        if self.green_duration <= 0.0 || self.yellow_duration <= 0.0 {
            return Err(anyhow!("Signal phase durations must be positive"));
        }

        Ok(())
    }
}

impl Validate for RoundaboutLayout {
    fn validate(&self) -> Result<()> {
        if self.inner_radius <= 0.0 {
            return Err(anyhow!("Inner radius must be positive"));
        }

        if self.inner_radius >= self.outer_radius {
            return Err(anyhow!(
                "Inner radius {} must be less than outer radius {}",
                self.inner_radius,
                self.outer_radius
            ));
        }

        if self.lane_offset < 0.0 {
            return Err(anyhow!("Lane offset must be non-negative"));
        }

        if self.spawn_distance <= 0.0 {
            return Err(anyhow!("Spawn distance must be positive"));
        }

        Ok(())
    }
}
