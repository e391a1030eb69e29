//! Dead reckoning of the robot pose.

use serde::{Deserialize, Serialize};
use uom::si::{
    angle::degree,
    f64::{Angle, Length},
};

use crate::geometry;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: Length,
    pub y: Length,
    /// Always inside `[0, 360)` degrees.
    pub heading: Angle,
}

impl Pose {
    pub fn new(x: Length, y: Length, heading: Angle) -> Self {
        Self {
            x,
            y,
            heading: geometry::normalize(heading),
        }
    }

    /// Pose of a freshly started robot: at the origin, facing +y.
    pub fn initial() -> Self {
        Self::new(
            Length::default(),
            Length::default(),
            Angle::new::<degree>(90.0),
        )
    }
}

#[derive(Clone, Debug)]
pub struct PoseTracker {
    initial: Pose,
    pose: Pose,
}

impl Default for PoseTracker {
    fn default() -> Self {
        Self::new(Pose::initial())
    }
}

impl PoseTracker {
    pub fn new(initial: Pose) -> Self {
        Self {
            initial,
            pose: initial,
        }
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    /// Moves the pose by the net signed distance of a completed translation.
    pub fn apply_translation(&mut self, distance: Length) {
        let (x, y) = geometry::project(self.pose.x, self.pose.y, distance, self.pose.heading);
        self.pose.x = x;
        self.pose.y = y;
    }

    /// Turns the pose by the net signed angle of a completed rotation, counter-clockwise positive.
    pub fn apply_rotation(&mut self, delta: Angle) {
        self.pose.heading = geometry::normalize(self.pose.heading + delta);
    }

    pub fn reinitialize(&mut self) {
        self.pose = self.initial;
    }
}
