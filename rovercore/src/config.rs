//! Tunable parameters of the rover.
//!
//! Every value here is a per-unit calibration or a behaviour knob. The defaults reproduce the
//! reference unit; a deployment overrides whatever differs, e.g. from a calibration file:
//! all structs deserialize with missing fields taking their defaults.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use uom::si::{
    angle::degree,
    f64::{Angle, Length, Velocity},
    length::centimeter,
    velocity::millimeter_per_second,
};

use crate::objects::Category;
use crate::pose::Pose;

#[derive(Clone, Debug, Default, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[serde(default)]
pub struct RoverConfig {
    #[builder(default)]
    pub motion: MotionConfig,
    #[builder(default)]
    pub scan: ScanConfig,
    #[builder(default)]
    pub merge: MergeConfig,
    #[builder(default)]
    pub interlock: InterlockConfig,
    #[builder(default)]
    pub analyzer: AnalyzerConfig,
}

#[derive(Clone, Debug, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Distance of one forward command.
    #[builder(default = Length::new::<centimeter>(15.0))]
    pub travel_distance: Length,
    /// Angle of one turn command.
    #[builder(default = Angle::new::<degree>(45.0))]
    pub turn_angle: Angle,
    #[builder(default = Velocity::new::<millimeter_per_second>(150.0))]
    pub wheel_speed: Velocity,
    /// Factor from reported odometry distance to real distance.
    #[builder(default = 1.0)]
    pub translation_gain: f64,
    /// Factor from reported odometry rotation to real rotation (1.13 on the reference unit).
    #[builder(default = 1.0)]
    pub rotation_gain: f64,
    #[builder(default = Pose::initial())]
    pub initial_pose: Pose,
    /// How long the command loop waits for a byte before polling again.
    #[builder(default = 1000)]
    pub command_timeout_ms: u32,
    /// Pause between the steps of a bumper recovery.
    #[builder(default = 100)]
    pub pause_ms: u32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// An inclusive band of linear widths.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WidthBand {
    pub min: Length,
    pub max: Length,
}

impl WidthBand {
    pub fn from_cm(min: f64, max: f64) -> Self {
        Self {
            min: Length::new::<centimeter>(min),
            max: Length::new::<centimeter>(max),
        }
    }

    pub fn contains(&self, width: Length) -> bool {
        self.min <= width && width <= self.max
    }
}

#[derive(Clone, Debug, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    #[builder(default = Angle::new::<degree>(0.0))]
    pub start_angle: Angle,
    #[builder(default = Angle::new::<degree>(180.0))]
    pub end_angle: Angle,
    #[builder(default = Angle::new::<degree>(1.0))]
    pub step: Angle,
    /// IR readings inside `[detection_min, detection_max]` belong to an object.
    #[builder(default = Length::new::<centimeter>(0.0))]
    pub detection_min: Length,
    #[builder(default = Length::new::<centimeter>(50.0))]
    pub detection_max: Length,
    /// Shortest run of in-range samples that is accepted as an object.
    #[builder(default = 3)]
    pub min_validation: usize,
    /// Time the head needs to settle after each step.
    #[builder(default = 10)]
    pub settle_ms: u32,
    /// Time the head needs to swing back to the start angle.
    #[builder(default = 500)]
    pub home_ms: u32,
    #[builder(default = 50)]
    pub sample_timeout_ms: u32,
    #[builder(default = WidthBand::from_cm(3.0, 6.0))]
    pub small: WidthBand,
    #[builder(default = WidthBand::from_cm(8.0, 10.0))]
    pub medium: WidthBand,
    #[builder(default = WidthBand::from_cm(11.0, 21.0))]
    pub large: WidthBand,
    /// Emit one telemetry line per sample.
    #[builder(default = true)]
    pub print_samples: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ScanConfig {
    pub fn in_range(&self, ir: Length) -> bool {
        self.detection_min <= ir && ir <= self.detection_max
    }

    pub fn classify(&self, linear_width: Length) -> Category {
        if self.small.contains(linear_width) {
            Category::Small
        } else if self.medium.contains(linear_width) {
            Category::Medium
        } else if self.large.contains(linear_width) {
            Category::Large
        } else {
            Category::Unclassified
        }
    }

    /// Number of samples in one sweep.
    pub fn sample_count(&self) -> usize {
        let span = (self.end_angle - self.start_angle).get::<degree>();
        let step = self.step.get::<degree>();
        if step <= 0.0 || span < 0.0 {
            return 1;
        }
        (span / step + 1e-9) as usize + 1
    }
}

/// Windows inside which two detections count as the same object.
#[derive(Clone, Debug, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Applied to world x, world y and sonar distance.
    #[builder(default = Length::new::<centimeter>(8.5))]
    pub distance_tolerance: Length,
    #[builder(default = Angle::new::<degree>(8.5))]
    pub bearing_tolerance: Angle,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Trigger levels of one under-body sensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliffCalibration {
    /// Levels above this trigger the interlock.
    pub threshold: u16,
    /// Levels at or above this come from white tape, the band in between from red tape.
    pub white_threshold: u16,
}

impl CliffCalibration {
    pub const fn new(threshold: u16, white_threshold: u16) -> Self {
        Self {
            threshold,
            white_threshold,
        }
    }
}

#[derive(Clone, Debug, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[serde(default)]
pub struct InterlockConfig {
    #[builder(default = CliffCalibration::new(900, 2600))]
    pub cliff_front_left: CliffCalibration,
    #[builder(default = CliffCalibration::new(670, 2600))]
    pub cliff_front_right: CliffCalibration,
    #[builder(default = CliffCalibration::new(920, 2600))]
    pub cliff_left: CliffCalibration,
    #[builder(default = CliffCalibration::new(550, 2600))]
    pub cliff_right: CliffCalibration,
    /// Distance backed up after a single bumper hit.
    #[builder(default = Length::new::<centimeter>(15.0))]
    pub bumper_recovery: Length,
    /// Turn away from the struck side after backing up.
    #[builder(default = Angle::new::<degree>(90.0))]
    pub bumper_turn: Angle,
    /// Reversals allowed while a cliff stays under the robot.
    #[builder(default = 3)]
    pub max_recovery_attempts: u8,
    /// Consecutive ticks without odometry progress before a motion is abandoned.
    #[builder(default = 200)]
    pub stall_ticks: u32,
    #[builder(default = 50)]
    pub snapshot_timeout_ms: u32,
}

impl Default for InterlockConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// How the closest object of a sweep is picked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClosestMetric {
    /// An object replaces the current pick when its sonar *or* its IR distance is smaller.
    Either,
    /// Only the sonar distance counts.
    Sonar,
}

#[derive(Clone, Debug, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    #[builder(default = ClosestMetric::Either)]
    pub closest_metric: ClosestMetric,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
