use uom::si::{
    angle::degree,
    f64::{Angle, Length},
};

use crate::config::{MergeConfig, ScanConfig};
use crate::geometry;
use crate::objects::{DetectedObject, ObjectTable};
use crate::pose::Pose;

/// One reading of the rangefinder pair at a single head angle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScanSample {
    pub ir: Length,
    pub sonar: Length,
}

/// What a sample did to the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Detection {
    Pending,
    /// A run ended shorter than the validation minimum and was dropped as noise.
    Discarded { samples: usize },
    Committed(usize),
    /// The run was committed and then removed again as a copy of the object at `of`.
    Duplicate { of: usize },
    /// The run was valid but the table had no room for it.
    Rejected,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Run {
    samples: usize,
    start_angle: Angle,
    end_angle: Angle,
    sonar_at_start: Length,
    /// Sum of the IR readings after the first one.
    ir_sum: Length,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Phase {
    Idle,
    Accumulating(Run),
}

/// Turns runs of in-range samples into object records.
#[derive(Clone, Debug)]
pub struct ObjectDetector {
    phase: Phase,
    last_ir: Length,
    last_sonar: Length,
}

impl Default for ObjectDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectDetector {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            last_ir: Length::default(),
            last_sonar: Length::default(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Feeds the sample taken at head angle `angle` while the robot stands at `pose`.
    pub fn feed<const N: usize>(
        &mut self,
        angle: Angle,
        sample: ScanSample,
        pose: &Pose,
        table: &mut ObjectTable<N>,
        merge: &MergeConfig,
        config: &ScanConfig,
    ) -> Detection {
        let detection = if config.in_range(sample.ir) {
            match &mut self.phase {
                Phase::Idle => {
                    log::debug!("run starts at {:.0} deg", angle.get::<degree>());
                    self.phase = Phase::Accumulating(Run {
                        samples: 1,
                        start_angle: angle,
                        end_angle: angle,
                        sonar_at_start: sample.sonar,
                        ir_sum: Length::default(),
                    });
                }
                Phase::Accumulating(run) => {
                    run.samples += 1;
                    run.ir_sum += sample.ir;
                    run.end_angle = angle;
                }
            }
            Detection::Pending
        } else {
            self.close(pose, table, merge, config)
        };
        self.last_ir = sample.ir;
        self.last_sonar = sample.sonar;
        detection
    }

    /// Closes a run that is still open when the sweep ends.
    pub fn finish<const N: usize>(
        &mut self,
        pose: &Pose,
        table: &mut ObjectTable<N>,
        merge: &MergeConfig,
        config: &ScanConfig,
    ) -> Detection {
        self.close(pose, table, merge, config)
    }

    fn close<const N: usize>(
        &mut self,
        pose: &Pose,
        table: &mut ObjectTable<N>,
        merge: &MergeConfig,
        config: &ScanConfig,
    ) -> Detection {
        let run = match self.phase {
            Phase::Idle => return Detection::Pending,
            Phase::Accumulating(run) => run,
        };
        self.phase = Phase::Idle;

        if run.samples < config.min_validation {
            log::warn!(
                "dropped a run of {} samples at {:.0} deg",
                run.samples,
                run.start_angle.get::<degree>()
            );
            return Detection::Discarded {
                samples: run.samples,
            };
        }

        let object = self.measure(&run, pose, config);
        let index = match table.push(object) {
            Ok(index) => index,
            Err(err) => {
                log::warn!("object at {:.1} deg not stored: {}", object.bearing.get::<degree>(), err);
                return Detection::Rejected;
            }
        };
        if let Some(of) = table.merge_last(merge) {
            log::debug!("object {} seen again", of);
            return Detection::Duplicate { of };
        }
        log::info!(
            "object {}: {:?}, bearing {:.1} deg, width {:.1} deg",
            index,
            object.category,
            object.bearing.get::<degree>(),
            object.angular_width.get::<degree>()
        );
        Detection::Committed(index)
    }

    fn measure(&self, run: &Run, pose: &Pose, config: &ScanConfig) -> DetectedObject {
        let angular_width = run.end_angle - run.start_angle;
        let sonar_distance = (run.sonar_at_start + self.last_sonar) / 2.0;
        let ir_distance = if run.samples > 1 {
            run.ir_sum / (run.samples - 1) as f64
        } else {
            self.last_ir
        };
        let linear_width = geometry::chord_width(sonar_distance, angular_width);

        let scan_bearing = run.start_angle + angular_width / 2.0;
        let bearing =
            geometry::normalize(pose.heading - Angle::new::<degree>(90.0) + scan_bearing);
        let (x, y) = geometry::project(pose.x, pose.y, sonar_distance, bearing);

        DetectedObject {
            category: config.classify(linear_width),
            angular_width,
            linear_width,
            sonar_distance,
            ir_distance,
            bearing,
            x,
            y,
        }
    }
}
