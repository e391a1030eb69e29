//! The motion interlock: drives the wheels tick by tick and backs out of trouble.

use embedded_hal::blocking::delay::DelayMs;
use uom::si::{
    angle::degree,
    f64::{Angle, Length, Velocity},
    length::centimeter,
};

use crate::config::{CliffCalibration, RoverConfig};
use crate::error::{Error, Wait};
use crate::geometry;
use crate::hal::{poll_bounded, CliffReading, Drive, HazardSensors, HazardSnapshot};
use crate::objects::{Category, DetectedObject, ObjectTable};
use crate::pose::PoseTracker;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CliffSite {
    FrontLeft,
    FrontRight,
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BumperHit {
    Left,
    Right,
    Both,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hazard {
    Cliff(CliffSite, Category),
    Bumper(BumperHit),
}

impl Hazard {
    /// Category of the table entry the hazard is logged as.
    pub fn category(&self) -> Category {
        match self {
            Hazard::Cliff(_, category) => *category,
            Hazard::Bumper(_) => Category::Flat,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionOutcome {
    /// Net distance applied to the pose, recovery moves included.
    pub travelled: Length,
    pub hazard: Option<Hazard>,
}

/// Category of a single under-body reading, if it triggers at all.
pub fn classify_cliff(reading: CliffReading, calibration: CliffCalibration) -> Option<Category> {
    if reading.tripped {
        Some(Category::Cliff)
    } else if reading.level >= calibration.white_threshold {
        Some(Category::WhiteTape)
    } else if reading.level > calibration.threshold {
        Some(Category::RedTape)
    } else {
        None
    }
}

/// One uninterrupted wheel command.
#[derive(Clone, Copy, Debug)]
struct Leg {
    travelled: Length,
    hazard: Option<Hazard>,
    last: HazardSnapshot,
}

pub struct Interlock<'a> {
    config: &'a RoverConfig,
}

impl<'a> Interlock<'a> {
    pub fn new(config: &'a RoverConfig) -> Self {
        Self { config }
    }

    /// First triggered hazard of `snapshot`: front cliffs, side cliffs, then bumpers.
    pub fn hazard(&self, snapshot: &HazardSnapshot) -> Option<Hazard> {
        let config = &self.config.interlock;
        let cliffs = [
            (
                CliffSite::FrontLeft,
                snapshot.cliff_front_left,
                config.cliff_front_left,
            ),
            (
                CliffSite::FrontRight,
                snapshot.cliff_front_right,
                config.cliff_front_right,
            ),
            (CliffSite::Left, snapshot.cliff_left, config.cliff_left),
            (CliffSite::Right, snapshot.cliff_right, config.cliff_right),
        ];
        for (site, reading, calibration) in cliffs {
            if let Some(category) = classify_cliff(reading, calibration) {
                return Some(Hazard::Cliff(site, category));
            }
        }
        match (snapshot.bumper_left, snapshot.bumper_right) {
            (true, true) => Some(Hazard::Bumper(BumperHit::Both)),
            (true, false) => Some(Hazard::Bumper(BumperHit::Left)),
            (false, true) => Some(Hazard::Bumper(BumperHit::Right)),
            (false, false) => None,
        }
    }

    fn cliff_at(&self, site: CliffSite, snapshot: &HazardSnapshot) -> bool {
        let config = &self.config.interlock;
        let (reading, calibration) = match site {
            CliffSite::FrontLeft => (snapshot.cliff_front_left, config.cliff_front_left),
            CliffSite::FrontRight => (snapshot.cliff_front_right, config.cliff_front_right),
            CliffSite::Left => (snapshot.cliff_left, config.cliff_left),
            CliffSite::Right => (snapshot.cliff_right, config.cliff_right),
        };
        classify_cliff(reading, calibration).is_some()
    }

    /// Drives `distance` along the current heading, watching the hazard sensors on every tick.
    ///
    /// On a hazard the motion stops, the hazard is logged into `table` at the robot's position
    /// and the matching recovery runs. The pose is updated once with the net distance, including
    /// when a leg fails partway.
    pub fn translate<P, const N: usize>(
        &self,
        platform: &mut P,
        tracker: &mut PoseTracker,
        table: &mut ObjectTable<N>,
        distance: Length,
    ) -> Result<MotionOutcome, Error>
    where
        P: Drive + HazardSensors + DelayMs<u32>,
    {
        let mut net = Length::default();
        let leg = match self.drive(platform, distance, true, &mut net) {
            Ok(leg) => leg,
            Err(err) => {
                tracker.apply_translation(net);
                return Err(err);
            }
        };
        let hazard = match leg.hazard {
            None => {
                tracker.apply_translation(net);
                log::info!("moved {:.1} cm", net.get::<centimeter>());
                return Ok(MotionOutcome {
                    travelled: net,
                    hazard: None,
                });
            }
            Some(hazard) => hazard,
        };

        let pose = *tracker.pose();
        let (x, y) = geometry::project(pose.x, pose.y, leg.travelled, pose.heading);
        log::info!(
            "{:?} after {:.1} cm, logged at ({:.1}, {:.1})",
            hazard,
            leg.travelled.get::<centimeter>(),
            x.get::<centimeter>(),
            y.get::<centimeter>()
        );
        if let Err(err) = table.push(DetectedObject::hazard(hazard.category(), x, y, pose.heading)) {
            log::warn!("hazard not logged: {}", err);
        }

        let recovery = self.back_off(platform, hazard, distance - leg.travelled, distance, &mut net);
        tracker.apply_translation(net);
        recovery?;
        if let Hazard::Bumper(side @ (BumperHit::Left | BumperHit::Right)) = hazard {
            platform.delay_ms(self.config.motion.pause_ms);
            let turn = self.config.interlock.bumper_turn;
            let turn = if side == BumperHit::Left { -turn } else { turn };
            self.rotate(platform, tracker, turn)?;
        }
        log::info!("net move {:.1} cm", net.get::<centimeter>());
        Ok(MotionOutcome {
            travelled: net,
            hazard: Some(hazard),
        })
    }

    /// Reverses out of `hazard`. Every tick of every leg is added to `net`, so a failed leg
    /// still leaves the distance actually covered.
    fn back_off<P>(
        &self,
        platform: &mut P,
        hazard: Hazard,
        remaining: Length,
        distance: Length,
        net: &mut Length,
    ) -> Result<(), Error>
    where
        P: Drive + HazardSensors + DelayMs<u32>,
    {
        match hazard {
            Hazard::Cliff(site, _) => {
                let attempts = self.config.interlock.max_recovery_attempts.max(1);
                for attempt in 1..=attempts {
                    let back = self.drive(platform, -distance, false, net)?;
                    if !self.cliff_at(site, &back.last) {
                        return Ok(());
                    }
                    log::warn!("{:?} cliff still seen after reversal {}", site, attempt);
                }
                Err(Error::HazardPersists)
            }
            Hazard::Bumper(BumperHit::Both) => {
                self.drive(platform, -remaining, false, net)?;
                Ok(())
            }
            Hazard::Bumper(_) => {
                self.drive(platform, -self.config.interlock.bumper_recovery, false, net)?;
                Ok(())
            }
        }
    }

    /// Turns in place by `angle`, counter-clockwise positive, and returns the measured turn.
    pub fn rotate<P>(
        &self,
        platform: &mut P,
        tracker: &mut PoseTracker,
        angle: Angle,
    ) -> Result<Angle, Error>
    where
        P: Drive + HazardSensors + DelayMs<u32>,
    {
        let mut turned = Angle::default();
        if angle.value == 0.0 {
            return Ok(turned);
        }
        let speed = self.config.motion.wheel_speed;
        let (left, right) = if angle.value > 0.0 {
            (-speed, speed)
        } else {
            (speed, -speed)
        };
        platform.set_wheel_velocities(left, right);

        let gain = self.config.motion.rotation_gain;
        let mut stalled = 0;
        let result = loop {
            let snapshot = match self.snapshot(platform) {
                Ok(snapshot) => snapshot,
                Err(err) => break Err(err),
            };
            let step = snapshot.odometry_angle * gain;
            turned += step;
            if let Err(err) = self.check_stall(step.value, &mut stalled) {
                break Err(err);
            }
            if turned.abs() >= angle.abs() {
                break Ok(());
            }
        };
        platform.stop();
        tracker.apply_rotation(turned);
        result?;

        log::info!("turned {:.1} deg", turned.get::<degree>());
        Ok(turned)
    }

    /// One wheel command toward `target`. Each measured step is also added to `net`.
    fn drive<P>(
        &self,
        platform: &mut P,
        target: Length,
        watch: bool,
        net: &mut Length,
    ) -> Result<Leg, Error>
    where
        P: Drive + HazardSensors + DelayMs<u32>,
    {
        let mut leg = Leg {
            travelled: Length::default(),
            hazard: None,
            last: HazardSnapshot::default(),
        };
        if target.value == 0.0 {
            return Ok(leg);
        }
        let speed: Velocity = if target.value > 0.0 {
            self.config.motion.wheel_speed
        } else {
            -self.config.motion.wheel_speed
        };
        platform.set_wheel_velocities(speed, speed);

        let gain = self.config.motion.translation_gain;
        let mut stalled = 0;
        let result = loop {
            let snapshot = match self.snapshot(platform) {
                Ok(snapshot) => snapshot,
                Err(err) => break Err(err),
            };
            let step = snapshot.odometry_distance * gain;
            leg.travelled += step;
            *net += step;
            leg.last = snapshot;
            if let Err(err) = self.check_stall(step.value, &mut stalled) {
                break Err(err);
            }
            if watch {
                leg.hazard = self.hazard(&snapshot);
                if leg.hazard.is_some() {
                    break Ok(());
                }
            }
            if leg.travelled.abs() >= target.abs() {
                break Ok(());
            }
        };
        platform.stop();
        result.map(|_| leg)
    }

    fn snapshot<P>(&self, platform: &mut P) -> Result<HazardSnapshot, Error>
    where
        P: HazardSensors + DelayMs<u32>,
    {
        poll_bounded(
            platform,
            self.config.interlock.snapshot_timeout_ms,
            Wait::Odometry,
            |p| p.snapshot(),
        )
    }

    fn check_stall(&self, step: f64, stalled: &mut u32) -> Result<(), Error> {
        if step != 0.0 {
            *stalled = 0;
            return Ok(());
        }
        *stalled += 1;
        if *stalled >= self.config.interlock.stall_ticks {
            log::warn!("no odometry progress for {} ticks", stalled);
            return Err(Error::Timeout(Wait::Odometry));
        }
        Ok(())
    }
}
