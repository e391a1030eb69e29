//! A flat world with posts, low obstacles and floor markings for the rover to drive around in.
//!
//! The world advances by one period on every hazard snapshot, which is when the base would report
//! a fresh odometry packet. Ranging goes through the same conversions as the real drivers.

pub mod source;

use core::convert::Infallible;

use embedded_hal::blocking::delay::DelayMs;
use rovercore::{
    geometry,
    hal::{Audio, CliffReading, Cue, Drive, HazardSensors, HazardSnapshot, Head, Rangefinder},
    pose::Pose,
};
use roversensors::{
    echo::{EchoCapture, Sonar, SonarTiming},
    infrared::IrCalibration,
    servo::ServoCalibration,
};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use uom::si::{
    angle::{degree, radian},
    f64::{Angle, Length, Time, Velocity},
    length::{centimeter, meter},
    time::{millisecond, second},
    velocity::meter_per_second,
};

/// A round obstacle. Flat ones sit below the rangefinder and are only found by the bumper.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub x: Length,
    pub y: Length,
    pub radius: Length,
    #[serde(default)]
    pub flat: bool,
}

impl Obstacle {
    pub fn post(x: f64, y: f64, radius: f64) -> Self {
        Self {
            x: Length::new::<centimeter>(x),
            y: Length::new::<centimeter>(y),
            radius: Length::new::<centimeter>(radius),
            flat: false,
        }
    }

    pub fn flat(x: f64, y: f64, radius: f64) -> Self {
        Self {
            flat: true,
            ..Self::post(x, y, radius)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Surface {
    Drop,
    WhiteTape,
    RedTape,
}

/// An axis-aligned patch of floor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub min_x: Length,
    pub min_y: Length,
    pub max_x: Length,
    pub max_y: Length,
    pub surface: Surface,
}

impl Zone {
    pub fn from_cm(min: (f64, f64), max: (f64, f64), surface: Surface) -> Self {
        let cm = |value: f64| Length::new::<centimeter>(value);
        Self {
            min_x: cm(min.0),
            min_y: cm(min.1),
            max_x: cm(max.0),
            max_y: cm(max.1),
            surface,
        }
    }

    fn contains(&self, x: Length, y: Length) -> bool {
        self.min_x <= x && x <= self.max_x && self.min_y <= y && y <= self.max_y
    }
}

/// Everything that is in the world apart from the rover.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct World {
    pub obstacles: Vec<Obstacle>,
    pub zones: Vec<Zone>,
}

/// Reflectance levels the cliff sensors report per surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FloorLevels {
    pub floor: u16,
    pub white: u16,
    pub red: u16,
}

impl Default for FloorLevels {
    fn default() -> Self {
        Self {
            floor: 300,
            white: 2800,
            red: 1500,
        }
    }
}

/// Cliff sensor mounting angles relative to the heading: front-left, front-right, left, right.
const CLIFF_MOUNTS: [f64; 4] = [15.0, -15.0, 60.0, -60.0];

/// Obstacles this far off the heading press only one side of the bumper.
const BUMPER_SPLIT_DEG: f64 = 10.0;

#[derive(TypedBuilder)]
pub struct Simulator {
    #[builder(default)]
    world: World,
    #[builder(default = Pose::initial())]
    pose: Pose,
    #[builder(default = Time::new::<millisecond>(1.0))]
    period: Time,
    #[builder(default = Length::new::<centimeter>(26.0))]
    wheel_interval: Length,
    #[builder(default = Length::new::<centimeter>(17.0))]
    body_radius: Length,
    /// Reported rotation per real rotation; a worn base under-reports its turns.
    #[builder(default = 1.0)]
    angle_scale: f64,
    /// Farthest distance the infrared sensor sees anything at.
    #[builder(default = Length::new::<centimeter>(80.0))]
    ir_range: Length,
    /// Echo distance reported when nothing is hit.
    #[builder(default = Length::new::<centimeter>(300.0))]
    sonar_range: Length,
    #[builder(default)]
    sonar_timing: SonarTiming,
    #[builder(default)]
    ir_calibration: IrCalibration,
    #[builder(default)]
    servo: ServoCalibration,
    #[builder(default)]
    floor: FloorLevels,
    #[builder(default, setter(skip))]
    capture: EchoCapture,
    #[builder(default, setter(skip))]
    capture_timer: u16,
    #[builder(default, setter(skip))]
    head_compare: u16,
    #[builder(default, setter(skip))]
    left: Velocity,
    #[builder(default, setter(skip))]
    right: Velocity,
    #[builder(default, setter(skip))]
    elapsed_ms: u64,
    #[builder(default, setter(skip))]
    cues: Vec<Cue>,
}

impl Simulator {
    /// Ground truth pose.
    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn head_angle(&self) -> Angle {
        self.servo.angle(self.head_compare)
    }

    pub fn wheels(&self) -> (Velocity, Velocity) {
        (self.left, self.right)
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Distance along the head's line of sight to the first obstacle tall enough to be seen.
    pub fn line_of_sight(&self) -> Option<Length> {
        let bearing =
            self.pose.heading - Angle::new::<degree>(90.0) + self.head_angle();
        let (ux, uy) = (bearing.value.cos(), bearing.value.sin());
        self.world
            .obstacles
            .iter()
            .filter(|obstacle| !obstacle.flat)
            .filter_map(|obstacle| {
                let wx = (obstacle.x - self.pose.x).get::<meter>();
                let wy = (obstacle.y - self.pose.y).get::<meter>();
                let along = wx * ux + wy * uy;
                let off2 = wx * wx + wy * wy - along * along;
                let r = obstacle.radius.get::<meter>();
                if along <= 0.0 || off2 > r * r {
                    return None;
                }
                Some(along - (r * r - off2).sqrt())
            })
            .fold(None, |nearest: Option<f64>, hit| match nearest {
                Some(current) if current <= hit => Some(current),
                _ => Some(hit),
            })
            .map(|hit| Length::new::<meter>(hit))
    }

    fn contact(&self) -> (bool, bool) {
        let mut contact = (false, false);
        for obstacle in &self.world.obstacles {
            let dx = obstacle.x - self.pose.x;
            let dy = obstacle.y - self.pose.y;
            if geometry::distance(dx, dy) > self.body_radius + obstacle.radius {
                continue;
            }
            let mut relative = (geometry::bearing(dx, dy).angle() - self.pose.heading)
                .get::<degree>();
            if relative > 180.0 {
                relative -= 360.0;
            } else if relative < -180.0 {
                relative += 360.0;
            }
            if relative.abs() >= 90.0 {
                continue;
            }
            if relative > -BUMPER_SPLIT_DEG {
                contact.0 = true;
            }
            if relative < BUMPER_SPLIT_DEG {
                contact.1 = true;
            }
        }
        contact
    }

    fn cliff_reading(&self, mount: f64) -> CliffReading {
        let (x, y) = geometry::project(
            self.pose.x,
            self.pose.y,
            self.body_radius * 0.9,
            self.pose.heading + Angle::new::<degree>(mount),
        );
        let surface = self
            .world
            .zones
            .iter()
            .find(|zone| zone.contains(x, y))
            .map(|zone| zone.surface);
        match surface {
            Some(Surface::Drop) => CliffReading {
                level: 0,
                tripped: true,
            },
            Some(Surface::WhiteTape) => CliffReading {
                level: self.floor.white,
                tripped: false,
            },
            Some(Surface::RedTape) => CliffReading {
                level: self.floor.red,
                tripped: false,
            },
            None => CliffReading {
                level: self.floor.floor,
                tripped: false,
            },
        }
    }

    fn advance_clock(&mut self, ms: u64) {
        self.elapsed_ms += ms;
        let ticks = ms as f64 * self.sonar_timing.tick_frequency.value / 1000.0;
        self.capture_timer = self.capture_timer.wrapping_add(ticks as u64 as u16);
    }

    fn step(&mut self) -> (Length, Angle) {
        let dt = self.period.get::<second>();
        let left = self.left.get::<meter_per_second>();
        let right = self.right.get::<meter_per_second>();
        let distance = Length::new::<meter>((left + right) / 2.0 * dt);
        let turn = Angle::new::<radian>(
            (right - left) / self.wheel_interval.get::<meter>() * dt,
        );

        let (x, y) = geometry::project(self.pose.x, self.pose.y, distance, self.pose.heading);
        self.pose = Pose::new(x, y, self.pose.heading + turn);
        self.advance_clock((self.period.get::<millisecond>()).round() as u64);
        (distance, turn)
    }
}

impl Rangefinder for Simulator {
    type Error = Infallible;

    fn trigger_pulse(&mut self) {
        self.capture.arm();
        let distance = self.line_of_sight().unwrap_or(self.sonar_range);
        let rise = self.capture_timer;
        self.capture.on_capture(rise);
        self.capture
            .on_capture(rise.wrapping_add(self.sonar_timing.ticks(distance)));
    }

    fn sonar_distance(&mut self) -> nb::Result<Length, Infallible> {
        Sonar::new(&self.capture, self.sonar_timing).distance()
    }

    fn ir_distance(&mut self) -> nb::Result<Length, Infallible> {
        let level = match self.line_of_sight() {
            Some(distance) if distance <= self.ir_range => self.ir_calibration.level(distance),
            _ => 0,
        };
        Ok(self
            .ir_calibration
            .distance(level)
            .unwrap_or_else(|| Length::new::<meter>(f64::INFINITY)))
    }
}

impl Head for Simulator {
    fn move_to(&mut self, angle: Angle) {
        self.head_compare = self.servo.compare(angle).0;
    }
}

impl Drive for Simulator {
    fn set_wheel_velocities(&mut self, left: Velocity, right: Velocity) {
        self.left = left;
        self.right = right;
    }
}

impl HazardSensors for Simulator {
    type Error = Infallible;

    fn snapshot(&mut self) -> nb::Result<HazardSnapshot, Infallible> {
        let (distance, turn) = self.step();
        let (bumper_left, bumper_right) = self.contact();
        Ok(HazardSnapshot {
            cliff_front_left: self.cliff_reading(CLIFF_MOUNTS[0]),
            cliff_front_right: self.cliff_reading(CLIFF_MOUNTS[1]),
            cliff_left: self.cliff_reading(CLIFF_MOUNTS[2]),
            cliff_right: self.cliff_reading(CLIFF_MOUNTS[3]),
            bumper_left,
            bumper_right,
            odometry_distance: distance,
            odometry_angle: turn * self.angle_scale,
        })
    }
}

impl Audio for Simulator {
    fn play(&mut self, cue: Cue) {
        log::info!("playing {:?}", cue);
        self.cues.push(cue);
    }
}

impl DelayMs<u32> for Simulator {
    fn delay_ms(&mut self, ms: u32) {
        self.advance_clock(ms as u64);
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn deg(value: f64) -> Angle {
        Angle::new::<degree>(value)
    }

    #[test]
    fn test_line_of_sight() {
        let mut sim = Simulator::builder()
            .world(World {
                obstacles: vec![Obstacle::post(0.0, 40.0, 5.0), Obstacle::flat(0.0, 20.0, 5.0)],
                zones: vec![],
            })
            .build();
        sim.move_to(deg(90.0));
        let distance = sim.line_of_sight().unwrap();
        assert!((distance.get::<centimeter>() - 35.0).abs() < 0.5);
        sim.move_to(deg(0.0));
        assert_eq!(sim.line_of_sight(), None);
    }

    #[test]
    fn test_ranging_goes_through_drivers() {
        let mut sim = Simulator::builder()
            .world(World {
                obstacles: vec![Obstacle::post(0.0, 40.0, 5.0)],
                zones: vec![],
            })
            .build();
        sim.move_to(deg(90.0));
        assert_eq!(sim.sonar_distance(), Err(nb::Error::WouldBlock));
        sim.trigger_pulse();
        let truth = sim.line_of_sight().unwrap().get::<centimeter>();
        let sonar = sim.sonar_distance().unwrap().get::<centimeter>();
        assert!((sonar - truth).abs() < 0.1);
        let ir = sim.ir_distance().unwrap().get::<centimeter>();
        assert!((ir - truth).abs() < 0.2);

        sim.move_to(deg(0.0));
        sim.trigger_pulse();
        assert!((sim.sonar_distance().unwrap().get::<centimeter>() - 300.0).abs() < 0.1);
        assert!(sim.ir_distance().unwrap().get::<centimeter>().is_infinite());
    }

    #[test]
    fn test_drive_straight() {
        let mut sim = Simulator::builder().build();
        let speed = Velocity::new::<meter_per_second>(0.15);
        sim.set_wheel_velocities(speed, speed);
        for _ in 0..1000 {
            sim.snapshot().unwrap();
        }
        assert_relative_eq!(sim.pose().y.get::<centimeter>(), 15.0, epsilon = 1e-6);
        assert_relative_eq!(sim.pose().heading.get::<degree>(), 90.0, epsilon = 1e-9);
        assert_eq!(sim.elapsed_ms(), 1000);
    }

    #[test]
    fn test_bumper_sides() {
        let sim = Simulator::builder()
            .world(World {
                obstacles: vec![Obstacle::flat(-10.0, 15.0, 3.0)],
                zones: vec![],
            })
            .build();
        assert_eq!(sim.contact(), (true, false));

        let sim = Simulator::builder()
            .world(World {
                obstacles: vec![Obstacle::flat(0.0, 19.0, 3.0)],
                zones: vec![],
            })
            .build();
        assert_eq!(sim.contact(), (true, true));
    }

    #[test]
    fn test_cliff_levels() {
        let mut sim = Simulator::builder()
            .world(World {
                obstacles: vec![],
                zones: vec![
                    Zone::from_cm((-50.0, 10.0), (50.0, 30.0), Surface::RedTape),
                    Zone::from_cm((-50.0, -30.0), (50.0, -10.0), Surface::Drop),
                ],
            })
            .build();
        let snapshot = sim.snapshot().unwrap();
        assert_eq!(snapshot.cliff_front_left.level, 1500);
        assert!(!snapshot.cliff_front_left.tripped);
        // The side sensors sit further back and still see the floor.
        assert_eq!(snapshot.cliff_left.level, 300);
        assert_eq!(snapshot.cliff_right.level, 300);
        assert!(!snapshot.bumper_left);
    }
}
