//! Interfaces of the drivers the core runs on.
//!
//! Readings follow the `nb` convention: `WouldBlock` means the driver has no fresh value yet and
//! the caller polls again, every other error is a hard failure of the peripheral.

use embedded_hal::blocking::delay::DelayMs;
use serde::{Deserialize, Serialize};
use uom::si::f64::{Angle, Length, Velocity};

/// The infrared and ultrasonic rangefinder pair mounted on the head.
pub trait Rangefinder {
    type Error: core::fmt::Debug;

    /// Emits one ultrasonic ping. The echo is read by [`Rangefinder::sonar_distance`].
    fn trigger_pulse(&mut self);
    fn sonar_distance(&mut self) -> nb::Result<Length, Self::Error>;
    fn ir_distance(&mut self) -> nb::Result<Length, Self::Error>;
}

/// The servo turning the rangefinder head. 0 deg points to the right of the robot, 90 deg straight
/// ahead and 180 deg to the left.
pub trait Head {
    fn move_to(&mut self, angle: Angle);
}

pub trait Drive {
    fn set_wheel_velocities(&mut self, left: Velocity, right: Velocity);

    fn stop(&mut self) {
        self.set_wheel_velocities(Velocity::default(), Velocity::default());
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliffReading {
    /// Raw reflectance level of the under-body sensor.
    pub level: u16,
    /// Set by the base when the sensor sees no floor at all.
    pub tripped: bool,
}

/// Everything the interlock reads during one control tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HazardSnapshot {
    pub cliff_front_left: CliffReading,
    pub cliff_front_right: CliffReading,
    pub cliff_left: CliffReading,
    pub cliff_right: CliffReading,
    pub bumper_left: bool,
    pub bumper_right: bool,
    /// Distance travelled since the previous snapshot.
    pub odometry_distance: Length,
    /// Rotation since the previous snapshot, counter-clockwise positive.
    pub odometry_angle: Angle,
}

pub trait HazardSensors {
    type Error: core::fmt::Debug;

    /// Reads the sensors once. Each call consumes one control tick of odometry.
    fn snapshot(&mut self) -> nb::Result<HazardSnapshot, Self::Error>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cue {
    Primary,
    Secondary,
}

pub trait Audio {
    fn play(&mut self, cue: Cue);
}

/// The serial link commands arrive on.
pub trait CommandSource {
    type Error: core::fmt::Debug;

    fn read_byte(&mut self) -> nb::Result<u8, Self::Error>;
    fn echo(&mut self, byte: u8);
}

/// All peripherals the rover drives.
pub trait Platform: Rangefinder + Head + Drive + HazardSensors + Audio + DelayMs<u32> {}

impl<T> Platform for T where T: Rangefinder + Head + Drive + HazardSensors + Audio + DelayMs<u32> {}

/// Polls `read` until it yields a value, waiting one millisecond between attempts.
///
/// Gives up with `Timeout(wait)` once `timeout_ms` milliseconds have passed without a value.
pub(crate) fn poll_bounded<T, E, D>(
    delay: &mut D,
    timeout_ms: u32,
    wait: crate::error::Wait,
    mut read: impl FnMut(&mut D) -> nb::Result<T, E>,
) -> Result<T, crate::Error>
where
    E: core::fmt::Debug,
    D: DelayMs<u32>,
{
    let mut waited = 0;
    loop {
        match read(delay) {
            Ok(value) => return Ok(value),
            Err(nb::Error::WouldBlock) => {
                if waited >= timeout_ms {
                    log::warn!("{:?} wait timed out after {} ms", wait, waited);
                    return Err(crate::Error::Timeout(wait));
                }
                delay.delay_ms(1);
                waited += 1;
            }
            Err(nb::Error::Other(err)) => {
                log::warn!("{:?} driver failed: {:?}", wait, err);
                return Err(crate::Error::Sensor(wait));
            }
        }
    }
}
