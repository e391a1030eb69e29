//! Ultrasonic echo timing shared between the input-capture interrupt and the main loop.

use core::cell::Cell;
use core::convert::Infallible;

use critical_section::Mutex;
use uom::si::{
    f64::{Frequency, Length, Velocity},
    frequency::{hertz, kilohertz},
    length::meter,
    velocity::meter_per_second,
};

/// The timer edge the capture unit has to latch next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
}

/// A complete echo pulse in capture-timer ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Echo {
    pub rise: u16,
    pub fall: u16,
    pub ticks: u16,
}

#[derive(Clone, Copy, Debug)]
struct Slot {
    rise: Option<u16>,
    latest: Option<Echo>,
    fresh: bool,
}

impl Slot {
    const EMPTY: Self = Self {
        rise: None,
        latest: None,
        fresh: false,
    };
}

/// Single-slot cell written by the capture interrupt and read by [`Sonar`].
///
/// Both sides go through a critical section, so a reader never sees the rise of one pulse with
/// the fall of another.
pub struct EchoCapture {
    slot: Mutex<Cell<Slot>>,
}

impl Default for EchoCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl EchoCapture {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(Cell::new(Slot::EMPTY)),
        }
    }

    /// Records a captured edge and returns the edge to capture next.
    pub fn on_capture(&self, timestamp: u16) -> Edge {
        critical_section::with(|cs| {
            let cell = self.slot.borrow(cs);
            let mut slot = cell.get();
            let next = match slot.rise.take() {
                None => {
                    slot.rise = Some(timestamp);
                    Edge::Falling
                }
                Some(rise) => {
                    slot.latest = Some(Echo {
                        rise,
                        fall: timestamp,
                        ticks: timestamp.wrapping_sub(rise),
                    });
                    slot.fresh = true;
                    Edge::Rising
                }
            };
            cell.set(slot);
            next
        })
    }

    /// Forgets a half-captured pulse and marks the latest echo as consumed. Call before a ping.
    pub fn arm(&self) {
        critical_section::with(|cs| {
            let cell = self.slot.borrow(cs);
            let mut slot = cell.get();
            slot.rise = None;
            slot.fresh = false;
            cell.set(slot);
        })
    }

    /// The last complete echo, consumed or not.
    pub fn latest(&self) -> Option<Echo> {
        critical_section::with(|cs| self.slot.borrow(cs).get().latest)
    }

    /// The echo of the current ping, once it is complete.
    pub fn take(&self) -> nb::Result<Echo, Infallible> {
        critical_section::with(|cs| {
            let cell = self.slot.borrow(cs);
            let mut slot = cell.get();
            match slot.latest {
                Some(echo) if slot.fresh => {
                    slot.fresh = false;
                    cell.set(slot);
                    Ok(echo)
                }
                _ => Err(nb::Error::WouldBlock),
            }
        })
    }
}

/// Converts echo ticks into a distance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SonarTiming {
    /// Frequency of the capture timer.
    pub tick_frequency: Frequency,
    pub speed_of_sound: Velocity,
}

impl Default for SonarTiming {
    fn default() -> Self {
        Self {
            tick_frequency: Frequency::new::<kilohertz>(250.0),
            speed_of_sound: Velocity::new::<meter_per_second>(343.0),
        }
    }
}

impl SonarTiming {
    /// One-way distance of an echo that took `ticks` for the round trip.
    pub fn distance(&self, ticks: u16) -> Length {
        let seconds = ticks as f64 / self.tick_frequency.get::<hertz>();
        Length::new::<meter>(seconds * self.speed_of_sound.get::<meter_per_second>() / 2.0)
    }

    /// Ticks of the round trip to an obstacle at `distance`, saturating at the timer range.
    pub fn ticks(&self, distance: Length) -> u16 {
        let seconds = 2.0 * distance.get::<meter>() / self.speed_of_sound.get::<meter_per_second>();
        let ticks = seconds * self.tick_frequency.get::<hertz>();
        if ticks >= u16::MAX as f64 {
            u16::MAX
        } else if ticks <= 0.0 {
            0
        } else {
            (ticks + 0.5) as u16
        }
    }
}

/// Reads distances from an [`EchoCapture`].
pub struct Sonar<'a> {
    capture: &'a EchoCapture,
    timing: SonarTiming,
}

impl<'a> Sonar<'a> {
    pub fn new(capture: &'a EchoCapture, timing: SonarTiming) -> Self {
        Self { capture, timing }
    }

    pub fn distance(&mut self) -> nb::Result<Length, Infallible> {
        let echo = self.capture.take()?;
        let distance = self.timing.distance(echo.ticks);
        log::trace!("echo of {} ticks", echo.ticks);
        Ok(distance)
    }
}
