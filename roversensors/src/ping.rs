//! Trigger side of the ultrasonic ranger.

use embedded_hal::{blocking::delay::DelayUs, digital::v2::OutputPin};

use crate::echo::EchoCapture;

pub struct Ping<P>
where
    P: OutputPin,
{
    pin: P,
    pulse_us: u32,
}

impl<P> Ping<P>
where
    P: OutputPin,
{
    pub fn new(pin: P, pulse_us: u32) -> Self {
        Self { pin, pulse_us }
    }

    /// Arms `capture` and sends one trigger pulse.
    pub fn trigger<D: DelayUs<u32>>(
        &mut self,
        capture: &EchoCapture,
        delay: &mut D,
    ) -> Result<(), P::Error> {
        capture.arm();
        self.pin.set_high()?;
        delay.delay_us(self.pulse_us);
        self.pin.set_low()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Line {
        events: Vec<&'static str>,
    }

    impl OutputPin for Line {
        type Error = core::convert::Infallible;

        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.events.push("low");
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.events.push("high");
            Ok(())
        }
    }

    struct Clock(u32);

    impl DelayUs<u32> for Clock {
        fn delay_us(&mut self, us: u32) {
            self.0 += us;
        }
    }

    #[test]
    fn test_trigger_pulse() {
        let capture = EchoCapture::new();
        capture.on_capture(5);
        capture.on_capture(50);

        let mut ping = Ping::new(Line::default(), 1000);
        let mut clock = Clock(0);
        ping.trigger(&capture, &mut clock).unwrap();

        assert_eq!(ping.pin.events, ["high", "low"]);
        assert_eq!(clock.0, 1000);
        assert_eq!(capture.take(), Err(nb::Error::WouldBlock));
    }
}
