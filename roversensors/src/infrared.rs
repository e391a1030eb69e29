//! Infrared rangefinder behind an ADC channel.

use embedded_hal::adc::{Channel, OneShot};
#[allow(unused_imports)]
use num_traits::Float;
use uom::si::{f64::Length, length::centimeter};

/// Power-law fit `gain * adc^exponent` from the raw ADC level to centimetres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IrCalibration {
    pub gain: f64,
    pub exponent: f64,
}

impl Default for IrCalibration {
    fn default() -> Self {
        Self {
            gain: 31427.0,
            exponent: -1.171,
        }
    }
}

impl IrCalibration {
    /// `None` for a zero level, which means no reflection at all.
    pub fn distance(&self, adc: u16) -> Option<Length> {
        if adc == 0 {
            return None;
        }
        Some(Length::new::<centimeter>(
            self.gain * (adc as f64).powf(self.exponent),
        ))
    }

    /// The ADC level that reads as `distance`.
    pub fn level(&self, distance: Length) -> u16 {
        let level = (distance.get::<centimeter>() / self.gain).powf(1.0 / self.exponent);
        if !level.is_finite() || level >= u16::MAX as f64 {
            u16::MAX
        } else {
            (level + 0.5) as u16
        }
    }

    pub fn mean(samples: &[u16]) -> Option<u16> {
        if samples.is_empty() {
            return None;
        }
        let sum: u32 = samples.iter().map(|&sample| sample as u32).sum();
        Some((sum / samples.len() as u32) as u16)
    }
}

/// Averages [`Infrared::SAMPLES`] conversions per reading.
pub struct Infrared<A, ADC, P>
where
    A: OneShot<ADC, u16, P>,
    P: Channel<ADC>,
{
    adc: A,
    pin: P,
    calibration: IrCalibration,
    samples: [u16; 5],
    count: usize,
    _adc: core::marker::PhantomData<ADC>,
}

impl<A, ADC, P> Infrared<A, ADC, P>
where
    A: OneShot<ADC, u16, P>,
    P: Channel<ADC>,
{
    pub const SAMPLES: usize = 5;

    pub fn new(adc: A, pin: P, calibration: IrCalibration) -> Self {
        Self {
            adc,
            pin,
            calibration,
            samples: [0; 5],
            count: 0,
            _adc: core::marker::PhantomData,
        }
    }

    /// Takes one more conversion and yields the distance once all samples are in.
    ///
    /// A level of zero reads as infinitely far.
    pub fn distance(&mut self) -> nb::Result<Length, A::Error> {
        let sample = self.adc.read(&mut self.pin)?;
        self.samples[self.count] = sample;
        self.count += 1;
        if self.count < Self::SAMPLES {
            return Err(nb::Error::WouldBlock);
        }
        self.count = 0;
        let mean = IrCalibration::mean(&self.samples).unwrap_or_default();
        Ok(self
            .calibration
            .distance(mean)
            .unwrap_or_else(|| Length::new::<centimeter>(f64::INFINITY)))
    }
}
