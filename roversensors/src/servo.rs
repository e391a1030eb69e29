//! Hobby servo turning the rangefinder head.

use embedded_hal::PwmPin;
use uom::si::{angle::degree, f64::Angle};

/// Compare values of the servo timer at both ends of the travel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServoCalibration {
    /// Timer top, i.e. the pulse period in ticks.
    pub top: u16,
    /// Compare value of the 0 deg end (head pointing right).
    pub zero: u16,
    /// Compare value of the 180 deg end (head pointing left).
    pub one_eighty: u16,
}

impl Default for ServoCalibration {
    fn default() -> Self {
        Self {
            top: 43000,
            zero: 900,
            one_eighty: 4350,
        }
    }
}

impl ServoCalibration {
    /// Compare value for `angle` and the angle actually commanded after clamping into
    /// `[0, 180]` deg.
    pub fn compare(&self, angle: Angle) -> (u16, Angle) {
        let deg = angle.get::<degree>().max(0.0).min(180.0);
        let span = self.one_eighty as f64 - self.zero as f64;
        let compare = self.zero as f64 + deg / 180.0 * span - 1.0;
        let compare = if compare <= 0.0 { 0 } else { compare as u16 };
        (compare, Angle::new::<degree>(deg))
    }

    /// Inverse of [`ServoCalibration::compare`].
    pub fn angle(&self, compare: u16) -> Angle {
        let span = self.one_eighty as f64 - self.zero as f64;
        let deg = (compare as f64 + 1.0 - self.zero as f64) / span * 180.0;
        Angle::new::<degree>(deg.max(0.0).min(180.0))
    }
}

pub struct Servo<P>
where
    P: PwmPin<Duty = u16>,
{
    pwm: P,
    calibration: ServoCalibration,
    angle: Angle,
}

impl<P> Servo<P>
where
    P: PwmPin<Duty = u16>,
{
    pub fn new(mut pwm: P, calibration: ServoCalibration) -> Self {
        pwm.enable();
        Self {
            pwm,
            calibration,
            angle: Angle::default(),
        }
    }

    /// Starts moving towards `angle` and returns the clamped target.
    pub fn move_to(&mut self, angle: Angle) -> Angle {
        let (compare, clamped) = self.calibration.compare(angle);
        if clamped != angle {
            log::debug!(
                "head angle {:.1} deg out of range",
                angle.get::<degree>()
            );
        }
        self.pwm.set_duty(compare);
        self.angle = clamped;
        clamped
    }

    pub fn angle(&self) -> Angle {
        self.angle
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[derive(Default)]
    struct Pwm {
        duty: u16,
        enabled: bool,
    }

    impl PwmPin for Pwm {
        type Duty = u16;

        fn disable(&mut self) {
            self.enabled = false;
        }

        fn enable(&mut self) {
            self.enabled = true;
        }

        fn get_duty(&self) -> u16 {
            self.duty
        }

        fn get_max_duty(&self) -> u16 {
            ServoCalibration::default().top
        }

        fn set_duty(&mut self, duty: u16) {
            self.duty = duty;
        }
    }

    fn deg(value: f64) -> Angle {
        Angle::new::<degree>(value)
    }

    macro_rules! define_compare_test {
        ($name: ident: ($angle: expr, $compare: expr, $clamped: expr)) => {
            #[test]
            fn $name() {
                let (compare, clamped) = ServoCalibration::default().compare(deg($angle));
                assert_eq!(compare, $compare);
                assert_relative_eq!(clamped.get::<degree>(), $clamped, epsilon = 1e-9);
            }
        };
    }

    define_compare_test!(compare_test1: (0.0, 899, 0.0));
    define_compare_test!(compare_test2: (90.0, 2624, 90.0));
    define_compare_test!(compare_test3: (180.0, 4349, 180.0));
    define_compare_test!(compare_test4: (200.0, 4349, 180.0));
    define_compare_test!(compare_test5: (-10.0, 899, 0.0));

    #[test]
    fn test_angle_inverts_compare() {
        let calibration = ServoCalibration::default();
        let (compare, _) = calibration.compare(deg(45.0));
        assert!((calibration.angle(compare).get::<degree>() - 45.0).abs() < 0.1);
    }

    #[test]
    fn test_servo_drives_pwm() {
        let mut servo = Servo::new(Pwm::default(), ServoCalibration::default());
        assert_eq!(servo.move_to(deg(190.0)), deg(180.0));
        assert_eq!(servo.pwm.duty, 4349);
        assert!(servo.pwm.enabled);
        assert_eq!(servo.angle(), deg(180.0));
    }
}
