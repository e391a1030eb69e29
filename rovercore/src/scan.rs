//! The sweep: one pass of the rangefinder head across its range, feeding every sample to the
//! object detector.

mod detector;

pub use detector::{Detection, ObjectDetector, ScanSample};

use core::fmt::Write;

use uom::si::{angle::degree, length::centimeter};

use crate::config::RoverConfig;
use crate::error::{Error, Wait};
use crate::hal::{poll_bounded, Platform};
use crate::objects::{extremal, ObjectTable};
use crate::pose::Pose;

/// Tally of one sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub committed: usize,
    pub discarded: usize,
    pub duplicates: usize,
    pub rejected: usize,
    /// Table index of the closest object after the sweep.
    pub closest: Option<usize>,
    /// Table index of the smallest scanned object after the sweep.
    pub smallest: Option<usize>,
}

impl SweepReport {
    fn count(&mut self, detection: Detection) {
        match detection {
            Detection::Pending => {}
            Detection::Discarded { .. } => self.discarded += 1,
            Detection::Committed(_) => self.committed += 1,
            Detection::Duplicate { .. } => self.duplicates += 1,
            Detection::Rejected => self.rejected += 1,
        }
    }
}

pub struct Sweep<'a> {
    detector: &'a mut ObjectDetector,
    config: &'a RoverConfig,
}

impl<'a> Sweep<'a> {
    pub fn new(detector: &'a mut ObjectDetector, config: &'a RoverConfig) -> Self {
        Self { detector, config }
    }

    /// Runs the sweep to completion while the robot stands at `pose`.
    ///
    /// Samples go to `telemetry` as they are taken when the scan config asks for it.
    pub fn run<P: Platform, const N: usize>(
        &mut self,
        platform: &mut P,
        pose: &Pose,
        table: &mut ObjectTable<N>,
        telemetry: &mut impl Write,
    ) -> Result<SweepReport, Error> {
        let config = self.config;
        let scan = &config.scan;
        let mut report = SweepReport::default();

        platform.move_to(scan.start_angle);
        platform.delay_ms(scan.home_ms);
        if scan.print_samples {
            write!(
                telemetry,
                "Degrees       IR Distance (cm)    Sonar Distance (cm)\r\n"
            )?;
        }

        let count = scan.sample_count();
        log::debug!("sweep of {} samples starts", count);
        for i in 0..count {
            let angle = scan.start_angle + scan.step * i as f64;
            platform.trigger_pulse();
            let ir = poll_bounded(platform, scan.sample_timeout_ms, Wait::Infrared, |p| {
                p.ir_distance()
            })?;
            let sonar = poll_bounded(platform, scan.sample_timeout_ms, Wait::Sonar, |p| {
                p.sonar_distance()
            })?;
            if scan.print_samples {
                write!(
                    telemetry,
                    "{:<3.0}           {:<4.0}                 {:<8.4}\r\n",
                    angle.get::<degree>(),
                    ir.get::<centimeter>(),
                    sonar.get::<centimeter>()
                )?;
            }

            let detection = self.detector.feed(
                angle,
                ScanSample { ir, sonar },
                pose,
                table,
                &config.merge,
                scan,
            );
            report.count(detection);

            if i + 1 < count {
                platform.move_to(angle + scan.step);
                platform.delay_ms(scan.settle_ms);
            }
        }
        let detection = self
            .detector
            .finish(pose, table, &config.merge, scan);
        report.count(detection);

        report.smallest = extremal::smallest(table).map(|(index, _)| index);
        report.closest =
            extremal::closest(table, config.analyzer.closest_metric).map(|(index, _)| index);
        log::info!(
            "sweep done: {} new, {} duplicates, {} dropped, {} rejected",
            report.committed,
            report.duplicates,
            report.discarded,
            report.rejected
        );
        Ok(report)
    }
}
