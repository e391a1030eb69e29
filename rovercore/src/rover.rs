use core::fmt::Write;

use uom::si::{angle::degree, length::centimeter};

use crate::command::Command;
use crate::config::RoverConfig;
use crate::error::{Error, Wait};
use crate::hal::{poll_bounded, CommandSource, Cue, Platform};
use crate::objects::{extremal, DetectedObject, ObjectTable};
use crate::pose::{Pose, PoseTracker};
use crate::safety::Interlock;
use crate::scan::{ObjectDetector, Sweep, SweepReport};

/// Everything the rover knows about itself and its surroundings, driven one command at a time.
#[derive(Clone, Debug)]
pub struct Rover<const N: usize> {
    config: RoverConfig,
    tracker: PoseTracker,
    table: ObjectTable<N>,
    detector: ObjectDetector,
}

impl<const N: usize> Default for Rover<N> {
    fn default() -> Self {
        Self::new(RoverConfig::default())
    }
}

impl<const N: usize> Rover<N> {
    pub fn new(config: RoverConfig) -> Self {
        Self {
            tracker: PoseTracker::new(config.motion.initial_pose),
            table: ObjectTable::new(),
            detector: ObjectDetector::new(),
            config,
        }
    }

    pub fn config(&self) -> &RoverConfig {
        &self.config
    }

    pub fn pose(&self) -> &Pose {
        self.tracker.pose()
    }

    pub fn table(&self) -> &ObjectTable<N> {
        &self.table
    }

    /// Waits a bounded time for one command byte and runs it.
    ///
    /// Returns `Ok(None)` when no byte arrived in time. The byte is echoed once its command has
    /// finished.
    pub fn serve_once<P, S>(
        &mut self,
        platform: &mut P,
        source: &mut S,
        telemetry: &mut impl Write,
    ) -> Result<Option<Command>, Error>
    where
        P: Platform,
        S: CommandSource,
    {
        let byte = match poll_bounded(
            platform,
            self.config.motion.command_timeout_ms,
            Wait::Command,
            |_| source.read_byte(),
        ) {
            Ok(byte) => byte,
            Err(Error::Timeout(Wait::Command)) => return Ok(None),
            Err(err) => return Err(err),
        };
        let command = Command::from(byte);
        log::debug!("command {:?}", command);
        let result = self.execute(platform, command, telemetry);
        source.echo(byte);
        result.map(|_| Some(command))
    }

    pub fn execute<P: Platform>(
        &mut self,
        platform: &mut P,
        command: Command,
        telemetry: &mut impl Write,
    ) -> Result<(), Error> {
        let motion = &self.config.motion;
        match command {
            Command::Forward => {
                let result = Interlock::new(&self.config).translate(
                    platform,
                    &mut self.tracker,
                    &mut self.table,
                    motion.travel_distance,
                );
                self.refresh(telemetry)?;
                result?;
            }
            Command::TurnLeft | Command::TurnRight => {
                let angle = if command == Command::TurnLeft {
                    motion.turn_angle
                } else {
                    -motion.turn_angle
                };
                let result = Interlock::new(&self.config).rotate(platform, &mut self.tracker, angle);
                self.refresh(telemetry)?;
                result?;
            }
            Command::Sweep => {
                let pose = *self.tracker.pose();
                let result = Sweep::new(&mut self.detector, &self.config).run(
                    platform,
                    &pose,
                    &mut self.table,
                    telemetry,
                );

                // The next sweep starts from a clean detector and a parked head, even after a
                // failed one.
                self.detector.reset();
                platform.move_to(self.config.scan.start_angle);
                platform.delay_ms(self.config.scan.home_ms);
                self.write_statistics(&result?, telemetry)?;
            }
            Command::ClearObjects => {
                log::info!("forgetting {} objects", self.table.len());
                self.table.clear();
            }
            Command::ResetPose => self.tracker.reinitialize(),
            Command::PlayPrimary => platform.play(Cue::Primary),
            Command::PlaySecondary(_) => platform.play(Cue::Secondary),
        }
        Ok(())
    }

    fn refresh(&mut self, telemetry: &mut impl Write) -> Result<(), Error> {
        let pose = *self.tracker.pose();
        let report = self.table.refresh(&pose);
        if report.degenerate > 0 {
            log::debug!("{} objects straight above or below", report.degenerate);
        }
        write!(
            telemetry,
            "\r\nX: {:.3} cm\r\nY: {:.3} cm\r\nHeading: {:.3} deg\r\n",
            pose.x.get::<centimeter>(),
            pose.y.get::<centimeter>(),
            pose.heading.get::<degree>()
        )?;
        Ok(())
    }

    fn write_statistics(
        &self,
        report: &SweepReport,
        telemetry: &mut impl Write,
    ) -> Result<(), Error> {
        let closest = report.closest.and_then(|index| self.table.get(index));
        let smallest = report.smallest.and_then(|index| self.table.get(index));
        if closest.is_none() && smallest.is_none() {
            write!(telemetry, "\r\nNo objects found\r\n")?;
            return Ok(());
        }
        write!(telemetry, "\r\nObjects found: {}\r\n", self.table.len())?;
        if let Some(object) = closest {
            write_object(telemetry, "Closest", object)?;
        }
        if let Some(object) = smallest {
            write_object(telemetry, "Smallest", object)?;
        }
        Ok(())
    }

    /// Index of the closest object with the configured metric.
    pub fn closest(&self) -> Option<usize> {
        extremal::closest(&self.table, self.config.analyzer.closest_metric).map(|(index, _)| index)
    }

    /// Index of the scanned object with the smallest linear width.
    pub fn smallest(&self) -> Option<usize> {
        extremal::smallest(&self.table).map(|(index, _)| index)
    }
}

fn write_object(
    telemetry: &mut impl Write,
    title: &str,
    object: &DetectedObject,
) -> Result<(), Error> {
    write!(
        telemetry,
        "\r\n{} object ({:?}):\r\nBearing: {:.1} deg\r\nSonar distance: {:.0} cm\r\n\
         IR distance: {:.0} cm\r\nAngular width: {:.0} deg\r\nLinear width: {:.0} cm\r\n",
        title,
        object.category,
        object.bearing.get::<degree>(),
        object.sonar_distance.get::<centimeter>(),
        object.ir_distance.get::<centimeter>(),
        object.angular_width.get::<degree>(),
        object.linear_width.get::<centimeter>()
    )?;
    Ok(())
}
