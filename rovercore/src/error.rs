use core::fmt;

/// The blocking waits the core performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wait {
    Command,
    Sonar,
    Infrared,
    Odometry,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// A bounded wait expired before the peripheral produced a value.
    Timeout(Wait),
    /// A peripheral reported a hard failure.
    Sensor(Wait),
    /// The object table had no room left for a new record.
    TableFull { capacity: usize },
    /// A cliff was still under the robot after every allowed reversal.
    HazardPersists,
    /// The telemetry transport refused a write.
    Telemetry,
}

impl From<fmt::Error> for Error {
    fn from(_error: fmt::Error) -> Self {
        Self::Telemetry
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Timeout(wait) => write!(f, "timed out waiting for {:?}", wait),
            Error::Sensor(wait) => write!(f, "{:?} driver failed", wait),
            Error::TableFull { capacity } => {
                write!(f, "object table is full ({} entries)", capacity)
            }
            Error::HazardPersists => write!(f, "hazard still present after recovery"),
            Error::Telemetry => write!(f, "telemetry write failed"),
        }
    }
}
