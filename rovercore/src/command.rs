/// Single-byte operator commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Forward,
    TurnLeft,
    TurnRight,
    /// Sweep and report. The detector and head start the next scan from scratch.
    Sweep,
    ClearObjects,
    ResetPose,
    PlayPrimary,
    /// Any byte without a meaning of its own.
    PlaySecondary(u8),
}

impl From<u8> for Command {
    fn from(byte: u8) -> Self {
        match byte {
            b'w' => Command::Forward,
            b'a' => Command::TurnLeft,
            b'd' => Command::TurnRight,
            b'q' => Command::Sweep,
            b'r' => Command::ClearObjects,
            b'b' => Command::ResetPose,
            b'1' => Command::PlayPrimary,
            other => Command::PlaySecondary(other),
        }
    }
}
