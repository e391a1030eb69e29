//! Command byte sources and the telemetry sink of the host binary.

use std::collections::VecDeque;
use std::fmt;
use std::io::{Read, Write};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use rovercore::hal::CommandSource;

/// A fixed list of command bytes, as a test or a script would type them.
#[derive(Clone, Debug, Default)]
pub struct Script {
    pending: VecDeque<u8>,
    echoed: Vec<u8>,
}

impl Script {
    pub fn new(bytes: &[u8]) -> Self {
        Self {
            pending: bytes.iter().copied().collect(),
            echoed: Vec::new(),
        }
    }

    pub fn echoed(&self) -> &[u8] {
        &self.echoed
    }

    pub fn is_done(&self) -> bool {
        self.pending.is_empty()
    }
}

impl CommandSource for Script {
    type Error = core::convert::Infallible;

    fn read_byte(&mut self) -> nb::Result<u8, Self::Error> {
        self.pending.pop_front().ok_or(nb::Error::WouldBlock)
    }

    fn echo(&mut self, byte: u8) {
        self.echoed.push(byte);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Disconnected;

/// Bytes typed on standard input, read on a background thread.
pub struct Terminal {
    bytes: Receiver<u8>,
    closed: bool,
}

impl Terminal {
    pub fn spawn() -> Self {
        let (sender, bytes) = mpsc::channel();
        thread::spawn(move || {
            for byte in std::io::stdin().lock().bytes() {
                let byte = match byte {
                    Ok(byte) => byte,
                    Err(err) => {
                        log::warn!("stdin: {}", err);
                        break;
                    }
                };
                if byte == b'\n' || byte == b'\r' {
                    continue;
                }
                if sender.send(byte).is_err() {
                    break;
                }
            }
        });
        Self {
            bytes,
            closed: false,
        }
    }

    pub fn is_done(&self) -> bool {
        self.closed
    }
}

impl CommandSource for Terminal {
    type Error = Disconnected;

    fn read_byte(&mut self) -> nb::Result<u8, Disconnected> {
        match self.bytes.try_recv() {
            Ok(byte) => Ok(byte),
            Err(TryRecvError::Empty) => {
                // The simulated clock runs far ahead of the operator otherwise.
                thread::sleep(Duration::from_millis(1));
                Err(nb::Error::WouldBlock)
            }
            Err(TryRecvError::Disconnected) => {
                self.closed = true;
                Err(nb::Error::Other(Disconnected))
            }
        }
    }

    fn echo(&mut self, byte: u8) {
        print!("{}", byte as char);
        let _ = std::io::stdout().flush();
    }
}

/// Telemetry text written straight to standard output.
#[derive(Clone, Copy, Debug, Default)]
pub struct Console;

impl fmt::Write for Console {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(s.as_bytes()).map_err(|_| fmt::Error)?;
        stdout.flush().map_err(|_| fmt::Error)
    }
}
