//! Buffer strategies and the capture stream driving them.

use std::{fmt, io};

use log::{debug, error, warn};

use crate::device::Driver;
use crate::error::{Error, Result};
use crate::format::Format;
use crate::frame::{FieldFlags, Frame};
use crate::memory::IoMethod;
use crate::Timestamp;

pub mod mmap;
pub mod read;
pub mod userptr;

/// Buffers requested from the driver for streaming I/O
pub const BUFFER_COUNT: u32 = 4;
/// Fewest buffers streaming can work with
pub const MIN_BUFFERS: u32 = 2;
/// Longest time a single wait for a frame may block
pub const POLL_TIMEOUT_MS: i32 = 500;

/// Payload copied out of a driver buffer
#[derive(Debug)]
pub struct Payload {
    pub data: Vec<u8>,
    pub sequence: u32,
}

/// Buffer memory of one I/O strategy
pub trait Arena: fmt::Debug {
    /// Sets up the buffers, returns how many there are
    ///
    /// On failure, everything set up so far is released again.
    fn allocate(&mut self, driver: &dyn Driver) -> Result<u32>;

    /// Hands every buffer to the driver
    fn queue_all(&mut self, driver: &dyn Driver) -> io::Result<()>;

    /// Takes one filled buffer from the driver, copies its payload and gives the buffer back
    fn capture(&mut self, driver: &dyn Driver) -> io::Result<Payload>;

    /// Takes back the buffers still queued, ignoring errors
    fn drain(&mut self, driver: &dyn Driver);

    /// Frees all buffer memory
    fn release(&mut self, driver: &dyn Driver);

    /// Number of buffers
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lifecycle of a [`Stream`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Uninitialized,
    BuffersAllocated,
    Streaming,
    Stopped,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Uninitialized => write!(f, "uninitialized"),
            State::BuffersAllocated => write!(f, "buffers allocated"),
            State::Streaming => write!(f, "streaming"),
            State::Stopped => write!(f, "stopped"),
        }
    }
}

/// Whether an error only means that no frame is available right now
fn is_transient(e: &io::Error) -> bool {
    matches!(e.raw_os_error(), Some(libc::EAGAIN) | Some(libc::EINTR))
        || e.kind() == io::ErrorKind::WouldBlock
        || e.kind() == io::ErrorKind::Interrupted
}

/// Capture stream
///
/// The stream does not own the device; every call takes the driver it was set up with.
#[derive(Debug)]
pub struct Stream {
    method: IoMethod,
    arena: Box<dyn Arena>,
    state: State,
    flags: FieldFlags,
}

impl Stream {
    /// Returns a stream for `format` using the given I/O method
    ///
    /// `flags` are attached to every frame.
    pub fn new(method: IoMethod, format: &Format, flags: FieldFlags) -> Self {
        let arena: Box<dyn Arena> = match method {
            IoMethod::Mmap => Box::new(mmap::Arena::new(BUFFER_COUNT)),
            IoMethod::UserPtr => Box::new(userptr::Arena::new(BUFFER_COUNT, format.size as usize)),
            IoMethod::Read => Box::new(read::Arena::new(format.size as usize)),
        };

        Stream {
            method,
            arena,
            state: State::Uninitialized,
            flags,
        }
    }

    pub fn method(&self) -> IoMethod {
        self.method
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Number of buffers in use
    pub fn buffer_count(&self) -> usize {
        self.arena.len()
    }

    /// Sets up the buffers
    pub fn allocate(&mut self, driver: &dyn Driver) -> Result<()> {
        if self.state != State::Uninitialized {
            return Ok(());
        }
        let count = self.arena.allocate(driver)?;
        debug!("allocated {} {} buffers", count, self.method);
        self.state = State::BuffersAllocated;
        Ok(())
    }

    /// Queues every buffer and starts streaming
    ///
    /// On failure the stream is stopped and all buffers are released.
    pub fn start(&mut self, driver: &dyn Driver) -> Result<()> {
        match self.state {
            State::BuffersAllocated => {}
            State::Streaming => return Ok(()),
            State::Uninitialized | State::Stopped => return Err(Error::Closed),
        }

        let res = self.arena.queue_all(driver).and_then(|_| {
            if self.method.memory().is_some() {
                driver.stream_on()
            } else {
                Ok(())
            }
        });

        match res {
            Ok(()) => {
                self.state = State::Streaming;
                Ok(())
            }
            Err(e) => {
                self.stop(driver);
                Err(Error::setup("start streaming", e))
            }
        }
    }

    /// Waits for the next frame
    ///
    /// `Ok(None)` means no frame arrived in time, or the driver dropped one. Any other failure
    /// stops the stream; later calls return [`Error::Closed`].
    pub fn next(&mut self, driver: &dyn Driver) -> Result<Option<Frame>> {
        if self.state != State::Streaming {
            return Err(Error::Closed);
        }

        match driver.wait(POLL_TIMEOUT_MS) {
            Ok(true) => {}
            Ok(false) => return Ok(None),
            Err(e) if is_transient(&e) => return Ok(None),
            Err(e) => return Err(self.fail(driver, e)),
        }

        match self.arena.capture(driver) {
            Ok(payload) => Ok(Some(Frame {
                data: payload.data,
                timestamp: Timestamp::now(),
                sequence: payload.sequence,
                flags: self.flags,
            })),
            Err(e) if is_transient(&e) => Ok(None),
            Err(e) if e.raw_os_error() == Some(libc::EIO) => {
                // Drivers report a single lost frame this way.
                warn!("dropped frame: {}", e);
                Ok(None)
            }
            Err(e) => Err(self.fail(driver, e)),
        }
    }

    fn fail(&mut self, driver: &dyn Driver, e: io::Error) -> Error {
        error!("capture failed: {}", e);
        self.stop(driver);
        Error::Stream(e)
    }

    /// Stops streaming and releases all buffers
    ///
    /// Calling it again does nothing.
    pub fn stop(&mut self, driver: &dyn Driver) {
        match self.state {
            State::Stopped => return,
            State::Uninitialized => {
                self.state = State::Stopped;
                return;
            }
            State::Streaming => {
                self.arena.drain(driver);
                if self.method.memory().is_some() {
                    if let Err(e) = driver.stream_off() {
                        warn!("cannot stop streaming: {}", e);
                    }
                }
            }
            State::BuffersAllocated => {}
        }

        self.arena.release(driver);
        self.state = State::Stopped;
        debug!("stream stopped");
    }
}
