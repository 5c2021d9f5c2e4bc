use log::{debug, info, warn};

use crate::config::Config;
use crate::controls::{ControlHandle, ControlSet};
use crate::device::{Device, Driver};
use crate::error::{Error, Result};
use crate::format::Format;
use crate::frame::{FieldFlags, Frame, Sink, StreamFormat};
use crate::io::{State, Stream};
use crate::memory::IoMethod;
use crate::negotiate::negotiate;
use crate::probe::Probe;
use crate::standard::Standard;
use crate::v4l2::Backend;

/// Capture session on one device
///
/// A session is fully set up once constructed: the device is probed, the format negotiated,
/// the buffers allocated and streaming started. Frames are pulled with
/// [`Session::next_frame`] or pushed into a [`Sink`] with [`Session::demux`].
///
/// Dropping the session stops streaming and releases all buffers.
#[derive(Debug)]
pub struct Session<D: Driver = Device> {
    driver: D,
    probe: Probe,
    format: Format,
    stream_format: StreamFormat,
    field_flags: FieldFlags,
    standard: Option<Standard>,
    controls: ControlSet,
    stream: Stream,
    announced: bool,
}

impl Session<Device> {
    /// Opens the configured device node
    ///
    /// The kernel interface is tried first. If setting up the device fails and libv4l2 is
    /// available, the setup is retried through libv4l2, which can convert proprietary pixel
    /// formats. With `use-libv4l2` set, libv4l2 is used right away.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use v4l2_capture::{Config, Session};
    ///
    /// let config: Config = "v4l2:///dev/video0:width=640:height=480".parse().unwrap();
    /// let mut session = Session::open(&config).unwrap();
    /// if let Some(frame) = session.next_frame().unwrap() {
    ///     println!("{} bytes", frame.len());
    /// }
    /// ```
    pub fn open(config: &Config) -> Result<Self> {
        if !config.use_libv4l2 {
            debug!("trying kernel V4L2");
            match Self::open_with(config, Backend::Kernel) {
                Ok(session) => return Ok(session),
                Err(e @ Error::Open { .. }) => return Err(e),
                Err(e) => match Backend::library() {
                    Ok(backend) => {
                        warn!("{}, retrying with libv4l2", e);
                        return Self::open_with(config, backend);
                    }
                    Err(lib) => {
                        debug!("libv4l2 not available: {}", lib);
                        return Err(e);
                    }
                },
            }
        }

        debug!("trying library V4L2");
        Self::open_with(config, Backend::library()?)
    }

    fn open_with(config: &Config, backend: Backend) -> Result<Self> {
        debug!("opening device {}", config.device.display());
        let device = Device::with_path(&config.device, backend).map_err(|source| Error::Open {
            path: config.device.clone(),
            source,
        })?;
        Session::with_driver(device, config)
    }
}

impl<D: Driver> Session<D> {
    /// Sets up a session on any driver
    ///
    /// On failure nothing stays allocated on the driver side.
    pub fn with_driver(driver: D, config: &Config) -> Result<Self> {
        let probe = Probe::run(&driver, config.io)?;
        let negotiated = negotiate(&driver, &probe, config)?;

        let mut stream = Stream::new(probe.io, &negotiated.format, negotiated.field_flags);
        stream.allocate(&driver)?;
        stream.start(&driver)?;
        info!(
            "capturing {} with {} I/O and {} buffers",
            negotiated.stream,
            probe.io,
            stream.buffer_count()
        );

        Ok(Session {
            driver,
            probe,
            format: negotiated.format,
            stream_format: negotiated.stream,
            field_flags: negotiated.field_flags,
            standard: negotiated.standard,
            controls: negotiated.controls,
            stream,
            announced: false,
        })
    }

    /// Waits for the next frame
    ///
    /// Pending control changes are applied first. `Ok(None)` means that no frame arrived
    /// within the poll timeout or that the driver dropped one. A fatal error stops the session,
    /// after which [`Error::Closed`] is returned.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.stream.state() != State::Streaming {
            return Err(Error::Closed);
        }
        self.controls.drain(&self.driver);
        self.stream.next(&self.driver)
    }

    /// Runs one capture iteration, delivering the frame to `sink` if there is one
    ///
    /// The sink is told about the stream format before the first frame. Returns `false` once
    /// the session is closed.
    pub fn demux(&mut self, sink: &mut dyn Sink) -> Result<bool> {
        if self.stream.state() != State::Streaming {
            return Ok(false);
        }
        if !self.announced {
            sink.open_stream(&self.stream_format);
            self.announced = true;
        }
        if let Some(frame) = self.next_frame()? {
            sink.deliver(frame);
        }
        Ok(true)
    }

    /// Changes a control from the capture thread, returns the value the driver settled on
    pub fn set_control(&mut self, name: &str, value: i64) -> Result<i64> {
        self.controls.set(&self.driver, name, value)
    }

    /// Stops streaming and releases all buffers; calling it again does nothing
    pub fn close(&mut self) {
        self.stream.stop(&self.driver);
    }

    pub fn is_closed(&self) -> bool {
        self.stream.state() == State::Stopped
    }

    /// Driver format after negotiation
    pub fn format(&self) -> &Format {
        &self.format
    }

    /// Format announced to consumers
    pub fn stream_format(&self) -> &StreamFormat {
        &self.stream_format
    }

    /// Interlacing flags attached to every frame
    pub fn field_flags(&self) -> FieldFlags {
        self.field_flags
    }

    /// Analog standard in use, when one was configured
    pub fn standard(&self) -> Option<Standard> {
        self.standard
    }

    pub fn io_method(&self) -> IoMethod {
        self.stream.method()
    }

    pub fn state(&self) -> State {
        self.stream.state()
    }

    /// Number of buffers exchanged with the driver
    pub fn buffer_count(&self) -> usize {
        self.stream.buffer_count()
    }

    pub fn controls(&self) -> &ControlSet {
        &self.controls
    }

    /// Handle for changing controls from other threads
    pub fn control_handle(&self) -> ControlHandle {
        self.controls.handle()
    }

    pub fn probe(&self) -> &Probe {
        &self.probe
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }
}

impl<D: Driver> Drop for Session<D> {
    fn drop(&mut self) {
        self.close();
    }
}
