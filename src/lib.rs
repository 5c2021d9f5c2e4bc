//! Video4Linux2 capture sessions
//!
//! This crate opens a V4L2 capture device, negotiates input, standard, tuner, controls, pixel
//! format, frame size and frame rate with the driver and then streams frames using
//! memory-mapped buffers, user pointer buffers or plain read() calls.
//!
//! Requests go to the kernel directly, or through libv4l2 when the device needs pixel format
//! conversion. libv4l2 is loaded at runtime, it is not a build requirement.
//!
//! # Example
//!
//! ```no_run
//! use v4l2_capture::{Config, Session};
//!
//! let config: Config = "v4l2:///dev/video0:chroma=YUYV:width=640:height=480:fps=30"
//!     .parse()
//!     .unwrap();
//! let mut session = Session::open(&config).unwrap();
//! println!("{}", session.stream_format());
//!
//! for _ in 0..10 {
//!     if let Some(frame) = session.next_frame().unwrap() {
//!         println!("frame {} ({} bytes)", frame.sequence, frame.len());
//!     }
//! }
//! ```
//!
//! Any type implementing [`Driver`] can stand in for a device node, see
//! [`Session::with_driver`].

pub mod v4l2;

pub mod buffer;
pub mod capability;
pub mod control;
pub mod crop;
pub mod format;
pub mod fraction;
pub mod frameinterval;
pub mod framesize;
pub mod input;
pub mod memory;
pub mod standard;
pub mod timestamp;

pub mod device;
pub use device::{Device, Driver};

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::Config;
pub mod locator;

pub mod controls;
pub use controls::{ControlHandle, ControlSet};

pub mod frame;
pub use frame::{FieldFlags, Frame, Sink, StreamFormat};

pub mod io;
pub use io::State;

pub mod negotiate;
pub mod probe;
pub use probe::Probe;

pub mod session;
pub use session::Session;

pub use format::{Format, FourCC};
pub use fraction::Fraction;
pub use memory::IoMethod;
pub use timestamp::Timestamp;
