use bitflags::bitflags;
use std::fmt;

use crate::format::{FourCC, RgbMasks};
use crate::fraction::Fraction;
use crate::Timestamp;

bitflags! {
    /// Interlacing of a delivered picture
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FieldFlags: u32 {
        const TOP_FIELD_FIRST       = 0x0001;
        const BOTTOM_FIELD_FIRST    = 0x0002;
    }
}

impl fmt::Display for FieldFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.contains(FieldFlags::TOP_FIELD_FIRST) {
            write!(f, "top field first")
        } else if self.contains(FieldFlags::BOTTOM_FIELD_FIRST) {
            write!(f, "bottom field first")
        } else {
            write!(f, "progressive")
        }
    }
}

/// Captured picture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Payload, exactly the bytes the driver filled in
    pub data: Vec<u8>,
    /// Monotonic clock reading taken when the frame was dequeued
    pub timestamp: Timestamp,
    /// Driver frame counter; counted by the stream for read() I/O
    pub sequence: u32,
    pub flags: FieldFlags,
}

impl Frame {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Negotiated stream parameters, as announced to consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    /// Consumer-side chroma name
    pub chroma: &'static str,
    pub fourcc: FourCC,
    pub width: u32,
    /// Picture height; twice the field height for alternating fields
    pub height: u32,
    /// Sample (pixel) aspect ratio
    pub sar: Fraction,
    /// Frames per second, zero when unknown
    pub frame_rate: Fraction,
    pub masks: Option<RgbMasks>,
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) {}x{} sar {} at {} fps",
            self.chroma,
            self.fourcc,
            self.width,
            self.height,
            self.sar,
            self.frame_rate.as_f64()
        )?;
        if let Some(masks) = self.masks {
            write!(f, " [{}]", masks)?;
        }
        Ok(())
    }
}

/// Consumer of a capture session
pub trait Sink {
    /// Called once, before the first frame
    fn open_stream(&mut self, format: &StreamFormat);

    /// Receives ownership of every captured frame
    fn deliver(&mut self, frame: Frame);
}

/// Collects frames in memory
impl Sink for Vec<Frame> {
    fn open_stream(&mut self, _format: &StreamFormat) {}

    fn deliver(&mut self, frame: Frame) {
        self.push(frame);
    }
}
