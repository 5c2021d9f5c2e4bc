use std::{fmt, mem};

use crate::v4l2::videodev::{v4l2_format, v4l2_pix_format, V4L2_BUF_TYPE_VIDEO_CAPTURE};

pub mod chroma;
pub use chroma::{Chroma, RgbMasks};

pub mod description;
pub use description::Description;

pub mod field;
pub use field::FieldOrder;

pub mod fourcc;
pub use fourcc::FourCC;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
/// Streaming format (single-planar)
pub struct Format {
    /// width in pixels
    pub width: u32,
    /// height in pixels
    pub height: u32,
    /// pixelformat code
    pub fourcc: FourCC,
    /// field order for interlacing
    pub field_order: FieldOrder,

    /// bytes per line
    pub stride: u32,
    /// maximum number of bytes required to store an image
    pub size: u32,
}

impl Format {
    /// Returns a capture format
    ///
    /// # Arguments
    ///
    /// * `width` - Width in pixels
    /// * `height` - Height in pixels
    /// * `fourcc` - Four character code (pixelformat)
    ///
    /// # Example
    ///
    /// ```
    /// use v4l2_capture::format::{Format, FourCC};
    /// let fmt = Format::new(640, 480, FourCC::new(b"YUYV"));
    /// ```
    pub const fn new(width: u32, height: u32, fourcc: FourCC) -> Self {
        Format {
            width,
            height,
            fourcc,
            field_order: FieldOrder::Progressive,
            stride: 0,
            size: 0,
        }
    }

    /// Works around drivers reporting a stride or image size too small for the frame
    ///
    /// The stride is raised to two bytes per pixel, the image size to a full frame at that
    /// stride.
    pub fn sanitize(&mut self) {
        let min_stride = self.width.saturating_mul(2);
        if self.stride < min_stride {
            self.stride = min_stride;
        }
        let min_size = self.stride.saturating_mul(self.height);
        if self.size < min_size {
            self.size = min_size;
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "width          : {}", self.width)?;
        writeln!(f, "height         : {}", self.height)?;
        writeln!(f, "fourcc         : {}", self.fourcc)?;
        writeln!(f, "field          : {}", self.field_order)?;
        writeln!(f, "stride         : {}", self.stride)?;
        writeln!(f, "size           : {}", self.size)?;
        Ok(())
    }
}

impl From<v4l2_pix_format> for Format {
    fn from(fmt: v4l2_pix_format) -> Self {
        Self {
            width: fmt.width,
            height: fmt.height,
            fourcc: FourCC::from(fmt.pixelformat),
            // Unknown orders are treated like progressive frames, no field flags apply to them.
            field_order: FieldOrder::try_from(fmt.field).unwrap_or(FieldOrder::Any),
            stride: fmt.bytesperline,
            size: fmt.sizeimage,
        }
    }
}

impl From<Format> for v4l2_pix_format {
    fn from(format: Format) -> Self {
        Self {
            width: format.width,
            height: format.height,
            pixelformat: format.fourcc.into(),
            field: format.field_order as u32,
            bytesperline: format.stride,
            sizeimage: format.size,
            ..unsafe { mem::zeroed() }
        }
    }
}

impl From<Format> for v4l2_format {
    fn from(format: Format) -> Self {
        let mut raw: v4l2_format = unsafe { mem::zeroed() };
        raw.type_ = V4L2_BUF_TYPE_VIDEO_CAPTURE;
        raw.fmt.pix = format.into();
        raw
    }
}

impl From<v4l2_format> for Format {
    fn from(raw: v4l2_format) -> Self {
        Format::from(unsafe { raw.fmt.pix })
    }
}
