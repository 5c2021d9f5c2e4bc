use std::fmt;

use crate::fraction::Fraction;
use crate::v4l2::videodev::{v4l2_cropcap, v4l2_rect};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
/// Rectangle in the capture window
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} at ({}, {})",
            self.width, self.height, self.left, self.top
        )
    }
}

impl From<v4l2_rect> for Rect {
    fn from(rect: v4l2_rect) -> Self {
        Rect {
            left: rect.left,
            top: rect.top,
            width: rect.width,
            height: rect.height,
        }
    }
}

impl From<Rect> for v4l2_rect {
    fn from(rect: Rect) -> Self {
        v4l2_rect {
            left: rect.left,
            top: rect.top,
            width: rect.width,
            height: rect.height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Cropping capabilities as returned by [`crate::v4l2::vidioc::VIDIOC_CROPCAP`]
pub struct CropCap {
    /// Window the driver can capture from
    pub bounds: Rect,
    /// Default capture window, covering the whole picture
    pub defrect: Rect,
    pub pixel_aspect: Fraction,
}

impl From<v4l2_cropcap> for CropCap {
    fn from(cap: v4l2_cropcap) -> Self {
        CropCap {
            bounds: Rect::from(cap.bounds),
            defrect: Rect::from(cap.defrect),
            pixel_aspect: Fraction::from(cap.pixelaspect),
        }
    }
}
