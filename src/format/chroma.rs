//! Mapping between V4L2 pixel formats and the chroma names exposed to consumers.

use std::fmt;

use crate::format::FourCC;

/// Bit masks of the colour channels of a packed RGB format
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RgbMasks {
    pub red: u32,
    pub green: u32,
    pub blue: u32,
}

impl RgbMasks {
    pub const fn new(red: u32, green: u32, blue: u32) -> Self {
        RgbMasks { red, green, blue }
    }
}

impl fmt::Display for RgbMasks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R:{:#x} G:{:#x} B:{:#x}", self.red, self.green, self.blue)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Chroma {
    /// Consumer-side chroma name
    pub name: &'static str,
    /// Driver pixel format
    pub fourcc: FourCC,
    /// Channel layout, only for packed RGB formats
    pub masks: Option<RgbMasks>,
}

const fn entry(name: &'static str, fourcc: FourCC) -> Chroma {
    Chroma {
        name,
        fourcc,
        masks: None,
    }
}

const fn rgb(name: &'static str, fourcc: FourCC, r: u32, g: u32, b: u32) -> Chroma {
    Chroma {
        name,
        fourcc,
        masks: Some(RgbMasks::new(r, g, b)),
    }
}

/// Every pixel format frames can be delivered in. Lookups by name return the first match.
#[rustfmt::skip]
pub const TABLE: &[Chroma] = &[
    entry("GREY", FourCC::GREY),
    entry("I240", FourCC::HI240),
    rgb("RV15", FourCC::RGB555, 0x001f, 0x03e0, 0x7c00),
    rgb("RV16", FourCC::RGB565, 0x001f, 0x07e0, 0xf800),
    rgb("RV24", FourCC::BGR24, 0xff0000, 0xff00, 0xff),
    rgb("RV24", FourCC::RGB24, 0xff, 0xff00, 0xff0000),
    rgb("RV32", FourCC::BGR32, 0xff0000, 0xff00, 0xff),
    rgb("RV32", FourCC::RGB32, 0xff, 0xff00, 0xff0000),
    entry("YUY2", FourCC::YUYV),
    entry("UYVY", FourCC::UYVY),
    entry("I41N", FourCC::Y41P),
    entry("I422", FourCC::YUV422P),
    entry("YV12", FourCC::YVU420),
    entry("I411", FourCC::YUV411P),
    entry("I410", FourCC::YUV410),
    entry("I420", FourCC::YUV420),
    entry("MJPG", FourCC::MJPEG),
    entry("JPEG", FourCC::JPEG),
];

/// Alternative spellings of table names
#[rustfmt::skip]
const ALIASES: &[(&str, &str)] = &[
    ("YUYV", "YUY2"), ("YUNV", "YUY2"), ("V422", "YUY2"),
    ("Y422", "UYVY"), ("UYNV", "UYVY"), ("HDYC", "UYVY"),
    ("IYUV", "I420"), ("YU12", "I420"),
    ("Y800", "GREY"), ("Y8", "GREY"),
    ("YV16", "I422"),
    ("MJPEG", "MJPG"),
    ("RGB15", "RV15"), ("RGB16", "RV16"), ("RGB24", "RV24"), ("RGB32", "RV32"),
];

/// Pixel formats tried, in this order, when the requested chroma cannot be used
pub const FALLBACK: [FourCC; 9] = [
    FourCC::YUV420,
    FourCC::YVU420,
    FourCC::YUV422P,
    FourCC::YUYV,
    FourCC::UYVY,
    FourCC::BGR24,
    FourCC::BGR32,
    FourCC::MJPEG,
    FourCC::JPEG,
];

/// Resolves a chroma name (case-insensitive, aliases accepted) to its table entry
///
/// # Example
///
/// ```
/// use v4l2_capture::format::{chroma, FourCC};
/// assert_eq!(chroma::by_name("yuyv").map(|c| c.fourcc), Some(FourCC::YUYV));
/// ```
pub fn by_name(name: &str) -> Option<&'static Chroma> {
    let name = name.trim();
    let canonical = ALIASES
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
        .map(|(_, canonical)| *canonical)
        .unwrap_or(name);

    TABLE
        .iter()
        .find(|chroma| chroma.name.eq_ignore_ascii_case(canonical))
}

/// Table entry of a driver pixel format
pub fn by_fourcc(fourcc: FourCC) -> Option<&'static Chroma> {
    TABLE.iter().find(|chroma| chroma.fourcc == fourcc)
}
