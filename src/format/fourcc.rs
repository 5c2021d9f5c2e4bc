use std::{fmt, str};

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
/// Four character code representing a pixelformat
pub struct FourCC {
    pub repr: [u8; 4],
}

impl FourCC {
    pub const GREY: FourCC = FourCC::new(b"GREY");
    pub const HI240: FourCC = FourCC::new(b"HI24");
    pub const RGB555: FourCC = FourCC::new(b"RGBO");
    pub const RGB565: FourCC = FourCC::new(b"RGBP");
    pub const BGR24: FourCC = FourCC::new(b"BGR3");
    pub const RGB24: FourCC = FourCC::new(b"RGB3");
    pub const BGR32: FourCC = FourCC::new(b"BGR4");
    pub const RGB32: FourCC = FourCC::new(b"RGB4");
    pub const YUYV: FourCC = FourCC::new(b"YUYV");
    pub const UYVY: FourCC = FourCC::new(b"UYVY");
    pub const Y41P: FourCC = FourCC::new(b"Y41P");
    pub const YUV422P: FourCC = FourCC::new(b"422P");
    pub const YVU420: FourCC = FourCC::new(b"YV12");
    pub const YUV411P: FourCC = FourCC::new(b"411P");
    pub const YUV410: FourCC = FourCC::new(b"YUV9");
    pub const YUV420: FourCC = FourCC::new(b"YU12");
    pub const MJPEG: FourCC = FourCC::new(b"MJPG");
    pub const JPEG: FourCC = FourCC::new(b"JPEG");

    /// Returns a pixelformat as four character code
    ///
    /// # Arguments
    ///
    /// * `repr` - Four characters as raw bytes
    ///
    /// # Example
    ///
    /// ```
    /// use v4l2_capture::format::FourCC;
    /// let fourcc = FourCC::new(b"YUYV");
    /// ```
    pub const fn new(repr: &[u8; 4]) -> FourCC {
        FourCC { repr: *repr }
    }

    /// Returns the string representation of a four character code
    ///
    /// # Example
    ///
    /// ```
    /// use v4l2_capture::format::FourCC;
    /// let fourcc = FourCC::new(b"YUYV");
    /// let str = fourcc.str().unwrap();
    /// ```
    pub fn str(&self) -> Result<&str, str::Utf8Error> {
        str::from_utf8(&self.repr)
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.str() {
            Ok(string) => write!(f, "{}", string),
            Err(_) => write!(f, "{:#010x}", u32::from(*self)),
        }
    }
}

impl From<u32> for FourCC {
    fn from(code: u32) -> Self {
        FourCC::new(&code.to_le_bytes())
    }
}

impl From<FourCC> for u32 {
    fn from(fourcc: FourCC) -> Self {
        Self::from_le_bytes(fourcc.repr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_byte_order() {
        // v4l2_fourcc('Y', 'U', 'Y', 'V')
        assert_eq!(u32::from(FourCC::YUYV), 0x5659_5559);
        assert_eq!(FourCC::from(0x3231_5559), FourCC::YUV420);
    }

    #[test]
    fn display_falls_back_to_hex() {
        assert_eq!(FourCC::MJPEG.to_string(), "MJPG");
        assert_eq!(FourCC::new(&[0xff, 0, 0, 0]).to_string(), "0x000000ff");
    }
}
