use bitflags::bitflags;
use std::fmt;

use crate::capability::cstr;
use crate::format::{chroma, FourCC};
use crate::v4l2::videodev::v4l2_fmtdesc;

bitflags! {
    #[allow(clippy::unreadable_literal)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Flags : u32 {
        const COMPRESSED            = 0x0001;
        const EMULATED              = 0x0002;
        const CONTINUOUS_BITSTREAM  = 0x0004;
        const DYN_RESOLUTION        = 0x0008;
    }
}

impl From<u32> for Flags {
    fn from(flags: u32) -> Self {
        Self::from_bits_truncate(flags)
    }
}

impl From<Flags> for u32 {
    fn from(flags: Flags) -> Self {
        flags.bits()
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone)]
/// Format description as returned by [`crate::v4l2::vidioc::VIDIOC_ENUM_FMT`]
pub struct Description {
    pub index: u32,
    pub flags: Flags,
    pub description: String,
    pub fourcc: FourCC,
}

impl Description {
    /// Whether frames in this format can be handed to consumers
    pub fn is_known(&self) -> bool {
        chroma::by_fourcc(self.fourcc).is_some()
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.fourcc, self.description)?;
        if self.flags.contains(Flags::EMULATED) {
            write!(f, " [emulated]")?;
        }
        if !self.is_known() {
            write!(f, " [unsupported]")?;
        }
        Ok(())
    }
}

impl From<v4l2_fmtdesc> for Description {
    fn from(desc: v4l2_fmtdesc) -> Self {
        Self {
            index: desc.index,
            flags: Flags::from(desc.flags),
            description: cstr(&desc.description),
            fourcc: FourCC::from(desc.pixelformat),
        }
    }
}
