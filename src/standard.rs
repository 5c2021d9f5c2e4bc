//! Analog video standards (`v4l2_std_id`).

use bitflags::bitflags;
use std::fmt;

bitflags! {
    #[allow(clippy::unreadable_literal)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Standard: u64 {
        const PAL_B         = 0x00000001;
        const PAL_B1        = 0x00000002;
        const PAL_G         = 0x00000004;
        const PAL_H         = 0x00000008;
        const PAL_I         = 0x00000010;
        const PAL_D         = 0x00000020;
        const PAL_D1        = 0x00000040;
        const PAL_K         = 0x00000080;

        const PAL_M         = 0x00000100;
        const PAL_N         = 0x00000200;
        const PAL_NC        = 0x00000400;
        const PAL_60        = 0x00000800;

        const NTSC_M        = 0x00001000;
        const NTSC_M_JP     = 0x00002000;
        const NTSC_443      = 0x00004000;
        const NTSC_M_KR     = 0x00008000;

        const SECAM_B       = 0x00010000;
        const SECAM_D       = 0x00020000;
        const SECAM_G       = 0x00040000;
        const SECAM_H       = 0x00080000;
        const SECAM_K       = 0x00100000;
        const SECAM_K1      = 0x00200000;
        const SECAM_L       = 0x00400000;
        const SECAM_LC      = 0x00800000;

        const ATSC_8_VSB    = 0x01000000;
        const ATSC_16_VSB   = 0x02000000;

        const NTSC = Self::NTSC_M.bits() | Self::NTSC_M_JP.bits() | Self::NTSC_M_KR.bits();
        const SECAM_DK = Self::SECAM_D.bits() | Self::SECAM_K.bits() | Self::SECAM_K1.bits();
        const SECAM = Self::SECAM_B.bits()
            | Self::SECAM_G.bits()
            | Self::SECAM_H.bits()
            | Self::SECAM_DK.bits()
            | Self::SECAM_L.bits()
            | Self::SECAM_LC.bits();

        const PAL_BG = Self::PAL_B.bits() | Self::PAL_B1.bits() | Self::PAL_G.bits();
        const PAL_DK = Self::PAL_D.bits() | Self::PAL_D1.bits() | Self::PAL_K.bits();
        const PAL = Self::PAL_BG.bits() | Self::PAL_DK.bits() | Self::PAL_H.bits() | Self::PAL_I.bits();

        const B = Self::PAL_B.bits() | Self::PAL_B1.bits() | Self::SECAM_B.bits();
        const G = Self::PAL_G.bits() | Self::SECAM_G.bits();
        const H = Self::PAL_H.bits() | Self::SECAM_H.bits();
        const L = Self::SECAM_L.bits() | Self::SECAM_LC.bits();
        const GH = Self::G.bits() | Self::H.bits();
        const DK = Self::PAL_DK.bits() | Self::SECAM_DK.bits();
        const BG = Self::B.bits() | Self::G.bits();
        const MN = Self::PAL_M.bits() | Self::PAL_N.bits() | Self::PAL_NC.bits() | Self::NTSC.bits();

        const MTS = Self::NTSC_M.bits() | Self::PAL_M.bits() | Self::PAL_N.bits() | Self::PAL_NC.bits();

        const STD_525_60 = Self::PAL_M.bits()
            | Self::PAL_60.bits()
            | Self::NTSC.bits()
            | Self::NTSC_443.bits();
        const STD_625_50 = Self::PAL.bits()
            | Self::PAL_N.bits()
            | Self::PAL_NC.bits()
            | Self::SECAM.bits();
        const ATSC = Self::ATSC_8_VSB.bits() | Self::ATSC_16_VSB.bits();

        const ALL = Self::STD_525_60.bits() | Self::STD_625_50.bits();
    }
}

/// Names accepted by [`Standard::parse`], in lookup order
#[rustfmt::skip]
pub const NAMES: &[(&str, Standard)] = &[
    ("UNKNOWN", Standard::empty()), ("ALL", Standard::ALL),
    // pseudo standards
    ("PAL", Standard::PAL), ("PAL_BG", Standard::PAL_BG), ("PAL_DK", Standard::PAL_DK),
    ("NTSC", Standard::NTSC),
    ("SECAM", Standard::SECAM), ("SECAM_DK", Standard::SECAM_DK),
    ("525_60", Standard::STD_525_60), ("625_50", Standard::STD_625_50),
    ("ATSC", Standard::ATSC),
    // areas
    ("MN", Standard::MN), ("B", Standard::B), ("GH", Standard::GH), ("DK", Standard::DK),
    // individual standards
    ("PAL_B", Standard::PAL_B), ("PAL_B1", Standard::PAL_B1), ("PAL_G", Standard::PAL_G),
    ("PAL_H", Standard::PAL_H), ("PAL_I", Standard::PAL_I), ("PAL_D", Standard::PAL_D),
    ("PAL_D1", Standard::PAL_D1), ("PAL_K", Standard::PAL_K), ("PAL_M", Standard::PAL_M),
    ("PAL_N", Standard::PAL_N), ("PAL_Nc", Standard::PAL_NC), ("PAL_60", Standard::PAL_60),
    ("NTSC_M", Standard::NTSC_M), ("NTSC_M_JP", Standard::NTSC_M_JP),
    ("NTSC_443", Standard::NTSC_443), ("NTSC_M_KR", Standard::NTSC_M_KR),
    ("SECAM_B", Standard::SECAM_B), ("SECAM_D", Standard::SECAM_D),
    ("SECAM_G", Standard::SECAM_G), ("SECAM_H", Standard::SECAM_H),
    ("SECAM_K", Standard::SECAM_K), ("SECAM_K1", Standard::SECAM_K1),
    ("SECAM_L", Standard::SECAM_L), ("SECAM_LC", Standard::SECAM_LC),
    ("ATSC_8_VSB", Standard::ATSC_8_VSB), ("ATSC_16_VSB", Standard::ATSC_16_VSB),
];

/// Parses an unsigned integer with C literal syntax: `0x` prefix for hex, a leading zero for
/// octal, decimal otherwise.
pub(crate) fn parse_c_integer(s: &str) -> Option<u64> {
    let s = s.trim();
    let (digits, radix) = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        (hex, 16)
    } else if s.len() > 1 && s.starts_with('0') {
        (&s[1..], 8)
    } else {
        (s, 10)
    };

    u64::from_str_radix(digits, radix).ok()
}

impl Standard {
    /// Resolves a configured standard
    ///
    /// Numbers are taken verbatim. Anything that is not entirely a non-zero number is looked
    /// up by name, ignoring case, so `525_60` names a set rather than the number 525. Unknown
    /// names resolve to the empty set.
    ///
    /// # Example
    ///
    /// ```
    /// use v4l2_capture::standard::Standard;
    /// assert_eq!(Standard::parse("secam_dk"), Standard::SECAM_DK);
    /// assert_eq!(Standard::parse("0x1000"), Standard::NTSC_M);
    /// ```
    pub fn parse(s: &str) -> Standard {
        if let Some(id) = parse_c_integer(s).filter(|&id| id != 0) {
            return Standard::from_bits_retain(id);
        }

        NAMES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s.trim()))
            .map(|(_, std)| *std)
            .unwrap_or_else(Standard::empty)
    }

    /// Name from the lookup table, if this is one of the well-known sets
    pub fn name(&self) -> Option<&'static str> {
        NAMES
            .iter()
            .find(|(_, std)| std == self)
            .map(|(name, _)| *name)
    }
}

impl From<u64> for Standard {
    fn from(id: u64) -> Self {
        Self::from_bits_retain(id)
    }
}

impl From<Standard> for u64 {
    fn from(std: Standard) -> Self {
        std.bits()
    }
}

impl fmt::Display for Standard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({:#x})", name, self.bits()),
            None => write!(f, "{:#x}", self.bits()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_values() {
        assert_eq!(Standard::NTSC.bits(), 0xb000);
        assert_eq!(Standard::PAL.bits(), 0xff);
        assert_eq!(Standard::SECAM.bits(), 0xff0000);
        assert_eq!(Standard::STD_525_60.bits(), 0xf900);
        assert_eq!(Standard::STD_625_50.bits(), 0xff06ff);
        assert_eq!(Standard::ALL.bits(), 0xffffff);
    }

    #[test]
    fn parse_numbers() {
        assert_eq!(Standard::parse("45056"), Standard::NTSC);
        assert_eq!(Standard::parse("0xff"), Standard::PAL);
        assert_eq!(Standard::parse("010"), Standard::PAL_H);
        assert_eq!(Standard::parse("16junk"), Standard::empty());
    }

    #[test]
    fn parse_names() {
        assert_eq!(Standard::parse("pal"), Standard::PAL);
        assert_eq!(Standard::parse("PAL_NC"), Standard::PAL_NC);
        assert_eq!(Standard::parse("525_60"), Standard::STD_525_60);
        assert_eq!(Standard::parse("Atsc_16_VSB"), Standard::ATSC_16_VSB);
        assert_eq!(Standard::parse("unknown"), Standard::empty());
        assert_eq!(Standard::parse("bogus"), Standard::empty());
    }

    #[test]
    fn display_uses_table_names() {
        assert_eq!(Standard::NTSC.to_string(), "NTSC (0xb000)");
        assert_eq!(Standard::from(0x3u64).to_string(), "0x3");
    }
}
