use std::fmt;

use crate::capability::cstr;
use crate::v4l2::videodev::{v4l2_queryctrl, v4l2_querymenu};

/// Control class of MPEG compression controls
pub const CLASS_MPEG: u32 = 0x0099_0000;
/// Mask selecting the class bits of a control id
pub const CLASS_MASK: u32 = 0x0fff_0000;

/// Control data type
#[allow(clippy::unreadable_literal)]
#[rustfmt::skip]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Type {
    Integer,
    Boolean,
    Menu,
    Button,
    Integer64,
    CtrlClass,
    String,
    Bitmask,
    IntegerMenu,

    /* Compound types are >= 0x0100 */
    Compound(u32),

    Unknown(u32),
}

impl From<u32> for Type {
    fn from(repr: u32) -> Self {
        match repr {
            1 => Self::Integer,
            2 => Self::Boolean,
            3 => Self::Menu,
            4 => Self::Button,
            5 => Self::Integer64,
            6 => Self::CtrlClass,
            7 => Self::String,
            8 => Self::Bitmask,
            9 => Self::IntegerMenu,
            repr if repr >= 0x0100 => Self::Compound(repr),
            repr => Self::Unknown(repr),
        }
    }
}

impl From<Type> for u32 {
    fn from(t: Type) -> Self {
        match t {
            Type::Integer => 1,
            Type::Boolean => 2,
            Type::Menu => 3,
            Type::Button => 4,
            Type::Integer64 => 5,
            Type::CtrlClass => 6,
            Type::String => 7,
            Type::Bitmask => 8,
            Type::IntegerMenu => 9,
            Type::Compound(t) | Type::Unknown(t) => t,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

bitflags::bitflags! {
    #[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
    pub struct Flags: u32 {
        const DISABLED              = 0x0001;
        const GRABBED               = 0x0002;
        const READ_ONLY             = 0x0004;
        const UPDATE                = 0x0008;
        const INACTIVE              = 0x0010;
        const SLIDER                = 0x0020;
        const WRITE_ONLY            = 0x0040;
        const VOLATILE              = 0x0080;
        const HAS_PAYLOAD           = 0x0100;
        const EXECUTE_ON_WRITE      = 0x0200;
        const MODIFY_LAYOUT         = 0x0400;

        const NEXT_CTRL             = 0x80000000;
        const NEXT_COMPOUND         = 0x40000000;
    }
}

impl From<u32> for Flags {
    fn from(flags: u32) -> Self {
        Self::from_bits_retain(flags)
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

#[derive(Debug, Clone, PartialEq, Eq)]
/// Device control menu item
pub enum MenuItem {
    Name(String),
    Value(i64),
}

impl MenuItem {
    /// Decodes a `VIDIOC_QUERYMENU` result for a control of type `typ`
    pub fn from_raw(typ: Type, menu: &v4l2_querymenu) -> Option<Self> {
        // The struct is packed, copy the union out before reading it.
        let u = menu.u;
        unsafe {
            match typ {
                Type::Menu => Some(MenuItem::Name(cstr(&u.name))),
                Type::IntegerMenu => Some(MenuItem::Value(u.value)),
                _ => None,
            }
        }
    }
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuItem::Name(name) => {
                write!(f, "{}", name)?;
            }
            MenuItem::Value(value) => {
                write!(f, "{}", value)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Device control description as returned by [`crate::v4l2::vidioc::VIDIOC_QUERYCTRL`]
pub struct Description {
    /// Control identifier
    pub id: u32,
    /// Type of control
    pub typ: Type,
    /// Name of the control, intended for the user
    pub name: String,
    /// Minimum value, inclusive
    pub minimum: i64,
    /// Maximum value, inclusive
    pub maximum: i64,
    /// Step size, always positive
    pub step: u64,
    /// Default value
    pub default: i64,
    /// Control flags
    pub flags: Flags,
}

impl Description {
    /// Control class this control belongs to
    pub fn class(&self) -> u32 {
        self.id & CLASS_MASK
    }
}

impl From<v4l2_queryctrl> for Description {
    fn from(ctrl: v4l2_queryctrl) -> Self {
        Self {
            id: ctrl.id,
            typ: Type::from(ctrl.type_),
            name: cstr(&ctrl.name),
            minimum: ctrl.minimum as i64,
            maximum: ctrl.maximum as i64,
            step: ctrl.step.max(0) as u64,
            default: ctrl.default_value as i64,
            flags: Flags::from(ctrl.flags),
        }
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ID         : {:#010x}", self.id)?;
        writeln!(f, "Type       : {}", self.typ)?;
        writeln!(f, "Name       : {}", self.name)?;
        writeln!(f, "Minimum    : {}", self.minimum)?;
        writeln!(f, "Maximum    : {}", self.maximum)?;
        writeln!(f, "Step       : {}", self.step)?;
        writeln!(f, "Default    : {}", self.default)?;
        writeln!(f, "Flags      : {}", self.flags)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compound_types() {
        assert_eq!(Type::from(0x0102), Type::Compound(0x0102));
        assert_eq!(Type::from(42), Type::Unknown(42));
        assert_eq!(u32::from(Type::IntegerMenu), 9);
    }

    #[test]
    fn description_from_raw() {
        let mut raw: v4l2_queryctrl = unsafe { std::mem::zeroed() };
        raw.id = 0x0099_0900;
        raw.type_ = 1;
        raw.name[..7].copy_from_slice(b"Bitrate");
        raw.minimum = 0;
        raw.maximum = 1000;
        raw.step = -1;
        let desc = Description::from(raw);
        assert_eq!(desc.name, "Bitrate");
        assert_eq!(desc.class(), CLASS_MPEG);
        assert_eq!(desc.step, 0);
    }

    #[test]
    fn menu_items() {
        let mut raw: v4l2_querymenu = unsafe { std::mem::zeroed() };
        raw.u = crate::v4l2::videodev::v4l2_querymenu_u { value: 17 };
        assert_eq!(
            MenuItem::from_raw(Type::IntegerMenu, &raw),
            Some(MenuItem::Value(17))
        );
        assert_eq!(MenuItem::from_raw(Type::Integer, &raw), None);
    }
}
