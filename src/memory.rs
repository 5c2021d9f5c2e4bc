use std::{fmt, str::FromStr};

use crate::v4l2::videodev::{V4L2_MEMORY_MMAP, V4L2_MEMORY_USERPTR};

/// Memory used for buffer exchange
#[allow(clippy::unreadable_literal)]
#[rustfmt::skip]
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Memory {
    Mmap        = V4L2_MEMORY_MMAP,
    UserPtr     = V4L2_MEMORY_USERPTR,
}

impl TryFrom<u32> for Memory {
    type Error = u32;

    fn try_from(repr: u32) -> Result<Self, Self::Error> {
        match repr {
            V4L2_MEMORY_MMAP => Ok(Memory::Mmap),
            V4L2_MEMORY_USERPTR => Ok(Memory::UserPtr),
            repr => Err(repr),
        }
    }
}

impl fmt::Display for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Memory::Mmap => write!(f, "memory-mapped"),
            Memory::UserPtr => write!(f, "user pointer"),
        }
    }
}

/// How frames travel from the driver to the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoMethod {
    /// Driver buffers mapped into the process
    Mmap,
    /// Process buffers lent to the driver
    UserPtr,
    /// Plain read() on the device node
    Read,
}

impl IoMethod {
    /// Buffer memory type used with `VIDIOC_REQBUFS`, `None` for read()
    pub fn memory(&self) -> Option<Memory> {
        match self {
            IoMethod::Mmap => Some(Memory::Mmap),
            IoMethod::UserPtr => Some(Memory::UserPtr),
            IoMethod::Read => None,
        }
    }
}

impl fmt::Display for IoMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoMethod::Mmap => write!(f, "mmap"),
            IoMethod::UserPtr => write!(f, "userptr"),
            IoMethod::Read => write!(f, "read"),
        }
    }
}

impl FromStr for IoMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mmap" => Ok(IoMethod::Mmap),
            "userptr" | "user-pointer" => Ok(IoMethod::UserPtr),
            "read" => Ok(IoMethod::Read),
            other => Err(format!("unknown I/O method: {}", other)),
        }
    }
}
