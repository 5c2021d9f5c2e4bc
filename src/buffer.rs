use bitflags::bitflags;
use std::{fmt, mem};

use crate::format::FieldOrder;
use crate::memory::Memory;
use crate::v4l2::videodev::{v4l2_buffer, V4L2_BUF_TYPE_VIDEO_CAPTURE};
use crate::Timestamp;

bitflags! {
    #[allow(clippy::unreadable_literal)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Flags: u32 {
        /// Buffer is mapped
        const MAPPED                = 0x00000001;
        /// Buffer is queued for processing
        const QUEUED                = 0x00000002;
        /// Buffer is ready
        const DONE                  = 0x00000004;
        /// Image is a keyframe (I-frame)
        const KEYFRAME              = 0x00000008;
        /// Image is a P-frame
        const PFRAME                = 0x00000010;
        /// Image is a B-frame
        const BFRAME                = 0x00000020;
        /// Buffer is ready, but the data contained within is corrupted
        const ERROR                 = 0x00000040;
        /// Timecode field is valid
        const TIMECODE              = 0x00000100;
        /// Buffer is prepared for queuing
        const PREPARED              = 0x00000400;
        /// Timestamp type
        const TIMESTAMP_MONOTONIC   = 0x00002000;
        const TIMESTAMP_COPY        = 0x00004000;
    }
}

impl From<u32> for Flags {
    fn from(flags: u32) -> Flags {
        Flags::from_bits_truncate(flags)
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

/// Location of a driver buffer, as reported by `VIDIOC_QUERYBUF`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferInfo {
    pub index: u32,
    /// Size of the buffer in bytes
    pub length: u32,
    /// Offset to pass to mmap()
    pub offset: u32,
}

/// Buffer handed to the driver with `VIDIOC_QBUF`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Enqueue {
    pub index: u32,
    pub memory: Memory,
    /// Start of the process buffer, user pointer I/O only
    pub userptr: usize,
    /// Size of the process buffer, user pointer I/O only
    pub length: u32,
}

impl Enqueue {
    pub fn mmap(index: u32) -> Self {
        Enqueue {
            index,
            memory: Memory::Mmap,
            userptr: 0,
            length: 0,
        }
    }

    pub fn userptr(index: u32, buf: &mut [u8]) -> Self {
        Enqueue {
            index,
            memory: Memory::UserPtr,
            userptr: buf.as_mut_ptr() as usize,
            length: buf.len() as u32,
        }
    }
}

impl From<Enqueue> for v4l2_buffer {
    fn from(buf: Enqueue) -> Self {
        let mut raw: v4l2_buffer = unsafe { mem::zeroed() };
        raw.type_ = V4L2_BUF_TYPE_VIDEO_CAPTURE;
        raw.index = buf.index;
        raw.memory = buf.memory as u32;
        if buf.memory == Memory::UserPtr {
            raw.m.userptr = buf.userptr as std::os::raw::c_ulong;
            raw.length = buf.length;
        }
        raw
    }
}

/// Buffer returned by the driver with `VIDIOC_DQBUF`
#[derive(Debug, Clone, Copy)]
pub struct Dequeued {
    pub index: u32,
    /// Number of payload bytes
    pub bytesused: u32,
    pub flags: Flags,
    pub field: FieldOrder,
    /// Sequence number, counting the frames
    pub sequence: u32,
    /// Time of capture as set by the driver
    pub timestamp: Timestamp,
    /// Start of the filled process buffer, user pointer I/O only
    pub userptr: usize,
    pub length: u32,
}

impl From<v4l2_buffer> for Dequeued {
    fn from(raw: v4l2_buffer) -> Self {
        let userptr = if raw.memory == Memory::UserPtr as u32 {
            unsafe { raw.m.userptr as usize }
        } else {
            0
        };

        Dequeued {
            index: raw.index,
            bytesused: raw.bytesused,
            flags: Flags::from(raw.flags),
            field: FieldOrder::try_from(raw.field).unwrap_or(FieldOrder::Any),
            sequence: raw.sequence,
            timestamp: Timestamp::from(raw.timestamp),
            userptr,
            length: raw.length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn userptr_enqueue_carries_pointer() {
        let mut mem = vec![0u8; 4096];
        let raw = v4l2_buffer::from(Enqueue::userptr(3, &mut mem));
        assert_eq!(raw.index, 3);
        assert_eq!(raw.memory, Memory::UserPtr as u32);
        assert_eq!(raw.length, 4096);
        assert_eq!(unsafe { raw.m.userptr } as usize, mem.as_ptr() as usize);
    }

    #[test]
    fn mmap_enqueue_leaves_pointer_empty() {
        let raw = v4l2_buffer::from(Enqueue::mmap(1));
        assert_eq!(raw.type_, V4L2_BUF_TYPE_VIDEO_CAPTURE);
        assert_eq!(unsafe { raw.m.userptr }, 0);
    }
}
