use std::alloc::{self, Layout};
use std::ptr::NonNull;
use std::{io, slice};

use log::warn;

use crate::buffer::Enqueue;
use crate::device::Driver;
use crate::error::{Error, Result};
use crate::io::{Arena as ArenaTrait, Payload, MIN_BUFFERS};
use crate::memory::Memory;

/// Size of a memory page, 4 KiB when the system does not say
pub fn page_size() -> usize {
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as usize
    } else {
        4096
    }
}

/// Zeroed, page-aligned heap buffer lent to the driver
#[derive(Debug)]
pub struct Buffer {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl Buffer {
    /// Allocates at least `size` bytes, rounded up to whole pages
    pub fn new(size: usize) -> io::Result<Self> {
        let page = page_size();
        let size = size.max(1).div_ceil(page) * page;
        let layout = Layout::from_size_align(size, page)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(ptr).ok_or_else(|| io::Error::from(io::ErrorKind::OutOfMemory))?;
        Ok(Buffer { ptr, layout })
    }

    pub fn len(&self) -> usize {
        self.layout.size()
    }

    pub fn is_empty(&self) -> bool {
        self.layout.size() == 0
    }

    /// Address handed to the driver
    pub fn addr(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    pub fn as_slice(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.layout.size()) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.layout.size()) }
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

/// Manage user allocated buffers
#[derive(Debug)]
pub struct Arena {
    count: u32,
    size: usize,
    bufs: Vec<Buffer>,
}

impl Arena {
    /// Returns a new buffer manager requesting `count` buffers of `size` bytes each
    pub fn new(count: u32, size: usize) -> Self {
        Arena {
            count,
            size,
            bufs: Vec::new(),
        }
    }

    /// Size of each buffer after rounding up to whole pages
    pub fn buffer_size(&self) -> Option<usize> {
        self.bufs.first().map(Buffer::len)
    }
}

impl ArenaTrait for Arena {
    fn allocate(&mut self, driver: &dyn Driver) -> Result<u32> {
        let count = driver
            .request_buffers(Memory::UserPtr, self.count)
            .map_err(|e| Error::setup("request user pointer buffers", e))?;

        if count < MIN_BUFFERS {
            self.release(driver);
            return Err(Error::InsufficientBuffers(count));
        }

        for _ in 0..count {
            match Buffer::new(self.size) {
                Ok(buf) => self.bufs.push(buf),
                Err(e) => {
                    self.release(driver);
                    return Err(Error::setup("allocate buffers", e));
                }
            }
        }

        Ok(count)
    }

    fn queue_all(&mut self, driver: &dyn Driver) -> io::Result<()> {
        for (index, buf) in self.bufs.iter_mut().enumerate() {
            driver.queue(&Enqueue::userptr(index as u32, buf.as_mut_slice()))?;
        }
        Ok(())
    }

    fn capture(&mut self, driver: &dyn Driver) -> io::Result<Payload> {
        let dequeued = driver.dequeue(Memory::UserPtr)?;

        // The driver identifies the buffer by its address and size, not by index.
        let index = self
            .bufs
            .iter()
            .position(|buf| buf.addr() == dequeued.userptr && buf.len() == dequeued.length as usize)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("driver returned unknown buffer at {:#x}", dequeued.userptr),
                )
            })?;

        let buf = &mut self.bufs[index];
        let len = (dequeued.bytesused as usize).min(buf.len());
        let data = buf.as_slice()[..len].to_vec();

        driver.queue(&Enqueue::userptr(index as u32, buf.as_mut_slice()))?;

        Ok(Payload {
            data,
            sequence: dequeued.sequence,
        })
    }

    fn drain(&mut self, driver: &dyn Driver) {
        for _ in 0..self.bufs.len() {
            if driver.dequeue(Memory::UserPtr).is_err() {
                break;
            }
        }
    }

    fn release(&mut self, driver: &dyn Driver) {
        if let Err(e) = driver.request_buffers(Memory::UserPtr, 0) {
            warn!("cannot free buffers: {}", e);
        }
        self.bufs.clear();
    }

    fn len(&self) -> usize {
        self.bufs.len()
    }
}
