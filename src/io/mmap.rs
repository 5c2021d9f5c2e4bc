use std::{io, slice};

use log::warn;

use crate::buffer::{BufferInfo, Enqueue};
use crate::device::Driver;
use crate::error::{Error, Result};
use crate::io::{Arena as ArenaTrait, Payload, MIN_BUFFERS};
use crate::memory::Memory;

/// Driver buffer mapped into the process
#[derive(Debug)]
struct Mapping {
    ptr: *mut u8,
    length: usize,
}

/// Manage mapped buffers
///
/// Buffers are unmapped by [`ArenaTrait::release`], which the owning stream always calls
/// before it goes away.
#[derive(Debug)]
pub struct Arena {
    count: u32,
    bufs: Vec<Mapping>,
}

impl Arena {
    /// Returns a new buffer manager requesting `count` buffers
    pub fn new(count: u32) -> Self {
        Arena {
            count,
            bufs: Vec::new(),
        }
    }

    fn map_all(&mut self, driver: &dyn Driver, count: u32) -> io::Result<()> {
        for index in 0..count {
            let info: BufferInfo = driver.query_buffer(index)?;
            let ptr = unsafe { driver.map(&info)? };
            self.bufs.push(Mapping {
                ptr,
                length: info.length as usize,
            });
        }
        Ok(())
    }
}

impl ArenaTrait for Arena {
    fn allocate(&mut self, driver: &dyn Driver) -> Result<u32> {
        let count = driver
            .request_buffers(Memory::Mmap, self.count)
            .map_err(|e| Error::setup("request memory-mapped buffers", e))?;

        if count < MIN_BUFFERS {
            self.release(driver);
            return Err(Error::InsufficientBuffers(count));
        }

        if let Err(e) = self.map_all(driver, count) {
            self.release(driver);
            return Err(Error::setup("map buffers", e));
        }

        Ok(count)
    }

    fn queue_all(&mut self, driver: &dyn Driver) -> io::Result<()> {
        for index in 0..self.bufs.len() {
            driver.queue(&Enqueue::mmap(index as u32))?;
        }
        Ok(())
    }

    fn capture(&mut self, driver: &dyn Driver) -> io::Result<Payload> {
        let buf = driver.dequeue(Memory::Mmap)?;
        let mapping = self.bufs.get(buf.index as usize).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("driver returned unknown buffer {}", buf.index),
            )
        })?;

        let len = (buf.bytesused as usize).min(mapping.length);
        let data = unsafe { slice::from_raw_parts(mapping.ptr, len) }.to_vec();

        driver.queue(&Enqueue::mmap(buf.index))?;

        Ok(Payload {
            data,
            sequence: buf.sequence,
        })
    }

    fn drain(&mut self, driver: &dyn Driver) {
        for _ in 0..self.bufs.len() {
            if driver.dequeue(Memory::Mmap).is_err() {
                break;
            }
        }
    }

    fn release(&mut self, driver: &dyn Driver) {
        for mapping in self.bufs.drain(..) {
            if let Err(e) = unsafe { driver.unmap(mapping.ptr, mapping.length) } {
                warn!("cannot unmap buffer: {}", e);
            }
        }

        if let Err(e) = driver.request_buffers(Memory::Mmap, 0) {
            warn!("cannot free buffers: {}", e);
        }
    }

    fn len(&self) -> usize {
        self.bufs.len()
    }
}
