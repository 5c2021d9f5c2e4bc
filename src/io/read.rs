use std::io;

use crate::device::Driver;
use crate::error::Result;
use crate::io::{Arena as ArenaTrait, Payload};

/// Single buffer filled with read() on the device node
#[derive(Debug)]
pub struct Arena {
    size: usize,
    buf: Vec<u8>,
    sequence: u32,
}

impl Arena {
    /// Returns a buffer manager for images of up to `size` bytes
    pub fn new(size: usize) -> Self {
        Arena {
            size,
            buf: Vec::new(),
            sequence: 0,
        }
    }
}

impl ArenaTrait for Arena {
    fn allocate(&mut self, _driver: &dyn Driver) -> Result<u32> {
        self.buf = vec![0; self.size];
        Ok(1)
    }

    fn queue_all(&mut self, _driver: &dyn Driver) -> io::Result<()> {
        Ok(())
    }

    fn capture(&mut self, driver: &dyn Driver) -> io::Result<Payload> {
        let len = driver.read(&mut self.buf)?;
        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);

        Ok(Payload {
            data: self.buf[..len.min(self.buf.len())].to_vec(),
            sequence,
        })
    }

    fn drain(&mut self, _driver: &dyn Driver) {}

    fn release(&mut self, _driver: &dyn Driver) {
        self.buf = Vec::new();
    }

    fn len(&self) -> usize {
        usize::from(!self.buf.is_empty())
    }
}
