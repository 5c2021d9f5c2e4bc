use std::os::raw::{c_int, c_void};
use std::path::{Path, PathBuf};
use std::{fmt, io};

use log::warn;

use crate::v4l2::{self, vidioc, Backend};

/// Open device node
///
/// The descriptor is closed when the handle is dropped.
pub struct Handle {
    fd: c_int,
    path: PathBuf,
    backend: Backend,
}

impl Handle {
    /// Opens `path` for non-blocking capture
    pub fn open<P: AsRef<Path>>(path: P, backend: Backend) -> io::Result<Self> {
        let path = path.as_ref();
        let fd = v4l2::open(path, libc::O_RDWR | libc::O_NONBLOCK, &backend)?;

        Ok(Handle {
            fd,
            path: PathBuf::from(path),
            backend,
        })
    }

    /// Returns the raw file descriptor
    pub fn fd(&self) -> c_int {
        self.fd
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// # Safety
    ///
    /// `T` must be the argument type `request` expects.
    pub(crate) unsafe fn ioctl<T>(&self, request: vidioc::_IOC_TYPE, arg: &mut T) -> io::Result<()> {
        unsafe {
            v4l2::ioctl(
                self.fd,
                request,
                arg as *mut T as *mut c_void,
                &self.backend,
            )
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if let Err(e) = v4l2::close(self.fd, &self.backend) {
            warn!("closing {} failed: {}", self.path.display(), e);
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("fd", &self.fd)
            .field("path", &self.path)
            .field("backend", &self.backend)
            .finish()
    }
}
