//! Runtime binding to the libv4l2 user space wrapper.
//!
//! libv4l2 converts exotic camera formats to common ones and emulates some controls. It is
//! loaded on demand rather than linked, so hosts without it can still use the kernel API
//! directly.
//!
//! The library is shared by every session in the process. [`acquire`] returns a
//! reference-counted handle; the library is unloaded once the last handle is dropped.

use std::os::raw::{c_int, c_ulong, c_void};
use std::sync::{Arc, Mutex, Weak};

use log::debug;

use crate::v4l2::vidioc::_IOC_TYPE;

/// Default soname, overridable through `V4L2_CAPTURE_LIBV4L2`
pub const LIBRARY_NAME: &str = "libv4l2.so.0";

type FdOpenFn = unsafe extern "C" fn(c_int, c_int) -> c_int;
type CloseFn = unsafe extern "C" fn(c_int) -> c_int;
type IoctlFn = unsafe extern "C" fn(c_int, c_ulong, ...) -> c_int;
type ReadFn = unsafe extern "C" fn(c_int, *mut c_void, usize) -> isize;
type MmapFn = unsafe extern "C" fn(*mut c_void, usize, c_int, c_int, c_int, i64) -> *mut c_void;
type MunmapFn = unsafe extern "C" fn(*mut c_void, usize) -> c_int;

/// Loaded libv4l2 entry points
pub struct Library {
    fd_open: FdOpenFn,
    close: CloseFn,
    ioctl: IoctlFn,
    read: ReadFn,
    mmap: MmapFn,
    munmap: MunmapFn,
    // Keeps the function pointers above valid, must be dropped last.
    _lib: libloading::Library,
}

impl Library {
    /// # Safety
    ///
    /// `path` must name a libv4l2 build exporting the usual `v4l2_*` symbols.
    unsafe fn load(path: &str) -> Result<Self, libloading::Error> {
        let lib = unsafe { libloading::Library::new(path)? };
        unsafe {
            let fd_open = *lib.get::<FdOpenFn>(b"v4l2_fd_open\0")?;
            let close = *lib.get::<CloseFn>(b"v4l2_close\0")?;
            let ioctl = *lib.get::<IoctlFn>(b"v4l2_ioctl\0")?;
            let read = *lib.get::<ReadFn>(b"v4l2_read\0")?;
            let mmap = *lib.get::<MmapFn>(b"v4l2_mmap\0")?;
            let munmap = *lib.get::<MunmapFn>(b"v4l2_munmap\0")?;

            Ok(Library {
                fd_open,
                close,
                ioctl,
                read,
                mmap,
                munmap,
                _lib: lib,
            })
        }
    }

    /// Wraps a kernel file descriptor, returns the (possibly identical) libv4l2 descriptor
    pub fn fd_open(&self, fd: c_int) -> c_int {
        unsafe { (self.fd_open)(fd, 0) }
    }

    pub fn close(&self, fd: c_int) -> c_int {
        unsafe { (self.close)(fd) }
    }

    /// # Safety
    ///
    /// `argp` must point to the argument type expected by `request`.
    #[allow(clippy::unnecessary_cast)]
    pub unsafe fn ioctl(&self, fd: c_int, request: _IOC_TYPE, argp: *mut c_void) -> c_int {
        // libv4l expects `request` to be an unsigned long, but this is not guaranteed on all
        // platforms.
        unsafe { (self.ioctl)(fd, request as c_ulong, argp) }
    }

    /// # Safety
    ///
    /// `buf` must be valid for writes of `len` bytes.
    pub unsafe fn read(&self, fd: c_int, buf: *mut c_void, len: usize) -> isize {
        unsafe { (self.read)(fd, buf, len) }
    }

    /// # Safety
    ///
    /// Same contract as `mmap(2)`.
    pub unsafe fn mmap(
        &self,
        start: *mut c_void,
        length: usize,
        prot: c_int,
        flags: c_int,
        fd: c_int,
        offset: i64,
    ) -> *mut c_void {
        unsafe { (self.mmap)(start, length, prot, flags, fd, offset) }
    }

    /// # Safety
    ///
    /// `start` must come from [`Library::mmap`] with the same `length`.
    pub unsafe fn munmap(&self, start: *mut c_void, length: usize) -> c_int {
        unsafe { (self.munmap)(start, length) }
    }
}

static REGISTRY: Mutex<Weak<Library>> = Mutex::new(Weak::new());

/// Returns a handle to the process-wide libv4l2 instance, loading it if needed
///
/// The environment variable `V4L2_CAPTURE_LIBV4L2` can be used to specify a custom path to the
/// library.
pub fn acquire() -> Result<Arc<Library>, libloading::Error> {
    let mut slot = REGISTRY.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(lib) = slot.upgrade() {
        return Ok(lib);
    }

    let path = std::env::var("V4L2_CAPTURE_LIBV4L2").unwrap_or_else(|_| LIBRARY_NAME.to_string());
    debug!("loading {}", path);
    let lib = Arc::new(unsafe { Library::load(&path)? });
    *slot = Arc::downgrade(&lib);
    Ok(lib)
}

/// Whether a libv4l2 instance is currently loaded
pub fn is_loaded() -> bool {
    REGISTRY
        .lock()
        .map(|slot| slot.strong_count() > 0)
        .unwrap_or(false)
}
