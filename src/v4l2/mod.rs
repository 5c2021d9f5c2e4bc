//! Thin wrappers around the V4L2 system interface.
//!
//! Every call can be routed either straight to the kernel or through libv4l2, see [`Backend`].

use std::ffi::CString;
use std::os::raw::{c_int, c_void};
use std::os::unix::ffi::OsStrExt;
use std::sync::Arc;
use std::{fmt, io, path::Path};

pub mod libv4l;
pub mod videodev;
pub mod vidioc;

/// Path taken by device calls
#[derive(Clone)]
pub enum Backend {
    /// Raw syscalls
    Kernel,
    /// The libv4l2 wrapper, which converts formats the application does not support natively
    Library(Arc<libv4l::Library>),
}

impl Backend {
    /// Routes calls through libv4l2, loading it if necessary
    pub fn library() -> Result<Self, libloading::Error> {
        Ok(Backend::Library(libv4l::acquire()?))
    }

    pub fn is_library(&self) -> bool {
        matches!(self, Backend::Library(_))
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Backend::Kernel => write!(f, "Kernel"),
            Backend::Library(_) => write!(f, "Library"),
        }
    }
}

fn check(ret: c_int) -> io::Result<()> {
    if ret == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Opens a device node.
///
/// Returns the file descriptor on success.
/// In case of errors, the last OS error will be reported, aka errno on Linux.
///
/// # Arguments
///
/// * `path` - Path to the device node
/// * `flags` - Open flags
/// * `backend` - Whether the descriptor should be handed to libv4l2
pub fn open<P: AsRef<Path>>(path: P, flags: i32, backend: &Backend) -> io::Result<c_int> {
    let c_path = CString::new(path.as_ref().as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let fd = unsafe { libc::open(c_path.as_ptr(), flags) };
    if fd == -1 {
        return Err(io::Error::last_os_error());
    }

    match backend {
        Backend::Kernel => Ok(fd),
        Backend::Library(lib) => {
            let wrapped = lib.fd_open(fd);
            if wrapped == -1 {
                let err = io::Error::last_os_error();
                unsafe { libc::close(fd) };
                Err(err)
            } else {
                Ok(wrapped)
            }
        }
    }
}

/// Closes a descriptor obtained from [`open`].
///
/// In case of errors, the last OS error will be reported, aka errno on Linux.
pub fn close(fd: c_int, backend: &Backend) -> io::Result<()> {
    let ret = match backend {
        Backend::Kernel => unsafe { libc::close(fd) },
        Backend::Library(lib) => lib.close(fd),
    };
    check(ret)
}

/// A convenience wrapper around ioctl.
///
/// In case of errors, the last OS error will be reported, aka errno on Linux.
///
/// # Arguments
///
/// * `fd` - File descriptor
/// * `request` - IO control code (see [`vidioc`])
/// * `argp` - Pointer to memory region holding the argument type
///
/// # Safety
///
/// For maximum flexibility, argp must be a raw pointer. Thus, the entire function is unsafe.
pub unsafe fn ioctl(
    fd: c_int,
    request: vidioc::_IOC_TYPE,
    argp: *mut c_void,
    backend: &Backend,
) -> io::Result<()> {
    let ret = match backend {
        /*
         * The libc crate defines ioctl() with different, incompatible argument types on
         * different platforms. syscall() is used as a drop-in replacement.
         */
        Backend::Kernel => unsafe { libc::syscall(libc::SYS_ioctl, fd, request, argp) as c_int },
        Backend::Library(lib) => unsafe { lib.ioctl(fd, request, argp) },
    };
    check(ret)
}

/// A convenience wrapper around mmap.
///
/// # Arguments
///
/// * `length` - Length of the mapped region
/// * `fd` - File descriptor representing an opened device
/// * `offset` - Offset reported by `VIDIOC_QUERYBUF`
///
/// # Safety
///
/// The returned region aliases driver memory and must be released with [`munmap`].
pub unsafe fn mmap(
    length: usize,
    fd: c_int,
    offset: libc::off_t,
    backend: &Backend,
) -> io::Result<*mut c_void> {
    let prot = libc::PROT_READ | libc::PROT_WRITE;
    let flags = libc::MAP_SHARED;
    let ret = match backend {
        Backend::Kernel => unsafe {
            libc::mmap(std::ptr::null_mut(), length, prot, flags, fd, offset)
        },
        Backend::Library(lib) => unsafe {
            lib.mmap(std::ptr::null_mut(), length, prot, flags, fd, offset as i64)
        },
    };

    if ret == libc::MAP_FAILED {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret)
    }
}

/// A convenience wrapper around munmap.
///
/// # Safety
///
/// Start must come from [`mmap`] with the same length.
pub unsafe fn munmap(start: *mut c_void, length: usize, backend: &Backend) -> io::Result<()> {
    let ret = match backend {
        Backend::Kernel => unsafe { libc::munmap(start, length) },
        Backend::Library(lib) => unsafe { lib.munmap(start, length) },
    };
    check(ret)
}

/// Reads one frame with the read() I/O method, returns the number of bytes read
pub fn read(fd: c_int, buf: &mut [u8], backend: &Backend) -> io::Result<usize> {
    let ptr = buf.as_mut_ptr() as *mut c_void;
    let ret = match backend {
        Backend::Kernel => unsafe { libc::read(fd, ptr, buf.len()) },
        Backend::Library(lib) => unsafe { lib.read(fd, ptr, buf.len()) },
    };

    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret as usize)
    }
}

/// Waits until `fd` becomes readable.
///
/// Returns `Ok(false)` on timeout. A signal interrupting the wait is reported as
/// [`io::ErrorKind::Interrupted`].
pub fn poll(fd: c_int, timeout_ms: i32) -> io::Result<bool> {
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };

    match unsafe { libc::poll(&mut pfd, 1, timeout_ms) } {
        -1 => Err(io::Error::last_os_error()),
        0 => Ok(false),
        _ => Ok(true),
    }
}
