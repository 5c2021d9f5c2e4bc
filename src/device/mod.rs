//! Capture device protocol and its implementation on V4L2 device nodes.

use std::os::raw::c_void;
use std::path::Path;
use std::{io, mem};

use crate::buffer::{BufferInfo, Dequeued, Enqueue};
use crate::capability::Capabilities;
use crate::control::{self, MenuItem};
use crate::crop::{CropCap, Rect};
use crate::format::{Description as FormatDescription, Format, FourCC};
use crate::fraction::Fraction;
use crate::frameinterval::FrameInterval;
use crate::framesize::FrameSize;
use crate::input::{AudioInput, Frequency, Input, Tuner, TunerAudioMode};
use crate::memory::Memory;
use crate::standard::Standard;
use crate::v4l2::{self, videodev::*, vidioc, Backend};

pub mod handle;
pub use handle::Handle;

/// Capture device protocol
///
/// One method per driver request the capture pipeline issues. Errors carry the driver's errno
/// so callers can tell transient conditions (`EAGAIN`, `EIO`) from fatal ones.
pub trait Driver {
    /// Query for device capabilities
    fn query_caps(&self) -> io::Result<Capabilities>;

    /// Video input at `index`, fails past the last one
    fn input(&self, index: u32) -> io::Result<Input>;

    /// Selects the active video input
    fn set_input(&self, index: u32) -> io::Result<()>;

    /// Audio input at `index`, fails past the last one
    fn audio_input(&self, index: u32) -> io::Result<AudioInput>;

    /// Selects the active audio input
    fn set_audio_input(&self, index: u32) -> io::Result<()>;

    fn tuner(&self, index: u32) -> io::Result<Tuner>;

    fn set_tuner_audio_mode(&self, index: u32, mode: TunerAudioMode) -> io::Result<()>;

    fn frequency(&self, tuner: u32) -> io::Result<Frequency>;

    fn set_frequency(&self, freq: &Frequency) -> io::Result<()>;

    fn set_standard(&self, std: Standard) -> io::Result<()>;

    /// Returns the standard currently in use
    fn standard(&self) -> io::Result<Standard>;

    /// Pixel format at `index`, fails past the last one
    fn format_description(&self, index: u32) -> io::Result<FormatDescription>;

    /// Returns the format currently in use
    fn format(&self) -> io::Result<Format>;

    /// Modifies the capture format and returns the actual format
    ///
    /// The driver tries to match the format parameters on a best effort basis.
    /// Thus, if the combination of format properties cannot be achieved, the closest possible
    /// settings are used and reported back.
    fn set_format(&self, fmt: &Format) -> io::Result<Format>;

    fn frame_size(&self, fourcc: FourCC, index: u32) -> io::Result<FrameSize>;

    fn frame_interval(
        &self,
        fourcc: FourCC,
        width: u32,
        height: u32,
        index: u32,
    ) -> io::Result<FrameInterval>;

    /// Sets the time per frame and returns the value the driver settled on
    fn set_frame_interval(&self, interval: Fraction) -> io::Result<Fraction>;

    fn crop_cap(&self) -> io::Result<CropCap>;

    fn set_crop(&self, rect: &Rect) -> io::Result<()>;

    /// Describes the control following `id` (`VIDIOC_QUERYCTRL` with `V4L2_CTRL_FLAG_NEXT_CTRL`)
    fn next_control(&self, id: u32) -> io::Result<control::Description>;

    fn menu_item(&self, ctrl: &control::Description, index: u32) -> io::Result<MenuItem>;

    /// Reads the current value of a control
    ///
    /// `typ` selects the request: 64-bit controls can only be read with `VIDIOC_G_EXT_CTRLS`.
    fn control(&self, id: u32, typ: control::Type) -> io::Result<i64>;

    /// Writes the value of a control
    fn set_control(&self, id: u32, typ: control::Type, value: i64) -> io::Result<()>;

    /// Requests `count` buffers, returns the number the driver granted
    ///
    /// A count of zero releases all buffers.
    fn request_buffers(&self, memory: Memory, count: u32) -> io::Result<u32>;

    /// Location of memory-mapped buffer `index`
    fn query_buffer(&self, index: u32) -> io::Result<BufferInfo>;

    /// Maps a driver buffer into the process
    ///
    /// # Safety
    ///
    /// The region aliases driver memory. It must be released with [`Driver::unmap`] before the
    /// buffers are freed.
    unsafe fn map(&self, info: &BufferInfo) -> io::Result<*mut u8>;

    /// # Safety
    ///
    /// `ptr` and `length` must come from [`Driver::map`].
    unsafe fn unmap(&self, ptr: *mut u8, length: usize) -> io::Result<()>;

    fn queue(&self, buf: &Enqueue) -> io::Result<()>;

    fn dequeue(&self, memory: Memory) -> io::Result<Dequeued>;

    fn stream_on(&self) -> io::Result<()>;

    fn stream_off(&self) -> io::Result<()>;

    /// Reads one frame with the read() I/O method
    fn read(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Waits until a frame is ready, `Ok(false)` on timeout
    fn wait(&self, timeout_ms: i32) -> io::Result<bool>;

    /// Returns a vector of valid formats for this device
    ///
    /// The "emulated" flag describes formats filled in by libv4lconvert.
    /// There may be a conversion related performance penalty when using them.
    fn enum_formats(&self) -> Vec<FormatDescription> {
        let mut formats = Vec::new();
        let mut index = 0;
        while let Ok(desc) = self.format_description(index) {
            formats.push(desc);
            index += 1;
        }
        formats
    }

    /// Returns a vector of valid framesizes that the device supports for the given pixel format
    fn enum_framesizes(&self, fourcc: FourCC) -> Vec<FrameSize> {
        let mut sizes = Vec::new();
        let mut index = 0;
        while let Ok(size) = self.frame_size(fourcc, index) {
            sizes.push(size);
            index += 1;
        }
        sizes
    }

    /// Returns a vector of all frame intervals that the device supports for the given pixel format
    /// and frame size
    fn enum_frameintervals(&self, fourcc: FourCC, width: u32, height: u32) -> Vec<FrameInterval> {
        let mut intervals = Vec::new();
        let mut index = 0;
        while let Ok(interval) = self.frame_interval(fourcc, width, height, index) {
            intervals.push(interval);
            index += 1;
        }
        intervals
    }
}

/// Linux capture device abstraction
#[derive(Debug)]
pub struct Device {
    handle: Handle,
}

impl Device {
    /// Returns a capture device by path
    ///
    /// Linux device nodes are usually found in /dev/videoX or /sys/class/video4linux/videoX.
    ///
    /// # Arguments
    ///
    /// * `path` - Path (e.g. "/dev/video0")
    /// * `backend` - Whether requests go through libv4l2
    ///
    /// # Example
    ///
    /// ```no_run
    /// use v4l2_capture::device::Device;
    /// use v4l2_capture::v4l2::Backend;
    /// let dev = Device::with_path("/dev/video0", Backend::Kernel);
    /// ```
    pub fn with_path<P: AsRef<Path>>(path: P, backend: Backend) -> io::Result<Self> {
        Ok(Device {
            handle: Handle::open(path, backend)?,
        })
    }

    /// Returns the underlying handle
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    fn ext_control(
        &self,
        request: vidioc::_IOC_TYPE,
        id: u32,
        typ: control::Type,
        value: i64,
    ) -> io::Result<i64> {
        let mut ctrl = v4l2_ext_control {
            id,
            size: 0,
            reserved2: [0],
            u: ext_value(typ, value),
        };

        let mut ctrls = v4l2_ext_controls {
            which: id & control::CLASS_MASK,
            count: 1,
            error_idx: 0,
            request_fd: 0,
            reserved: 0,
            controls: &mut ctrl,
        };
        unsafe {
            self.handle.ioctl(request, &mut ctrls)?;
        }
        let u = ctrl.u;
        Ok(unsafe { read_ext_value(typ, &u) })
    }
}

/// Fills the union member matching the control type
fn ext_value(typ: control::Type, value: i64) -> v4l2_ext_control_u {
    let mut u = v4l2_ext_control_u { value64: 0 };
    if typ == control::Type::Integer64 {
        u.value64 = value;
    } else {
        u.value = value as i32;
    }
    u
}

/// # Safety
///
/// `u` must have been filled by [`ext_value`] or by the driver for a control of type `typ`.
unsafe fn read_ext_value(typ: control::Type, u: &v4l2_ext_control_u) -> i64 {
    if typ == control::Type::Integer64 {
        u.value64
    } else {
        u.value as i64
    }
}

impl Driver for Device {
    fn query_caps(&self) -> io::Result<Capabilities> {
        unsafe {
            let mut v4l2_caps: v4l2_capability = mem::zeroed();
            self.handle.ioctl(vidioc::VIDIOC_QUERYCAP, &mut v4l2_caps)?;
            Ok(Capabilities::from(v4l2_caps))
        }
    }

    fn input(&self, index: u32) -> io::Result<Input> {
        unsafe {
            let mut v4l2_input: v4l2_input = mem::zeroed();
            v4l2_input.index = index;
            self.handle.ioctl(vidioc::VIDIOC_ENUMINPUT, &mut v4l2_input)?;
            Ok(Input::from(v4l2_input))
        }
    }

    fn set_input(&self, index: u32) -> io::Result<()> {
        let mut index = index as v4l2_int;
        unsafe { self.handle.ioctl(vidioc::VIDIOC_S_INPUT, &mut index) }
    }

    fn audio_input(&self, index: u32) -> io::Result<AudioInput> {
        unsafe {
            let mut v4l2_audio: v4l2_audio = mem::zeroed();
            v4l2_audio.index = index;
            self.handle.ioctl(vidioc::VIDIOC_ENUMAUDIO, &mut v4l2_audio)?;
            Ok(AudioInput::from(v4l2_audio))
        }
    }

    fn set_audio_input(&self, index: u32) -> io::Result<()> {
        unsafe {
            let mut v4l2_audio: v4l2_audio = mem::zeroed();
            v4l2_audio.index = index;
            self.handle.ioctl(vidioc::VIDIOC_S_AUDIO, &mut v4l2_audio)
        }
    }

    fn tuner(&self, index: u32) -> io::Result<Tuner> {
        unsafe {
            let mut v4l2_tuner: v4l2_tuner = mem::zeroed();
            v4l2_tuner.index = index;
            self.handle.ioctl(vidioc::VIDIOC_G_TUNER, &mut v4l2_tuner)?;
            Ok(Tuner::from(v4l2_tuner))
        }
    }

    fn set_tuner_audio_mode(&self, index: u32, mode: TunerAudioMode) -> io::Result<()> {
        unsafe {
            let mut v4l2_tuner: v4l2_tuner = mem::zeroed();
            v4l2_tuner.index = index;
            self.handle.ioctl(vidioc::VIDIOC_G_TUNER, &mut v4l2_tuner)?;
            v4l2_tuner.audmode = mode as u32;
            self.handle.ioctl(vidioc::VIDIOC_S_TUNER, &mut v4l2_tuner)
        }
    }

    fn frequency(&self, tuner: u32) -> io::Result<Frequency> {
        unsafe {
            let mut v4l2_freq: v4l2_frequency = mem::zeroed();
            v4l2_freq.tuner = tuner;
            self.handle.ioctl(vidioc::VIDIOC_G_FREQUENCY, &mut v4l2_freq)?;
            Ok(Frequency::from(v4l2_freq))
        }
    }

    fn set_frequency(&self, freq: &Frequency) -> io::Result<()> {
        let mut v4l2_freq = v4l2_frequency::from(*freq);
        unsafe { self.handle.ioctl(vidioc::VIDIOC_S_FREQUENCY, &mut v4l2_freq) }
    }

    fn set_standard(&self, std: Standard) -> io::Result<()> {
        let mut id: v4l2_std_id = std.bits();
        unsafe { self.handle.ioctl(vidioc::VIDIOC_S_STD, &mut id) }
    }

    fn standard(&self) -> io::Result<Standard> {
        let mut id: v4l2_std_id = 0;
        unsafe { self.handle.ioctl(vidioc::VIDIOC_G_STD, &mut id)? };
        Ok(Standard::from(id))
    }

    fn format_description(&self, index: u32) -> io::Result<FormatDescription> {
        let mut v4l2_fmt = v4l2_fmtdesc {
            index,
            type_: V4L2_BUF_TYPE_VIDEO_CAPTURE,
            ..unsafe { mem::zeroed() }
        };
        unsafe { self.handle.ioctl(vidioc::VIDIOC_ENUM_FMT, &mut v4l2_fmt)? };
        Ok(FormatDescription::from(v4l2_fmt))
    }

    fn format(&self) -> io::Result<Format> {
        unsafe {
            let mut v4l2_fmt: v4l2_format = mem::zeroed();
            v4l2_fmt.type_ = V4L2_BUF_TYPE_VIDEO_CAPTURE;
            self.handle.ioctl(vidioc::VIDIOC_G_FMT, &mut v4l2_fmt)?;
            Ok(Format::from(v4l2_fmt))
        }
    }

    fn set_format(&self, fmt: &Format) -> io::Result<Format> {
        let mut v4l2_fmt = v4l2_format::from(*fmt);
        unsafe { self.handle.ioctl(vidioc::VIDIOC_S_FMT, &mut v4l2_fmt)? };
        Ok(Format::from(v4l2_fmt))
    }

    fn frame_size(&self, fourcc: FourCC, index: u32) -> io::Result<FrameSize> {
        let mut v4l2_struct = v4l2_frmsizeenum {
            index,
            pixel_format: fourcc.into(),
            ..unsafe { mem::zeroed() }
        };
        unsafe {
            self.handle
                .ioctl(vidioc::VIDIOC_ENUM_FRAMESIZES, &mut v4l2_struct)?
        };
        FrameSize::try_from(v4l2_struct).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn frame_interval(
        &self,
        fourcc: FourCC,
        width: u32,
        height: u32,
        index: u32,
    ) -> io::Result<FrameInterval> {
        let mut v4l2_struct = v4l2_frmivalenum {
            index,
            pixel_format: fourcc.into(),
            width,
            height,
            ..unsafe { mem::zeroed() }
        };
        unsafe {
            self.handle
                .ioctl(vidioc::VIDIOC_ENUM_FRAMEINTERVALS, &mut v4l2_struct)?
        };
        FrameInterval::try_from(v4l2_struct)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn set_frame_interval(&self, interval: Fraction) -> io::Result<Fraction> {
        unsafe {
            let mut v4l2_params: v4l2_streamparm = mem::zeroed();
            v4l2_params.type_ = V4L2_BUF_TYPE_VIDEO_CAPTURE;
            v4l2_params.parm.capture.timeperframe = interval.into();
            self.handle.ioctl(vidioc::VIDIOC_S_PARM, &mut v4l2_params)?;
            Ok(Fraction::from(v4l2_params.parm.capture.timeperframe))
        }
    }

    fn crop_cap(&self) -> io::Result<CropCap> {
        unsafe {
            let mut v4l2_cropcap: v4l2_cropcap = mem::zeroed();
            v4l2_cropcap.type_ = V4L2_BUF_TYPE_VIDEO_CAPTURE;
            self.handle.ioctl(vidioc::VIDIOC_CROPCAP, &mut v4l2_cropcap)?;
            Ok(CropCap::from(v4l2_cropcap))
        }
    }

    fn set_crop(&self, rect: &Rect) -> io::Result<()> {
        let mut v4l2_crop = v4l2_crop {
            type_: V4L2_BUF_TYPE_VIDEO_CAPTURE,
            c: (*rect).into(),
        };
        unsafe { self.handle.ioctl(vidioc::VIDIOC_S_CROP, &mut v4l2_crop) }
    }

    fn next_control(&self, id: u32) -> io::Result<control::Description> {
        unsafe {
            let mut v4l2_ctrl: v4l2_queryctrl = mem::zeroed();
            v4l2_ctrl.id = id | V4L2_CTRL_FLAG_NEXT_CTRL;
            self.handle.ioctl(vidioc::VIDIOC_QUERYCTRL, &mut v4l2_ctrl)?;
            Ok(control::Description::from(v4l2_ctrl))
        }
    }

    fn menu_item(&self, ctrl: &control::Description, index: u32) -> io::Result<MenuItem> {
        unsafe {
            let mut v4l2_menu: v4l2_querymenu = mem::zeroed();
            v4l2_menu.id = ctrl.id;
            v4l2_menu.index = index;
            self.handle.ioctl(vidioc::VIDIOC_QUERYMENU, &mut v4l2_menu)?;
            MenuItem::from_raw(ctrl.typ, &v4l2_menu)
                .ok_or_else(|| io::Error::from_raw_os_error(libc::EINVAL))
        }
    }

    fn control(&self, id: u32, typ: control::Type) -> io::Result<i64> {
        if typ == control::Type::Integer64 {
            return self.ext_control(vidioc::VIDIOC_G_EXT_CTRLS, id, typ, 0);
        }

        let mut v4l2_ctrl = v4l2_control { id, value: 0 };
        unsafe { self.handle.ioctl(vidioc::VIDIOC_G_CTRL, &mut v4l2_ctrl)? };
        Ok(v4l2_ctrl.value as i64)
    }

    fn set_control(&self, id: u32, typ: control::Type, value: i64) -> io::Result<()> {
        let res = self.ext_control(vidioc::VIDIOC_S_EXT_CTRLS, id, typ, value);
        // Older drivers only implement the single control request, which has no 64-bit form.
        if res.is_ok() || typ == control::Type::Integer64 {
            return res.map(|_| ());
        }

        let mut v4l2_ctrl = v4l2_control {
            id,
            value: value as i32,
        };
        unsafe { self.handle.ioctl(vidioc::VIDIOC_S_CTRL, &mut v4l2_ctrl) }
    }

    fn request_buffers(&self, memory: Memory, count: u32) -> io::Result<u32> {
        let mut v4l2_reqbufs = v4l2_requestbuffers {
            count,
            type_: V4L2_BUF_TYPE_VIDEO_CAPTURE,
            memory: memory as u32,
            ..unsafe { mem::zeroed() }
        };
        unsafe { self.handle.ioctl(vidioc::VIDIOC_REQBUFS, &mut v4l2_reqbufs)? };
        Ok(v4l2_reqbufs.count)
    }

    fn query_buffer(&self, index: u32) -> io::Result<BufferInfo> {
        unsafe {
            let mut v4l2_buf: v4l2_buffer = mem::zeroed();
            v4l2_buf.type_ = V4L2_BUF_TYPE_VIDEO_CAPTURE;
            v4l2_buf.memory = Memory::Mmap as u32;
            v4l2_buf.index = index;
            self.handle.ioctl(vidioc::VIDIOC_QUERYBUF, &mut v4l2_buf)?;

            Ok(BufferInfo {
                index,
                length: v4l2_buf.length,
                offset: v4l2_buf.m.offset,
            })
        }
    }

    unsafe fn map(&self, info: &BufferInfo) -> io::Result<*mut u8> {
        let ptr = unsafe {
            v4l2::mmap(
                info.length as usize,
                self.handle.fd(),
                info.offset as libc::off_t,
                self.handle.backend(),
            )?
        };
        Ok(ptr as *mut u8)
    }

    unsafe fn unmap(&self, ptr: *mut u8, length: usize) -> io::Result<()> {
        unsafe { v4l2::munmap(ptr as *mut c_void, length, self.handle.backend()) }
    }

    fn queue(&self, buf: &Enqueue) -> io::Result<()> {
        let mut v4l2_buf = v4l2_buffer::from(*buf);
        unsafe { self.handle.ioctl(vidioc::VIDIOC_QBUF, &mut v4l2_buf) }
    }

    fn dequeue(&self, memory: Memory) -> io::Result<Dequeued> {
        unsafe {
            let mut v4l2_buf: v4l2_buffer = mem::zeroed();
            v4l2_buf.type_ = V4L2_BUF_TYPE_VIDEO_CAPTURE;
            v4l2_buf.memory = memory as u32;
            v4l2_buf.m.userptr = 0;
            self.handle.ioctl(vidioc::VIDIOC_DQBUF, &mut v4l2_buf)?;
            Ok(Dequeued::from(v4l2_buf))
        }
    }

    fn stream_on(&self) -> io::Result<()> {
        let mut typ = V4L2_BUF_TYPE_VIDEO_CAPTURE as v4l2_int;
        unsafe { self.handle.ioctl(vidioc::VIDIOC_STREAMON, &mut typ) }
    }

    fn stream_off(&self) -> io::Result<()> {
        let mut typ = V4L2_BUF_TYPE_VIDEO_CAPTURE as v4l2_int;
        unsafe { self.handle.ioctl(vidioc::VIDIOC_STREAMOFF, &mut typ) }
    }

    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        v4l2::read(self.handle.fd(), buf, self.handle.backend())
    }

    fn wait(&self, timeout_ms: i32) -> io::Result<bool> {
        // libv4l2 descriptors are plain kernel descriptors as far as poll() is concerned.
        v4l2::poll(self.handle.fd(), timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::Type;

    #[test]
    fn ext_values_follow_the_control_type() {
        let wide = ext_value(Type::Integer64, -1);
        assert_eq!(unsafe { wide.value64 }, -1);
        assert_eq!(unsafe { read_ext_value(Type::Integer64, &wide) }, -1);

        let big = ext_value(Type::Integer64, 1 << 40);
        assert_eq!(unsafe { read_ext_value(Type::Integer64, &big) }, 1 << 40);

        let narrow = ext_value(Type::Integer, -5);
        assert_eq!(unsafe { narrow.value }, -5);
        assert_eq!(unsafe { read_ext_value(Type::Integer, &narrow) }, -5);
    }
}
