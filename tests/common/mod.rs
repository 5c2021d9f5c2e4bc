//! Simulated capture driver for the integration tests.

#![allow(dead_code)]

use std::cell::{RefCell, RefMut};
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

use v4l2_capture::buffer::{self, BufferInfo, Dequeued, Enqueue};
use v4l2_capture::capability::{Capabilities, Flags};
use v4l2_capture::control::{self, MenuItem, Type};
use v4l2_capture::crop::{CropCap, Rect};
use v4l2_capture::format::{self, FieldOrder, Format, FourCC};
use v4l2_capture::frameinterval::{FrameInterval, FrameIntervalEnum};
use v4l2_capture::framesize::{Discrete, FrameSize, FrameSizeEnum};
use v4l2_capture::input::{
    AudioInput, Frequency, Input, InputType, Tuner, TunerAudioMode, TunerType,
};
use v4l2_capture::memory::Memory;
use v4l2_capture::standard::Standard;
use v4l2_capture::{Driver, Fraction, Timestamp};

pub const BRIGHTNESS: u32 = 0x0098_0900;
pub const CONTRAST: u32 = 0x0098_0901;
pub const AUTO_WHITE_BALANCE: u32 = 0x0098_090c;
pub const POWER_LINE_FREQUENCY: u32 = 0x0098_0918;
pub const USER_CLASS: u32 = 0x0098_0001;
pub const MPEG_BITRATE: u32 = 0x0099_09cf;
pub const TIME_OFFSET: u32 = 0x0098_1001;

fn errno(code: i32) -> io::Error {
    io::Error::from_raw_os_error(code)
}

/// One scripted answer to a wait or dequeue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Deliver the next queued buffer
    Frame,
    /// The wait times out
    Timeout,
    /// The dequeue fails with this errno
    Errno(i32),
}

#[derive(Debug, Clone)]
pub struct SimControl {
    pub desc: control::Description,
    pub value: i64,
    /// Menu labels by index, an empty label is a hole
    pub menu: Vec<&'static str>,
}

impl SimControl {
    pub fn new(id: u32, typ: Type, name: &str, min: i64, max: i64, step: u64, default: i64) -> Self {
        SimControl {
            desc: control::Description {
                id,
                typ,
                name: name.to_string(),
                minimum: min,
                maximum: max,
                step,
                default,
                flags: control::Flags::empty(),
            },
            value: default,
            menu: Vec::new(),
        }
    }
}

/// Device state and call counters
#[derive(Debug)]
pub struct Sim {
    pub flags: Flags,
    pub fail_caps: bool,
    pub inputs: u32,
    pub audio_inputs: u32,
    pub tuners: Vec<Tuner>,
    pub supported_std: Standard,
    pub std: Standard,
    pub input: Option<u32>,
    pub audio_input: Option<u32>,
    pub frequency: Option<Frequency>,
    pub audio_mode: Option<TunerAudioMode>,

    /// Formats listed by enumeration
    pub formats: Vec<FourCC>,
    /// Formats `set_format` accepts
    pub accepted: Vec<FourCC>,
    /// Field order the driver settles on; anything but progressive rejects progressive requests
    pub field: FieldOrder,
    pub current: Format,
    /// Frame sizes with their highest frame rate
    pub sizes: Vec<(Discrete, u32)>,
    /// Every format passed to `set_format`
    pub format_requests: Vec<Format>,
    pub frame_intervals: Vec<Fraction>,
    pub crop: Option<Rect>,

    pub controls: Vec<SimControl>,
    pub control_writes: Vec<(u32, i64)>,
    pub menu_queries: u32,

    /// Caps the number of buffers granted
    pub grant: Option<u32>,
    pub memory: Option<Memory>,
    pub allocated: u32,
    pub buffers: Vec<Vec<u8>>,
    pub mapped: usize,
    pub queue: VecDeque<Enqueue>,
    pub userptrs: Vec<(usize, u32)>,
    pub streaming: bool,
    pub fail_stream_on: bool,
    pub stream_ons: u32,
    pub stream_offs: u32,

    pub script: VecDeque<Step>,
    pub payload: Vec<u8>,
    pub sequence: u32,
    pub reads: u32,
}

fn yuyv(width: u32, height: u32) -> Format {
    Format {
        stride: width * 2,
        size: width * height * 2,
        ..Format::new(width, height, FourCC::YUYV)
    }
}

impl Sim {
    /// USB-style camera: YUYV and MJPEG, streaming and read(), a handful of user controls
    pub fn camera() -> Self {
        let mut power_line = SimControl::new(
            POWER_LINE_FREQUENCY,
            Type::Menu,
            "Power Line Frequency",
            0,
            2,
            1,
            1,
        );
        power_line.menu = vec!["Disabled", "50 Hz", "60 Hz"];

        Sim {
            flags: Flags::VIDEO_CAPTURE | Flags::STREAMING | Flags::READ_WRITE,
            fail_caps: false,
            inputs: 1,
            audio_inputs: 0,
            tuners: Vec::new(),
            supported_std: Standard::empty(),
            std: Standard::empty(),
            input: None,
            audio_input: None,
            frequency: None,
            audio_mode: None,

            formats: vec![FourCC::YUYV, FourCC::MJPEG],
            accepted: vec![FourCC::YUYV, FourCC::MJPEG],
            field: FieldOrder::Progressive,
            current: yuyv(640, 480),
            sizes: vec![
                (Discrete { width: 320, height: 240 }, 60),
                (Discrete { width: 640, height: 480 }, 30),
                (Discrete { width: 1280, height: 720 }, 10),
            ],
            format_requests: Vec::new(),
            frame_intervals: Vec::new(),
            crop: None,

            controls: vec![
                SimControl::new(USER_CLASS, Type::CtrlClass, "User Controls", 0, 0, 0, 0),
                SimControl::new(BRIGHTNESS, Type::Integer, "Brightness", 0, 255, 1, 128),
                SimControl::new(CONTRAST, Type::Integer, "Contrast", 0, 100, 5, 50),
                SimControl::new(
                    AUTO_WHITE_BALANCE,
                    Type::Boolean,
                    "White Balance, Automatic",
                    0,
                    1,
                    1,
                    1,
                ),
                power_line,
            ],
            control_writes: Vec::new(),
            menu_queries: 0,

            grant: None,
            memory: None,
            allocated: 0,
            buffers: Vec::new(),
            mapped: 0,
            queue: VecDeque::new(),
            userptrs: Vec::new(),
            streaming: false,
            fail_stream_on: false,
            stream_ons: 0,
            stream_offs: 0,

            script: VecDeque::new(),
            payload: (0..64).collect(),
            sequence: 0,
            reads: 0,
        }
    }

    /// Analog TV card: interlaced PAL/NTSC with a tuner, an audio input and an MPEG encoder
    pub fn tv_card() -> Self {
        let mut sim = Sim::camera();
        sim.flags |= Flags::TUNER | Flags::AUDIO;
        sim.inputs = 2;
        sim.audio_inputs = 2;
        sim.tuners = vec![Tuner {
            index: 0,
            name: "Television".to_string(),
            typ: TunerType::AnalogTv,
            low: false,
            range_low: 44 * 16,
            range_high: 958 * 16,
            audio_mode: 1,
        }];
        sim.supported_std = Standard::PAL | Standard::NTSC | Standard::SECAM;
        sim.std = Standard::PAL;
        sim.formats = vec![FourCC::UYVY, FourCC::YUV420];
        sim.accepted = vec![FourCC::UYVY, FourCC::YUV420];
        sim.field = FieldOrder::Interlaced;
        sim.current = Format {
            fourcc: FourCC::UYVY,
            field_order: FieldOrder::Interlaced,
            ..yuyv(720, 576)
        };
        sim.sizes = Vec::new();
        sim.controls.push(SimControl::new(
            MPEG_BITRATE,
            Type::Integer,
            "Video Bitrate",
            100_000,
            27_000_000,
            100_000,
            6_000_000,
        ));
        sim
    }

    /// Buffers the driver still holds, mapped or not
    pub fn outstanding(&self) -> usize {
        self.allocated as usize + self.mapped
    }

    pub fn control_value(&self, id: u32) -> Option<i64> {
        self.controls.iter().find(|c| c.desc.id == id).map(|c| c.value)
    }

    fn control_mut(&mut self, id: u32) -> io::Result<&mut SimControl> {
        self.controls
            .iter_mut()
            .find(|c| c.desc.id == id)
            .ok_or_else(|| errno(libc::EINVAL))
    }

    fn next_step(&mut self) -> Option<Step> {
        match self.script.front() {
            Some(Step::Frame) | Some(Step::Errno(_)) => self.script.pop_front(),
            _ => None,
        }
    }

    fn fill(&mut self, dst: &mut [u8]) -> usize {
        let n = self.payload.len().min(dst.len());
        dst[..n].copy_from_slice(&self.payload[..n]);
        n
    }
}

/// [`Driver`] backed by shared [`Sim`] state
///
/// Clones share the state, so a test can keep one to inspect the device after handing the
/// other to a session.
#[derive(Debug, Clone)]
pub struct SimDriver {
    sim: Rc<RefCell<Sim>>,
}

impl SimDriver {
    pub fn new(sim: Sim) -> Self {
        SimDriver {
            sim: Rc::new(RefCell::new(sim)),
        }
    }

    pub fn camera() -> Self {
        SimDriver::new(Sim::camera())
    }

    pub fn state(&self) -> RefMut<'_, Sim> {
        self.sim.borrow_mut()
    }

    pub fn script(&self, steps: &[Step]) {
        self.state().script.extend(steps.iter().copied());
    }
}

impl Driver for SimDriver {
    fn query_caps(&self) -> io::Result<Capabilities> {
        let sim = self.state();
        if sim.fail_caps {
            return Err(errno(libc::ENOTTY));
        }
        Ok(Capabilities {
            driver: "sim".to_string(),
            card: "Simulated capture".to_string(),
            bus: "platform:sim".to_string(),
            version: (6, 1, 0),
            capabilities: sim.flags,
            device_caps: Flags::empty(),
        })
    }

    fn input(&self, index: u32) -> io::Result<Input> {
        let sim = self.state();
        if index >= sim.inputs {
            return Err(errno(libc::EINVAL));
        }
        let tuner = !sim.tuners.is_empty() && index == 0;
        Ok(Input {
            index,
            name: format!("Input {}", index),
            typ: if tuner { InputType::Tuner } else { InputType::Camera },
            tuner: 0,
            std: sim.supported_std,
        })
    }

    fn set_input(&self, index: u32) -> io::Result<()> {
        let mut sim = self.state();
        if index >= sim.inputs {
            return Err(errno(libc::EINVAL));
        }
        sim.input = Some(index);
        Ok(())
    }

    fn audio_input(&self, index: u32) -> io::Result<AudioInput> {
        if index >= self.state().audio_inputs {
            return Err(errno(libc::EINVAL));
        }
        Ok(AudioInput {
            index,
            name: format!("Line {}", index),
            stereo: true,
            avl: false,
        })
    }

    fn set_audio_input(&self, index: u32) -> io::Result<()> {
        let mut sim = self.state();
        if index >= sim.audio_inputs {
            return Err(errno(libc::EINVAL));
        }
        sim.audio_input = Some(index);
        Ok(())
    }

    fn tuner(&self, index: u32) -> io::Result<Tuner> {
        self.state()
            .tuners
            .get(index as usize)
            .cloned()
            .ok_or_else(|| errno(libc::EINVAL))
    }

    fn set_tuner_audio_mode(&self, index: u32, mode: TunerAudioMode) -> io::Result<()> {
        let mut sim = self.state();
        if index as usize >= sim.tuners.len() {
            return Err(errno(libc::EINVAL));
        }
        sim.audio_mode = Some(mode);
        Ok(())
    }

    fn frequency(&self, tuner: u32) -> io::Result<Frequency> {
        let sim = self.state();
        let typ = sim
            .tuners
            .get(tuner as usize)
            .map(|t| t.typ)
            .ok_or_else(|| errno(libc::EINVAL))?;
        Ok(sim.frequency.unwrap_or(Frequency {
            tuner,
            typ,
            frequency: 0,
        }))
    }

    fn set_frequency(&self, freq: &Frequency) -> io::Result<()> {
        let mut sim = self.state();
        if freq.tuner as usize >= sim.tuners.len() {
            return Err(errno(libc::EINVAL));
        }
        sim.frequency = Some(*freq);
        Ok(())
    }

    fn set_standard(&self, std: Standard) -> io::Result<()> {
        let mut sim = self.state();
        let matched = std & sim.supported_std;
        if matched.is_empty() {
            return Err(errno(libc::EINVAL));
        }
        sim.std = matched;
        Ok(())
    }

    fn standard(&self) -> io::Result<Standard> {
        let sim = self.state();
        if sim.supported_std.is_empty() {
            return Err(errno(libc::ENODATA));
        }
        Ok(sim.std)
    }

    fn format_description(&self, index: u32) -> io::Result<format::Description> {
        let sim = self.state();
        let fourcc = *sim
            .formats
            .get(index as usize)
            .ok_or_else(|| errno(libc::EINVAL))?;
        Ok(format::Description {
            index,
            flags: format::description::Flags::empty(),
            description: fourcc.to_string(),
            fourcc,
        })
    }

    fn format(&self) -> io::Result<Format> {
        Ok(self.state().current)
    }

    fn set_format(&self, fmt: &Format) -> io::Result<Format> {
        let mut sim = self.state();
        sim.format_requests.push(*fmt);
        if sim.streaming || sim.allocated > 0 {
            return Err(errno(libc::EBUSY));
        }
        if !sim.accepted.contains(&fmt.fourcc) {
            return Err(errno(libc::EINVAL));
        }
        if fmt.field_order == FieldOrder::Progressive && sim.field != FieldOrder::Progressive {
            return Err(errno(libc::EINVAL));
        }

        // Sizes are clamped to the largest listed one, like real hardware does.
        let (max_w, max_h) = sim
            .sizes
            .iter()
            .map(|(size, _)| (size.width, size.height))
            .max()
            .unwrap_or((sim.current.width, sim.current.height));
        let width = fmt.width.clamp(1, max_w.max(1));
        let height = fmt.height.clamp(1, max_h.max(1));

        let current = Format {
            width,
            height,
            fourcc: fmt.fourcc,
            field_order: sim.field,
            stride: width * 2,
            size: width * height * 2,
        };
        sim.current = current;
        Ok(current)
    }

    fn frame_size(&self, fourcc: FourCC, index: u32) -> io::Result<FrameSize> {
        let sim = self.state();
        let (size, _) = sim
            .sizes
            .get(index as usize)
            .ok_or_else(|| errno(libc::EINVAL))?;
        Ok(FrameSize {
            index,
            fourcc,
            size: FrameSizeEnum::Discrete(*size),
        })
    }

    fn frame_interval(
        &self,
        fourcc: FourCC,
        width: u32,
        height: u32,
        index: u32,
    ) -> io::Result<FrameInterval> {
        let sim = self.state();
        let fps = sim
            .sizes
            .iter()
            .find(|(size, _)| size.width == width && size.height == height)
            .map(|(_, fps)| *fps)
            .filter(|_| index == 0)
            .ok_or_else(|| errno(libc::EINVAL))?;
        Ok(FrameInterval {
            index,
            fourcc,
            width,
            height,
            interval: FrameIntervalEnum::Discrete(Fraction::new(1, fps)),
        })
    }

    fn set_frame_interval(&self, interval: Fraction) -> io::Result<Fraction> {
        self.state().frame_intervals.push(interval);
        Ok(interval)
    }

    fn crop_cap(&self) -> io::Result<CropCap> {
        let sim = self.state();
        let rect = Rect {
            left: 0,
            top: 0,
            width: sim.current.width,
            height: sim.current.height,
        };
        Ok(CropCap {
            bounds: rect,
            defrect: rect,
            pixel_aspect: Fraction::new(1, 1),
        })
    }

    fn set_crop(&self, rect: &Rect) -> io::Result<()> {
        self.state().crop = Some(*rect);
        Ok(())
    }

    fn next_control(&self, id: u32) -> io::Result<control::Description> {
        let sim = self.state();
        sim.controls
            .iter()
            .map(|c| &c.desc)
            .filter(|desc| desc.id > id)
            .min_by_key(|desc| desc.id)
            .cloned()
            .ok_or_else(|| errno(libc::EINVAL))
    }

    fn menu_item(&self, ctrl: &control::Description, index: u32) -> io::Result<MenuItem> {
        let mut sim = self.state();
        sim.menu_queries += 1;
        let control = sim
            .controls
            .iter()
            .find(|c| c.desc.id == ctrl.id)
            .ok_or_else(|| errno(libc::EINVAL))?;
        match control.menu.get(index as usize) {
            Some(label) if !label.is_empty() => Ok(MenuItem::Name(label.to_string())),
            _ => Err(errno(libc::EINVAL)),
        }
    }

    fn control(&self, id: u32, typ: Type) -> io::Result<i64> {
        let mut sim = self.state();
        let control = sim.control_mut(id)?;
        // 64-bit controls have no single control request.
        if (control.desc.typ == Type::Integer64) != (typ == Type::Integer64) {
            return Err(errno(libc::EINVAL));
        }
        Ok(control.value)
    }

    fn set_control(&self, id: u32, typ: Type, value: i64) -> io::Result<()> {
        let mut sim = self.state();
        let control = sim.control_mut(id)?;
        let desc = &control.desc;
        if (desc.typ == Type::Integer64) != (typ == Type::Integer64) {
            return Err(errno(libc::EINVAL));
        }
        if desc.flags.contains(control::Flags::READ_ONLY) {
            return Err(errno(libc::EACCES));
        }

        let step = desc.step.max(1) as i64;
        let clamped = value.clamp(desc.minimum, desc.maximum);
        let stepped = desc.minimum + (clamped - desc.minimum) / step * step;
        control.value = stepped;
        sim.control_writes.push((id, value));
        Ok(())
    }

    fn request_buffers(&self, memory: Memory, count: u32) -> io::Result<u32> {
        let mut sim = self.state();
        if sim.streaming {
            return Err(errno(libc::EBUSY));
        }
        if count == 0 {
            sim.memory = None;
            sim.allocated = 0;
            sim.buffers.clear();
            sim.queue.clear();
            sim.userptrs.clear();
            return Ok(0);
        }

        let granted = sim.grant.map_or(count, |grant| grant.min(count));
        sim.memory = Some(memory);
        sim.allocated = granted;
        if memory == Memory::Mmap {
            let size = sim.current.size as usize;
            sim.buffers = (0..granted).map(|_| vec![0; size]).collect();
        }
        Ok(granted)
    }

    fn query_buffer(&self, index: u32) -> io::Result<BufferInfo> {
        let sim = self.state();
        let buf = sim
            .buffers
            .get(index as usize)
            .ok_or_else(|| errno(libc::EINVAL))?;
        Ok(BufferInfo {
            index,
            length: buf.len() as u32,
            offset: index * 0x1000,
        })
    }

    unsafe fn map(&self, info: &BufferInfo) -> io::Result<*mut u8> {
        let mut sim = self.state();
        let ptr = sim
            .buffers
            .get_mut(info.index as usize)
            .map(|buf| buf.as_mut_ptr())
            .ok_or_else(|| errno(libc::EINVAL))?;
        sim.mapped += 1;
        Ok(ptr)
    }

    unsafe fn unmap(&self, _ptr: *mut u8, _length: usize) -> io::Result<()> {
        let mut sim = self.state();
        if sim.mapped == 0 {
            return Err(errno(libc::EINVAL));
        }
        sim.mapped -= 1;
        Ok(())
    }

    fn queue(&self, buf: &Enqueue) -> io::Result<()> {
        let mut sim = self.state();
        if sim.memory != Some(buf.memory) || buf.index >= sim.allocated {
            return Err(errno(libc::EINVAL));
        }
        if buf.memory == Memory::UserPtr {
            if buf.userptr == 0 || buf.length == 0 {
                return Err(errno(libc::EFAULT));
            }
            let entry = (buf.userptr, buf.length);
            if !sim.userptrs.contains(&entry) {
                sim.userptrs.push(entry);
            }
        }
        sim.queue.push_back(*buf);
        Ok(())
    }

    fn dequeue(&self, memory: Memory) -> io::Result<Dequeued> {
        let mut sim = self.state();
        if sim.memory != Some(memory) {
            return Err(errno(libc::EINVAL));
        }
        if let Some(Step::Errno(code)) = sim.next_step() {
            return Err(errno(code));
        }
        if !sim.streaming {
            return Err(errno(libc::EINVAL));
        }
        let buf = sim.queue.pop_front().ok_or_else(|| errno(libc::EAGAIN))?;

        let bytesused = match memory {
            Memory::Mmap => {
                let mut data = std::mem::take(&mut sim.buffers[buf.index as usize]);
                let n = sim.fill(&mut data);
                sim.buffers[buf.index as usize] = data;
                n
            }
            Memory::UserPtr => {
                // The arena lent this memory to us until it is dequeued.
                let dst = unsafe {
                    std::slice::from_raw_parts_mut(buf.userptr as *mut u8, buf.length as usize)
                };
                sim.fill(dst)
            }
        };

        let sequence = sim.sequence;
        sim.sequence += 1;
        Ok(Dequeued {
            index: buf.index,
            bytesused: bytesused as u32,
            flags: buffer::Flags::DONE,
            field: sim.current.field_order,
            sequence,
            timestamp: Timestamp::default(),
            userptr: buf.userptr,
            length: buf.length,
        })
    }

    fn stream_on(&self) -> io::Result<()> {
        let mut sim = self.state();
        if sim.fail_stream_on {
            return Err(errno(libc::EIO));
        }
        if sim.allocated == 0 {
            return Err(errno(libc::EINVAL));
        }
        sim.streaming = true;
        sim.stream_ons += 1;
        Ok(())
    }

    fn stream_off(&self) -> io::Result<()> {
        let mut sim = self.state();
        sim.streaming = false;
        sim.queue.clear();
        sim.stream_offs += 1;
        Ok(())
    }

    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut sim = self.state();
        if let Some(Step::Errno(code)) = sim.next_step() {
            return Err(errno(code));
        }
        sim.reads += 1;
        Ok(sim.fill(buf))
    }

    fn wait(&self, _timeout_ms: i32) -> io::Result<bool> {
        let mut sim = self.state();
        if sim.script.front() == Some(&Step::Timeout) {
            sim.script.pop_front();
            return Ok(false);
        }
        Ok(true)
    }
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
