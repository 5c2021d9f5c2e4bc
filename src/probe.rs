//! Device discovery: capabilities, I/O method, inputs, tuners and pixel formats.

use log::{debug, info};

use crate::capability::{Capabilities, Flags};
use crate::device::Driver;
use crate::error::{Error, Result};
use crate::format::{chroma, Description as FormatDescription, FourCC};
use crate::input::{AudioInput, Frequency, Input, Tuner, TunerType};
use crate::memory::IoMethod;

/// Upper bound on audio inputs listed; some drivers never fail `VIDIOC_ENUMAUDIO`
pub const MAX_AUDIO_INPUTS: u32 = 32;

/// What a device node offers, as discovered when the session opens
#[derive(Debug, Clone)]
pub struct Probe {
    pub caps: Capabilities,
    /// Capabilities of the opened node
    pub flags: Flags,
    /// I/O method the session streams with
    pub io: IoMethod,
    pub inputs: Vec<Input>,
    pub audio_inputs: Vec<AudioInput>,
    pub tuners: Vec<Tuner>,
    /// Current frequency of each tuner that reported one
    pub frequencies: Vec<Frequency>,
    pub formats: Vec<FormatDescription>,
}

/// Picks the I/O method, honoring a forced choice when the device supports it
pub fn io_method(flags: Flags, forced: Option<IoMethod>) -> Result<IoMethod> {
    let streaming = flags.contains(Flags::STREAMING);
    let read = flags.contains(Flags::READ_WRITE);

    match forced {
        Some(method @ (IoMethod::Mmap | IoMethod::UserPtr)) if streaming => Ok(method),
        Some(IoMethod::Read) if read => Ok(IoMethod::Read),
        Some(_) => Err(Error::NoIoMethod),
        None if streaming => Ok(IoMethod::Mmap),
        None if read => Ok(IoMethod::Read),
        None => Err(Error::NoIoMethod),
    }
}

/// Calls `get` with increasing indices until it fails or `limit` entries were collected
fn enumerate<T, F>(limit: u32, mut get: F) -> Vec<T>
where
    F: FnMut(u32) -> std::io::Result<T>,
{
    let mut items = Vec::new();
    for index in 0..limit {
        match get(index) {
            Ok(item) => items.push(item),
            Err(_) => break,
        }
    }
    items
}

impl Probe {
    /// Queries the device
    ///
    /// Only the capability query and the I/O method choice can fail. Inputs, tuners and formats
    /// are collected for as long as the driver answers.
    pub fn run<D: Driver + ?Sized>(driver: &D, forced: Option<IoMethod>) -> Result<Self> {
        let caps = driver.query_caps().map_err(Error::QueryCaps)?;
        let flags = caps.effective();

        debug!(
            "device {} using driver {} (version {}.{}.{}) on {}",
            caps.card, caps.driver, caps.version.0, caps.version.1, caps.version.2, caps.bus
        );
        debug!("capabilities: {}", flags);

        let io = io_method(flags, forced)?;
        info!("using {} I/O", io);

        let mut probe = Probe {
            caps,
            flags,
            io,
            inputs: Vec::new(),
            audio_inputs: Vec::new(),
            tuners: Vec::new(),
            frequencies: Vec::new(),
            formats: Vec::new(),
        };

        if probe.has_video() {
            probe.inputs = enumerate(u32::MAX, |i| driver.input(i));
            for input in &probe.inputs {
                debug!("video input {}", input);
            }
        }

        if probe.has_audio() {
            probe.audio_inputs = enumerate(MAX_AUDIO_INPUTS, |i| driver.audio_input(i));
            for audio in &probe.audio_inputs {
                debug!("audio input {}", audio);
            }
        }

        if probe.has_tuner() {
            probe.tuners = enumerate(u32::MAX, |i| driver.tuner(i));
            for tuner in &probe.tuners {
                debug!("{}", tuner);
                match driver.frequency(tuner.index) {
                    Ok(freq) => {
                        let unit = if tuner.low { 62.5 } else { 62.5e3 };
                        debug!(
                            "tuner {} ({}) frequency: {:.1} {}",
                            tuner.index,
                            tuner.name,
                            freq.frequency as f64 * unit / 1e3,
                            tuner.unit()
                        );
                        probe.frequencies.push(freq);
                    }
                    Err(e) => debug!("cannot get tuner {} frequency: {}", tuner.index, e),
                }
            }
        }

        if probe.has_video() {
            probe.formats = enumerate(u32::MAX, |i| driver.format_description(i));
            for desc in &probe.formats {
                match chroma::by_fourcc(desc.fourcc) {
                    Some(chroma) => debug!("device supports chroma {} [{}]", chroma.name, desc),
                    None => debug!("device chroma {} is not supported", desc),
                }
            }
        }

        Ok(probe)
    }

    pub fn has_video(&self) -> bool {
        self.flags.contains(Flags::VIDEO_CAPTURE)
    }

    pub fn has_audio(&self) -> bool {
        self.flags.contains(Flags::AUDIO)
    }

    pub fn has_tuner(&self) -> bool {
        self.flags.contains(Flags::TUNER)
    }

    /// Type of tuner `index`, radio when the tuner was not enumerated
    pub fn tuner_type(&self, index: u32) -> TunerType {
        self.tuners
            .iter()
            .find(|tuner| tuner.index == index)
            .map(|tuner| tuner.typ)
            .unwrap_or(TunerType::Radio)
    }

    /// Whether the driver enumerated `fourcc`, or enumerated nothing at all
    pub fn offers(&self, fourcc: FourCC) -> bool {
        self.formats.is_empty() || self.formats.iter().any(|desc| desc.fourcc == fourcc)
    }
}
