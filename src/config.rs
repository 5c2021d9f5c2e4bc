use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::Error;
use crate::input::TunerAudioMode;
use crate::locator;
use crate::memory::IoMethod;

/// Device node opened when the locator names none
pub const DEFAULT_DEVICE: &str = "/dev/video0";

/// Capture session settings
///
/// Every field mirrors one locator option, see [`crate::locator`]. Optional fields left at
/// `None` are not applied to the device.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub device: PathBuf,
    /// Analog standard, by name or number
    pub standard: Option<String>,
    /// Requested chroma name, e.g. `I420` or `YUYV`
    pub chroma: Option<String>,
    pub input: u32,
    pub audio_input: Option<u32>,
    /// Frame width, autodetected when `<= 0`
    pub width: i32,
    /// Frame height, autodetected when `<= 0`
    pub height: i32,
    /// Frame rate, `0` picks the fastest the device offers
    pub fps: f64,
    /// Display aspect ratio as `(n, m)`
    pub aspect_ratio: (u32, u32),
    pub tuner: u32,
    /// Tuner frequency in Hz or kHz, depending on the tuner
    pub tuner_frequency: Option<i64>,
    pub tuner_audio_mode: Option<TunerAudioMode>,
    /// Extra control assignments, `{name=value,...}`
    pub set_ctrls: Option<String>,
    pub use_libv4l2: bool,
    /// Forces an I/O method instead of the one probing prefers
    pub io: Option<IoMethod>,
    /// Writes every control back to its default value
    pub controls_reset: bool,
    /// Per-control values keyed by normalized control name
    ///
    /// The value `-1` leaves a control untouched.
    pub controls: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            device: PathBuf::from(DEFAULT_DEVICE),
            standard: None,
            chroma: None,
            input: 0,
            audio_input: None,
            width: -1,
            height: -1,
            fps: 0.0,
            aspect_ratio: (4, 3),
            tuner: 0,
            tuner_frequency: None,
            tuner_audio_mode: None,
            set_ctrls: None,
            use_libv4l2: false,
            io: None,
            controls_reset: false,
            controls: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Returns the default configuration for a device node
    ///
    /// # Example
    ///
    /// ```
    /// use v4l2_capture::Config;
    /// let config = Config::with_device("/dev/video2");
    /// assert_eq!(config.width, -1);
    /// ```
    pub fn with_device<P: Into<PathBuf>>(device: P) -> Self {
        Config {
            device: device.into(),
            ..Config::default()
        }
    }

    /// Whether the frame size has to be detected from the device
    pub fn autodetect_size(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Value configured for a control, if any
    pub fn control(&self, name: &str) -> Option<&str> {
        self.controls.get(name).map(String::as_str)
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        locator::parse(s)
    }
}
