//! Video inputs, audio inputs and tuners.

use std::fmt;

use crate::capability::cstr;
use crate::standard::Standard;
use crate::v4l2::videodev::{v4l2_audio, v4l2_frequency, v4l2_input, v4l2_tuner};

/// Input connector kind
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InputType {
    Tuner,
    Camera,
    Touch,
    Other(u32),
}

impl From<u32> for InputType {
    fn from(repr: u32) -> Self {
        match repr {
            1 => Self::Tuner,
            2 => Self::Camera,
            3 => Self::Touch,
            repr => Self::Other(repr),
        }
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tuner => write!(f, "tuner"),
            Self::Camera => write!(f, "external analog input"),
            Self::Touch => write!(f, "touch"),
            Self::Other(repr) => write!(f, "unknown ({})", repr),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Video input as returned by [`crate::v4l2::vidioc::VIDIOC_ENUMINPUT`]
pub struct Input {
    pub index: u32,
    pub name: String,
    pub typ: InputType,
    /// Tuner index, only meaningful for tuner inputs
    pub tuner: u32,
    /// Standards this input supports
    pub std: Standard,
}

impl From<v4l2_input> for Input {
    fn from(input: v4l2_input) -> Self {
        Input {
            index: input.index,
            name: cstr(&input.name),
            typ: InputType::from(input.type_),
            tuner: input.tuner,
            std: Standard::from(input.std),
        }
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "video input {} ({}) has type: {}", self.index, self.name, self.typ)?;
        if self.typ == InputType::Tuner {
            write!(f, " (tuner {})", self.tuner)?;
        }
        Ok(())
    }
}

const V4L2_AUDCAP_STEREO: u32 = 0x00001;
const V4L2_AUDCAP_AVL: u32 = 0x00002;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Audio input as returned by [`crate::v4l2::vidioc::VIDIOC_ENUMAUDIO`]
pub struct AudioInput {
    pub index: u32,
    pub name: String,
    pub stereo: bool,
    /// Automatic volume level
    pub avl: bool,
}

impl From<v4l2_audio> for AudioInput {
    fn from(audio: v4l2_audio) -> Self {
        AudioInput {
            index: audio.index,
            name: cstr(&audio.name),
            stereo: audio.capability & V4L2_AUDCAP_STEREO != 0,
            avl: audio.capability & V4L2_AUDCAP_AVL != 0,
        }
    }
}

impl fmt::Display for AudioInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "audio input {} ({}) is {}",
            self.index,
            self.name,
            if self.stereo { "Stereo" } else { "Mono" }
        )?;
        if self.avl {
            write!(f, " with AVL")?;
        }
        Ok(())
    }
}

/// Tuner kind, as used by `VIDIOC_S_FREQUENCY`
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TunerType {
    Radio,
    AnalogTv,
    Other(u32),
}

impl From<u32> for TunerType {
    fn from(repr: u32) -> Self {
        match repr {
            1 => Self::Radio,
            2 => Self::AnalogTv,
            repr => Self::Other(repr),
        }
    }
}

impl From<TunerType> for u32 {
    fn from(typ: TunerType) -> Self {
        match typ {
            TunerType::Radio => 1,
            TunerType::AnalogTv => 2,
            TunerType::Other(repr) => repr,
        }
    }
}

/// Audio mode of a tuner
#[allow(clippy::unreadable_literal)]
#[rustfmt::skip]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u32)]
pub enum TunerAudioMode {
    Mono        = 0,
    Stereo      = 1,
    Lang2       = 2,
    Sap         = 3,
    Lang1Lang2  = 4,
}

impl TryFrom<i64> for TunerAudioMode {
    type Error = i64;

    fn try_from(repr: i64) -> Result<Self, Self::Error> {
        match repr {
            0 => Ok(Self::Mono),
            1 => Ok(Self::Stereo),
            2 => Ok(Self::Lang2),
            3 => Ok(Self::Sap),
            4 => Ok(Self::Lang1Lang2),
            repr => Err(repr),
        }
    }
}

impl fmt::Display for TunerAudioMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mono => write!(f, "mono"),
            Self::Stereo => write!(f, "stereo"),
            Self::Lang2 => write!(f, "secondary language"),
            Self::Sap => write!(f, "SAP"),
            Self::Lang1Lang2 => write!(f, "both languages"),
        }
    }
}

const V4L2_TUNER_CAP_LOW: u32 = 0x0001;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Tuner as returned by [`crate::v4l2::vidioc::VIDIOC_G_TUNER`]
pub struct Tuner {
    pub index: u32,
    pub name: String,
    pub typ: TunerType,
    /// Frequencies are in units of 62.5 Hz rather than 62.5 kHz
    pub low: bool,
    pub range_low: u32,
    pub range_high: u32,
    pub audio_mode: u32,
}

impl Tuner {
    /// Unit of frequencies configured for this tuner
    pub fn unit(&self) -> &'static str {
        if self.low {
            "Hz"
        } else {
            "kHz"
        }
    }
}

impl From<v4l2_tuner> for Tuner {
    fn from(tuner: v4l2_tuner) -> Self {
        Tuner {
            index: tuner.index,
            name: cstr(&tuner.name),
            typ: TunerType::from(tuner.type_),
            low: tuner.capability & V4L2_TUNER_CAP_LOW != 0,
            range_low: tuner.rangelow,
            range_high: tuner.rangehigh,
            audio_mode: tuner.audmode,
        }
    }
}

impl fmt::Display for Tuner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = if self.low { 62.5 } else { 62.5e3 };
        write!(
            f,
            "tuner {} ({}) frequency range: {:.1} {} -> {:.1} {}",
            self.index,
            self.name,
            self.range_low as f64 * unit / 1e3,
            self.unit(),
            self.range_high as f64 * unit / 1e3,
            self.unit(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Tuner frequency as used by `VIDIOC_G_FREQUENCY` and `VIDIOC_S_FREQUENCY`
pub struct Frequency {
    pub tuner: u32,
    pub typ: TunerType,
    /// In units of 62.5 Hz or 62.5 kHz, see [`Tuner::low`]
    pub frequency: u32,
}

impl Frequency {
    /// Converts a configured frequency (Hz or kHz, per tuner unit) to driver units
    pub fn from_configured(tuner: u32, typ: TunerType, value: i64) -> Self {
        Frequency {
            tuner,
            typ,
            frequency: (value as f64 / 62.5) as u32,
        }
    }
}

impl From<v4l2_frequency> for Frequency {
    fn from(freq: v4l2_frequency) -> Self {
        Frequency {
            tuner: freq.tuner,
            typ: TunerType::from(freq.type_),
            frequency: freq.frequency,
        }
    }
}

impl From<Frequency> for v4l2_frequency {
    fn from(freq: Frequency) -> Self {
        v4l2_frequency {
            tuner: freq.tuner,
            type_: freq.typ.into(),
            frequency: freq.frequency,
            reserved: [0; 8],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_frequency_is_scaled() {
        let freq = Frequency::from_configured(0, TunerType::AnalogTv, 471_250);
        assert_eq!(freq.frequency, 7540);
        assert_eq!(v4l2_frequency::from(freq).type_, 2);
    }

    #[test]
    fn audio_modes() {
        assert_eq!(TunerAudioMode::try_from(4), Ok(TunerAudioMode::Lang1Lang2));
        assert_eq!(TunerAudioMode::try_from(5), Err(5));
        assert_eq!(TunerAudioMode::try_from(-1), Err(-1));
    }

    #[test]
    fn tuner_units() {
        let mut raw: v4l2_tuner = unsafe { std::mem::zeroed() };
        raw.capability = V4L2_TUNER_CAP_LOW;
        raw.type_ = 1;
        let tuner = Tuner::from(raw);
        assert_eq!(tuner.unit(), "Hz");
        assert_eq!(tuner.typ, TunerType::Radio);
    }
}
