use std::fmt;

use crate::v4l2::videodev::*;
use crate::{format::FourCC, fraction::Fraction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Frame interval as returned by [`crate::v4l2::vidioc::VIDIOC_ENUM_FRAMEINTERVALS`]
pub struct FrameInterval {
    pub index: u32,
    pub fourcc: FourCC,
    pub width: u32,
    pub height: u32,
    pub interval: FrameIntervalEnum,
}

impl fmt::Display for FrameInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.interval.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameIntervalEnum {
    Discrete(Fraction),
    Stepwise(Stepwise),
}

impl FrameIntervalEnum {
    /// Highest frame rate (frames per second) this entry allows
    ///
    /// A discrete interval `num/den` seconds gives `den/num` fps. For a range the shortest
    /// interval wins.
    pub fn max_fps(&self) -> f64 {
        match self {
            FrameIntervalEnum::Discrete(interval) => interval.inverse().as_f64(),
            FrameIntervalEnum::Stepwise(stepwise) => stepwise.min.inverse().as_f64(),
        }
    }
}

impl fmt::Display for FrameIntervalEnum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameIntervalEnum::Discrete(val) => write!(f, "Discrete({})", val)?,
            FrameIntervalEnum::Stepwise(val) => write!(f, "Stepwise({})", val)?,
        }

        Ok(())
    }
}

impl TryFrom<v4l2_frmivalenum> for FrameIntervalEnum {
    type Error = String;

    fn try_from(desc: v4l2_frmivalenum) -> Result<Self, Self::Error> {
        unsafe {
            // Unsafe because of access to union u
            match desc.type_ {
                V4L2_FRMIVAL_TYPE_DISCRETE => {
                    Ok(FrameIntervalEnum::Discrete(Fraction::from(desc.u.discrete)))
                }
                V4L2_FRMIVAL_TYPE_CONTINUOUS | V4L2_FRMIVAL_TYPE_STEPWISE => {
                    Ok(FrameIntervalEnum::Stepwise(Stepwise {
                        min: Fraction::from(desc.u.stepwise.min),
                        max: Fraction::from(desc.u.stepwise.max),
                        step: Fraction::from(desc.u.stepwise.step),
                    }))
                }
                typ => Err(format!("Unknown frame interval type: {}", typ)),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stepwise {
    /// Minimum frame interval (in seconds).
    pub min: Fraction,
    /// Maximum frame interval (in seconds).
    pub max: Fraction,
    /// Frame interval step size (in seconds).
    pub step: Fraction,
}

impl fmt::Display for Stepwise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} with step {}", self.min, self.max, self.step)?;
        Ok(())
    }
}

impl TryFrom<v4l2_frmivalenum> for FrameInterval {
    type Error = String;

    fn try_from(desc: v4l2_frmivalenum) -> Result<Self, Self::Error> {
        Ok(FrameInterval {
            index: desc.index,
            fourcc: FourCC::from(desc.pixel_format),
            width: desc.width,
            height: desc.height,
            interval: FrameIntervalEnum::try_from(desc)?,
        })
    }
}
