use std::fmt;

use crate::format::FourCC;
use crate::v4l2::videodev::*;

/// Upper bound on the sizes sampled from one stepwise range
pub const MAX_CANDIDATES: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Frame size as returned by [`crate::v4l2::vidioc::VIDIOC_ENUM_FRAMESIZES`]
pub struct FrameSize {
    pub index: u32,
    pub fourcc: FourCC,
    pub size: FrameSizeEnum,
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.size.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSizeEnum {
    Discrete(Discrete),
    Stepwise(Stepwise),
}

fn grid(min: u32, max: u32, step: u32, limit: usize) -> Vec<u32> {
    if max <= min {
        return vec![min];
    }

    let step = step.max(1);
    let count = ((max - min) / step) as usize + 1;
    if count <= limit {
        return (0..count as u32).map(|i| min + i * step).collect();
    }

    // Too many steps: keep `limit` points spread over the grid, always including both ends.
    let stride = (count - 1) as u64;
    let last = (limit - 1) as u64;
    let mut points: Vec<u32> = (0..=last)
        .map(|i| min + ((i * stride / last) as u32) * step)
        .collect();
    points.dedup();
    points
}

impl FrameSizeEnum {
    /// Discrete sizes making up this entry
    ///
    /// Stepwise and continuous ranges are sampled on their step grid. Each axis contributes at
    /// most `sqrt(MAX_CANDIDATES)` points so the result stays bounded for wide ranges.
    pub fn to_discrete(self) -> Vec<Discrete> {
        match self {
            Self::Discrete(discrete) => vec![discrete],
            Self::Stepwise(stepwise) => {
                let per_axis = (MAX_CANDIDATES as f64).sqrt() as usize;
                let widths = grid(
                    stepwise.min_width,
                    stepwise.max_width,
                    stepwise.step_width,
                    per_axis,
                );
                let heights = grid(
                    stepwise.min_height,
                    stepwise.max_height,
                    stepwise.step_height,
                    per_axis,
                );

                let mut discrete = Vec::with_capacity(widths.len() * heights.len());
                for &width in &widths {
                    for &height in &heights {
                        discrete.push(Discrete { width, height });
                    }
                }
                discrete
            }
        }
    }
}

impl fmt::Display for FrameSizeEnum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameSizeEnum::Discrete(val) => write!(f, "Discrete({})", val)?,
            FrameSizeEnum::Stepwise(val) => write!(f, "Stepwise({})", val)?,
        }

        Ok(())
    }
}

impl TryFrom<v4l2_frmsizeenum> for FrameSizeEnum {
    type Error = String;

    fn try_from(desc: v4l2_frmsizeenum) -> Result<Self, Self::Error> {
        unsafe {
            // Unsafe because of access to union u
            match desc.type_ {
                V4L2_FRMSIZE_TYPE_DISCRETE => Ok(FrameSizeEnum::Discrete(Discrete {
                    width: desc.u.discrete.width,
                    height: desc.u.discrete.height,
                })),
                V4L2_FRMSIZE_TYPE_STEPWISE | V4L2_FRMSIZE_TYPE_CONTINUOUS => {
                    Ok(FrameSizeEnum::Stepwise(Stepwise {
                        min_width: desc.u.stepwise.min_width,
                        max_width: desc.u.stepwise.max_width,
                        step_width: desc.u.stepwise.step_width,
                        min_height: desc.u.stepwise.min_height,
                        max_height: desc.u.stepwise.max_height,
                        step_height: desc.u.stepwise.step_height,
                    }))
                }
                typ => Err(format!("Unknown frame size type: {}", typ)),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Discrete {
    /// Width of the frame (in pixels).
    pub width: u32,
    /// Height of the frame (in pixels).
    pub height: u32,
}

impl Discrete {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Discrete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stepwise {
    /// Minimum frame width (in pixels).
    pub min_width: u32,
    /// Maximum frame width (in pixels).
    pub max_width: u32,
    /// Frame width step size (in pixels).
    pub step_width: u32,
    /// Minimum frame height (in pixels).
    pub min_height: u32,
    /// Maximum frame height (in pixels).
    pub max_height: u32,
    /// Frame height step size (in pixels).
    pub step_height: u32,
}

impl fmt::Display for Stepwise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} - {}x{} with step {}/{}",
            self.min_width,
            self.min_height,
            self.max_width,
            self.max_height,
            self.step_width,
            self.step_height,
        )?;
        Ok(())
    }
}

impl TryFrom<v4l2_frmsizeenum> for FrameSize {
    type Error = String;

    fn try_from(desc: v4l2_frmsizeenum) -> Result<Self, Self::Error> {
        Ok(FrameSize {
            index: desc.index,
            fourcc: FourCC::from(desc.pixel_format),
            size: FrameSizeEnum::try_from(desc)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stepwise(min: (u32, u32), max: (u32, u32), step: (u32, u32)) -> FrameSizeEnum {
        FrameSizeEnum::Stepwise(Stepwise {
            min_width: min.0,
            max_width: max.0,
            step_width: step.0,
            min_height: min.1,
            max_height: max.1,
            step_height: step.1,
        })
    }

    #[test]
    fn discrete_is_passed_through() {
        let size = FrameSizeEnum::Discrete(Discrete {
            width: 640,
            height: 480,
        });
        assert_eq!(
            size.to_discrete(),
            vec![Discrete {
                width: 640,
                height: 480
            }]
        );
    }

    #[test]
    fn small_ranges_follow_the_step_grid() {
        let sizes = stepwise((320, 240), (640, 480), (160, 120)).to_discrete();
        assert_eq!(sizes.len(), 9);
        assert!(sizes.contains(&Discrete {
            width: 480,
            height: 360
        }));
        assert_eq!(sizes.last().map(Discrete::area), Some(640 * 480));
    }

    #[test]
    fn continuous_ranges_are_bounded() {
        let sizes = stepwise((16, 16), (4096, 2160), (1, 1)).to_discrete();
        assert!(sizes.len() <= MAX_CANDIDATES);
        assert!(sizes.contains(&Discrete {
            width: 4096,
            height: 2160
        }));
        assert!(sizes.contains(&Discrete {
            width: 16,
            height: 16
        }));
    }

    #[test]
    fn zero_step_does_not_loop() {
        let sizes = stepwise((640, 480), (1280, 720), (0, 0)).to_discrete();
        assert!(!sizes.is_empty());
        assert!(sizes.len() <= MAX_CANDIDATES);
    }
}
