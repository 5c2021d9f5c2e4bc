//! Settles the device configuration before streaming.
//!
//! Input, standard, audio input and tuner are applied first, then the controls, cropping and
//! finally the pixel format, frame size and frame rate. The order matches what drivers expect:
//! the available formats can depend on the selected input and standard.

use log::{debug, info, warn};

use crate::config::Config;
use crate::controls::ControlSet;
use crate::device::Driver;
use crate::error::{Error, Result};
use crate::format::{chroma, FieldOrder, Format, FourCC};
use crate::fraction::Fraction;
use crate::frame::{FieldFlags, StreamFormat};
use crate::framesize::Discrete;
use crate::input::Frequency;
use crate::probe::Probe;
use crate::standard::Standard;

/// Base of the rational frame rate handed to consumers
pub const FRAME_RATE_BASE: u64 = 1_000_000;

/// Outcome of a successful negotiation
#[derive(Debug)]
pub struct Negotiated {
    /// Final driver format, with stride and image size sanitized
    pub format: Format,
    pub stream: StreamFormat,
    pub field_flags: FieldFlags,
    /// Standard in use, when one was configured
    pub standard: Option<Standard>,
    /// Time per frame the driver settled on, when a frame rate was requested
    pub frame_interval: Option<Fraction>,
    pub controls: ControlSet,
}

/// Runs every negotiation step against `driver`
///
/// Fails when a mandatory setting is rejected or when no pixel format can be agreed on.
pub fn negotiate<D: Driver + ?Sized>(
    driver: &D,
    probe: &Probe,
    config: &Config,
) -> Result<Negotiated> {
    if probe.has_video() {
        driver
            .set_input(config.input)
            .map_err(|e| Error::setup(format!("set input {}", config.input), e))?;
        debug!("input set to {}", config.input);
    }

    let standard = match &config.standard {
        Some(name) => Some(select_standard(driver, name)?),
        None => None,
    };
    let bottom_first = standard == Some(Standard::NTSC);

    if probe.has_audio() {
        if let Some(index) = config.audio_input {
            driver
                .set_audio_input(index)
                .map_err(|e| Error::setup(format!("set audio input {}", index), e))?;
            debug!("audio input set to {}", index);
        }
    }

    if probe.has_tuner() {
        tune(driver, probe, config)?;
    }

    let mut controls = ControlSet::discover(driver);
    controls.apply_config(driver, config);

    reset_crop(driver);

    let autodetect = config.autodetect_size();
    let (width, height) = if autodetect {
        let current = driver
            .format()
            .map_err(|e| Error::setup("get default width and height", e))?;
        debug!(
            "found default width and height of {}x{}",
            current.width, current.height
        );
        (current.width, current.height)
    } else {
        debug!("trying specified size {}x{}", config.width, config.height);
        (config.width as u32, config.height as u32)
    };

    let mut format = select_format(driver, probe, config.chroma.as_deref(), width, height)?;

    let mut fps = config.fps;
    if autodetect {
        let rates = size_rates(driver, format.fourcc);
        if fps <= 0.0 {
            fps = max_frame_rate(&rates);
            debug!("found maximum frame rate of {}", fps);
        }
        match best_size(&rates, fps) {
            Some(size) => {
                debug!(
                    "found optimal dimensions for frame rate {} of {}",
                    fps, size
                );
                let request = Format {
                    width: size.width,
                    height: size.height,
                    ..format
                };
                format = driver.set_format(&request).map_err(|e| {
                    Error::setup(format!("set size to optimal dimensions {}", size), e)
                })?;
            }
            None => warn!("could not find optimal width and height, keeping driver default"),
        }
    }

    let frame_interval = if fps > 0.0 {
        set_frame_rate(driver, fps)
    } else {
        None
    };

    if let Ok(current) = driver.format() {
        format = current;
    }
    format.sanitize();
    debug!("driver requires at most {} bytes per image", format.size);

    let field_flags = field_flags(format.field_order, bottom_first);
    let stream = stream_format(&format, config.aspect_ratio, fps);
    info!("negotiated {}", stream);

    Ok(Negotiated {
        format,
        stream,
        field_flags,
        standard,
        frame_interval,
        controls,
    })
}

fn select_standard<D: Driver + ?Sized>(driver: &D, name: &str) -> Result<Standard> {
    let requested = Standard::parse(name);
    driver
        .set_standard(requested)
        .and_then(|_| driver.standard())
        .map(|std| {
            debug!("standard set to {}", std);
            std
        })
        .map_err(|e| Error::setup(format!("set standard {}", requested), e))
}

fn tune<D: Driver + ?Sized>(driver: &D, probe: &Probe, config: &Config) -> Result<()> {
    if let Some(value) = config.tuner_frequency {
        let freq = Frequency::from_configured(config.tuner, probe.tuner_type(config.tuner), value);
        driver
            .set_frequency(&freq)
            .map_err(|e| Error::setup("set tuner frequency", e))?;
        debug!("tuner frequency set");
    }

    if let Some(mode) = config.tuner_audio_mode {
        driver
            .set_tuner_audio_mode(config.tuner, mode)
            .map_err(|e| Error::setup("set tuner audio mode", e))?;
        debug!("tuner audio mode set to {}", mode);
    }

    Ok(())
}

/// Resets cropping to the default rectangle; devices without cropping are fine
fn reset_crop<D: Driver + ?Sized>(driver: &D) {
    match driver.crop_cap() {
        Ok(cap) if !cap.defrect.is_empty() => {
            if let Err(e) = driver.set_crop(&cap.defrect) {
                debug!("cannot reset cropping: {}", e);
            }
        }
        Ok(_) => {}
        Err(e) => debug!("cropping not supported: {}", e),
    }
}

/// `VIDIOC_S_FMT` with a progressive field first, then letting the driver pick
fn try_format<D: Driver + ?Sized>(driver: &D, fmt: Format) -> Option<Format> {
    let progressive = Format {
        field_order: FieldOrder::Progressive,
        ..fmt
    };
    if let Ok(fmt) = driver.set_format(&progressive) {
        return Some(fmt);
    }

    let any = Format {
        field_order: FieldOrder::Any,
        ..fmt
    };
    driver.set_format(&any).ok()
}

/// Agrees on a pixel format, trying the requested chroma first and then the fallback list
pub fn select_format<D: Driver + ?Sized>(
    driver: &D,
    probe: &Probe,
    requested: Option<&str>,
    width: u32,
    height: u32,
) -> Result<Format> {
    if let Some(name) = requested {
        let accepted = chroma::by_name(name)
            .filter(|chroma| probe.offers(chroma.fourcc))
            .and_then(|chroma| try_format(driver, Format::new(width, height, chroma.fourcc)));

        match accepted {
            Some(fmt) => {
                info!("using requested chroma {} ({})", name, fmt.fourcc);
                return Ok(fmt);
            }
            None => warn!("requested chroma {} not supported, trying default", name),
        }
    }

    for fourcc in chroma::FALLBACK {
        if !probe.offers(fourcc) {
            continue;
        }
        if let Some(fmt) = try_format(driver, Format::new(width, height, fourcc)) {
            info!("using pixel format {}", fmt.fourcc);
            return Ok(fmt);
        }
        debug!("driver rejected pixel format {}", fourcc);
    }

    Err(Error::NoFormat)
}

/// Every candidate frame size of `fourcc` with the highest frame rate it allows
pub fn size_rates<D: Driver + ?Sized>(driver: &D, fourcc: FourCC) -> Vec<(Discrete, f64)> {
    let mut rates = Vec::new();
    for framesize in driver.enum_framesizes(fourcc) {
        for size in framesize.size.to_discrete() {
            let fps = driver
                .enum_frameintervals(fourcc, size.width, size.height)
                .iter()
                .map(|interval| interval.interval.max_fps())
                .fold(0.0, f64::max);
            debug!("frame size {} supports up to {} fps", size, fps);
            rates.push((size, fps));
        }
    }
    rates
}

/// Highest frame rate over all sizes, zero when the driver lists none
pub fn max_frame_rate(rates: &[(Discrete, f64)]) -> f64 {
    rates.iter().map(|(_, fps)| *fps).fold(0.0, f64::max)
}

/// Largest size that still reaches `fps`
pub fn best_size(rates: &[(Discrete, f64)], fps: f64) -> Option<Discrete> {
    rates
        .iter()
        .filter(|(_, max)| *max >= fps)
        .map(|(size, _)| *size)
        .filter(|size| size.width > 0 && size.height > 0)
        .fold(None, |best: Option<Discrete>, size| match best {
            Some(best) if best.area() >= size.area() => Some(best),
            _ => Some(size),
        })
}

/// Rational approximation of a floating point frame rate
pub fn frame_rate(fps: f64) -> Fraction {
    if fps <= 0.0 || !fps.is_finite() {
        return Fraction::new(0, 1);
    }
    Fraction::reduced((fps * FRAME_RATE_BASE as f64).round() as u64, FRAME_RATE_BASE)
}

fn set_frame_rate<D: Driver + ?Sized>(driver: &D, fps: f64) -> Option<Fraction> {
    let interval = frame_rate(fps).inverse();
    match driver.set_frame_interval(interval) {
        Ok(actual) => {
            debug!("time per frame set to {} (requested {})", actual, interval);
            Some(actual)
        }
        Err(e) => {
            debug!("cannot set frame rate {}: {}", fps, e);
            None
        }
    }
}

/// Sample aspect ratio that makes a `width`x`height` picture display at `n:m`
pub fn sample_aspect_ratio((n, m): (u32, u32), width: u32, height: u32) -> Fraction {
    Fraction::reduced(n as u64 * height as u64, m as u64 * width as u64)
}

/// Frame flags for a field order
///
/// Plain interlaced content carries no order of its own; it is bottom field first for NTSC.
pub fn field_flags(order: FieldOrder, bottom_first: bool) -> FieldFlags {
    match order {
        FieldOrder::Interlaced if bottom_first => FieldFlags::BOTTOM_FIELD_FIRST,
        FieldOrder::Interlaced => FieldFlags::TOP_FIELD_FIRST,
        FieldOrder::InterlacedTB => FieldFlags::TOP_FIELD_FIRST,
        FieldOrder::InterlacedBT => FieldFlags::BOTTOM_FIELD_FIRST,
        _ => FieldFlags::empty(),
    }
}

/// Parameters announced to consumers for a negotiated format
pub fn stream_format(format: &Format, aspect_ratio: (u32, u32), fps: f64) -> StreamFormat {
    let height = if format.field_order == FieldOrder::Alternate {
        format.height.saturating_mul(2)
    } else {
        format.height
    };
    let chroma = chroma::by_fourcc(format.fourcc);

    StreamFormat {
        chroma: chroma.map(|c| c.name).unwrap_or("UNKNOWN"),
        fourcc: format.fourcc,
        width: format.width,
        height,
        sar: sample_aspect_ratio(aspect_ratio, format.width, height),
        frame_rate: frame_rate(fps),
        masks: chroma.and_then(|c| c.masks),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(width: u32, height: u32) -> Discrete {
        Discrete { width, height }
    }

    #[test]
    fn sar_for_square_pixels() {
        assert_eq!(sample_aspect_ratio((4, 3), 640, 480), Fraction::new(1, 1));
        assert_eq!(sample_aspect_ratio((16, 9), 1920, 1080), Fraction::new(1, 1));
    }

    #[test]
    fn sar_for_anamorphic_pictures() {
        // PAL DV: 720x576 shown at 4:3
        assert_eq!(sample_aspect_ratio((4, 3), 720, 576), Fraction::new(16, 15));
        assert_eq!(sample_aspect_ratio((16, 9), 720, 576), Fraction::new(64, 45));
    }

    #[test]
    fn frame_rates() {
        assert_eq!(frame_rate(30.0), Fraction::new(30, 1));
        assert_eq!(frame_rate(7.5), Fraction::new(15, 2));
        assert_eq!(frame_rate(29.97), Fraction::new(2997, 100));
        assert_eq!(frame_rate(0.0), Fraction::new(0, 1));
        assert_eq!(frame_rate(25.0).inverse(), Fraction::new(1, 25));
    }

    #[test]
    fn largest_size_meeting_rate() {
        let rates = vec![
            (size(640, 480), 30.0),
            (size(1280, 720), 30.0),
            (size(1920, 1080), 5.0),
            (size(320, 240), 60.0),
        ];
        assert_eq!(max_frame_rate(&rates), 60.0);
        assert_eq!(best_size(&rates, 60.0), Some(size(320, 240)));
        assert_eq!(best_size(&rates, 30.0), Some(size(1280, 720)));
        assert_eq!(best_size(&rates, 1.0), Some(size(1920, 1080)));
        assert_eq!(best_size(&rates, 120.0), None);
        assert_eq!(best_size(&[], 0.0), None);
    }

    #[test]
    fn field_orders() {
        assert_eq!(
            field_flags(FieldOrder::Interlaced, true),
            FieldFlags::BOTTOM_FIELD_FIRST
        );
        assert_eq!(
            field_flags(FieldOrder::Interlaced, false),
            FieldFlags::TOP_FIELD_FIRST
        );
        assert_eq!(
            field_flags(FieldOrder::InterlacedBT, false),
            FieldFlags::BOTTOM_FIELD_FIRST
        );
        assert_eq!(
            field_flags(FieldOrder::InterlacedTB, true),
            FieldFlags::TOP_FIELD_FIRST
        );
        assert!(field_flags(FieldOrder::Progressive, true).is_empty());
        assert!(field_flags(FieldOrder::SequentialTB, false).is_empty());
    }

    #[test]
    fn alternate_fields_double_the_height() {
        let format = Format {
            field_order: FieldOrder::Alternate,
            ..Format::new(720, 288, FourCC::YUYV)
        };
        let stream = stream_format(&format, (4, 3), 25.0);
        assert_eq!(stream.height, 576);
        assert_eq!(stream.chroma, "YUY2");
        assert_eq!(stream.frame_rate, Fraction::new(25, 1));
        assert_eq!(stream.sar, Fraction::new(16, 15));
    }

    #[test]
    fn rgb_formats_carry_masks() {
        let stream = stream_format(&Format::new(320, 240, FourCC::BGR24), (4, 3), 0.0);
        assert_eq!(stream.chroma, "RV24");
        assert_eq!(stream.masks.map(|m| m.red), Some(0xff0000));
        assert_eq!(stream.frame_rate, Fraction::new(0, 1));
    }
}
