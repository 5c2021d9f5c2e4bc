//! Locator syntax: `[v4l2://]<device>[:<key>=<value>...]`
//!
//! Options are separated by `:` or `,`. Separators inside braces belong to the value, so
//! `set-ctrls={brightness=10,contrast=20}` is a single option. A segment without `=` that
//! follows an option and starts with a digit continues its value, which keeps
//! `aspect-ratio=16:9` intact.
//!
//! Keys that are not settings are treated as control overrides.
//!
//! # Example
//!
//! ```
//! use v4l2_capture::locator;
//! let config = locator::parse("v4l2:///dev/video1:width=640:height=480:brightness=10").unwrap();
//! assert_eq!(config.width, 640);
//! assert_eq!(config.control("brightness"), Some("10"));
//! ```

use std::path::PathBuf;
use std::str::FromStr;

use crate::config::Config;
use crate::controls::normalize_name;
use crate::error::{Error, Result};
use crate::input::TunerAudioMode;
use crate::memory::IoMethod;
use crate::standard::parse_c_integer;

/// Scheme prefix accepted in front of the device path
pub const SCHEME: &str = "v4l2://";

/// Splits on `:` and `,` outside of braces
fn split(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ':' | ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

fn invalid(key: &str, value: &str) -> Error {
    Error::Locator(format!("invalid value {:?} for {}", value, key))
}

fn number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| invalid(key, value))
}

fn integer(key: &str, value: &str) -> Result<i64> {
    let value_ = value.trim();
    let (negative, digits) = match value_.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, value_),
    };
    let magnitude = parse_c_integer(digits)
        .and_then(|n| i64::try_from(n).ok())
        .ok_or_else(|| invalid(key, value))?;
    Ok(if negative { -magnitude } else { magnitude })
}

/// Parses a boolean option, a bare key counts as set
pub fn boolean(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parses `n:m` (or `n/m`) into a non-degenerate ratio
pub fn aspect_ratio(value: &str) -> Option<(u32, u32)> {
    let (n, m) = value.trim().split_once([':', '/'])?;
    let n: u32 = n.trim().parse().ok()?;
    let m: u32 = m.trim().parse().ok()?;
    if n == 0 || m == 0 {
        None
    } else {
        Some((n, m))
    }
}

/// Negative values mean "unset"
fn optional_index(key: &str, value: &str) -> Result<Option<u32>> {
    let index = integer(key, value)?;
    if index < 0 {
        return Ok(None);
    }
    u32::try_from(index).map(Some).map_err(|_| invalid(key, value))
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let key = key.trim();
    match key.to_ascii_lowercase().as_str() {
        "dev" => config.device = PathBuf::from(value.trim()),
        "standard" => config.standard = Some(value.trim().to_string()).filter(|s| !s.is_empty()),
        "chroma" => config.chroma = Some(value.trim().to_string()).filter(|s| !s.is_empty()),
        "input" => {
            config.input = u32::try_from(integer(key, value)?).map_err(|_| invalid(key, value))?
        }
        "audio-input" => config.audio_input = optional_index(key, value)?,
        "width" => config.width = number(key, value)?,
        "height" => config.height = number(key, value)?,
        "fps" => {
            let fps: f64 = number(key, value)?;
            if !fps.is_finite() || fps < 0.0 {
                return Err(invalid(key, value));
            }
            config.fps = fps;
        }
        "aspect-ratio" => {
            config.aspect_ratio = aspect_ratio(value).ok_or_else(|| invalid(key, value))?
        }
        "tuner" => {
            config.tuner = u32::try_from(integer(key, value)?).map_err(|_| invalid(key, value))?
        }
        "tuner-frequency" => {
            let freq = integer(key, value)?;
            config.tuner_frequency = (freq >= 0).then_some(freq);
        }
        "tuner-audio-mode" => {
            let mode = integer(key, value)?;
            config.tuner_audio_mode = if mode < 0 {
                None
            } else {
                Some(TunerAudioMode::try_from(mode).map_err(|_| invalid(key, value))?)
            };
        }
        "set-ctrls" => config.set_ctrls = Some(value.trim().to_string()).filter(|s| !s.is_empty()),
        "use-libv4l2" => config.use_libv4l2 = boolean(value).ok_or_else(|| invalid(key, value))?,
        "controls-reset" => {
            config.controls_reset = boolean(value).ok_or_else(|| invalid(key, value))?
        }
        "io" => config.io = Some(value.parse().map_err(|_| invalid(key, value))?),
        _ => {
            let name = normalize_name(key);
            if name.is_empty() {
                return Err(Error::Locator(format!("empty option name in {:?}", key)));
            }
            config.controls.insert(name, value.trim().to_string());
        }
    }
    Ok(())
}

/// Parses a locator into a configuration
///
/// An empty device part keeps the default node. Unknown option values are rejected with
/// [`Error::Locator`].
pub fn parse(locator: &str) -> Result<Config> {
    let locator = locator.trim();
    let rest = locator.strip_prefix(SCHEME).unwrap_or(locator);

    let mut config = Config::default();
    let mut parts = split(rest).into_iter();

    if let Some(device) = parts.next() {
        if device.contains('=') {
            return Err(Error::Locator(format!(
                "expected a device path, found option {:?}",
                device
            )));
        }
        if !device.trim().is_empty() {
            config.device = PathBuf::from(device.trim());
        }
    }

    // Glue value continuations such as the "9" in "aspect-ratio=16:9" back on.
    let mut options: Vec<(String, String)> = Vec::new();
    for part in parts {
        if part.trim().is_empty() {
            continue;
        }
        match part.split_once('=') {
            Some((key, value)) => options.push((key.to_string(), value.to_string())),
            None => match options.last_mut() {
                Some((_, value))
                    if !value.is_empty() && part.starts_with(|c: char| c.is_ascii_digit()) =>
                {
                    value.push(':');
                    value.push_str(part);
                }
                _ => options.push((part.to_string(), String::new())),
            },
        }
    }

    for (key, value) in &options {
        apply(&mut config, key, value)?;
    }

    Ok(config)
}
