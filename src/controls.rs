//! Runtime control table built from the controls a driver reports.
//!
//! Every enabled control becomes a [`Variable`] keyed by a normalized name. Values are applied
//! once when the session opens and can be changed afterwards, either directly through
//! [`ControlSet::set`] or from other threads through a [`ControlHandle`].

use std::fmt;

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use log::{debug, warn};

use crate::config::Config;
use crate::control::{self, Description, Flags, MenuItem, Type};
use crate::device::Driver;
use crate::error::{Error, Result};

/// Control changes that can be pending at once before [`ControlHandle::set`] blocks
pub const QUEUE_DEPTH: usize = 16;

/// Value that leaves a control untouched in overrides and `set-ctrls`
pub const NO_CHANGE: &str = "-1";

/// Menu indices queried per control
pub const MAX_MENU_ITEMS: i64 = 256;

/// Entry of an enumeration control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    /// Value written to the driver
    pub value: i64,
    pub label: String,
}

/// Typed shape of a control
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Kind {
    Integer {
        min: i64,
        max: i64,
        step: u64,
        default: i64,
    },
    Boolean {
        default: bool,
    },
    Enumeration {
        choices: Vec<Choice>,
        default: i64,
    },
    /// Write-only trigger, e.g. a "reset pan/tilt" button
    Action,
}

impl Kind {
    /// Value the driver reverts to on reset, `None` for actions
    pub fn default_value(&self) -> Option<i64> {
        match self {
            Kind::Integer { default, .. } => Some(*default),
            Kind::Boolean { default } => Some(*default as i64),
            Kind::Enumeration { default, .. } => Some(*default),
            Kind::Action => None,
        }
    }

    /// Whether `value` means anything for this kind
    ///
    /// Integers are never refused, the driver clamps them to its range.
    pub fn accepts(&self, value: i64) -> bool {
        match self {
            Kind::Integer { .. } => true,
            Kind::Boolean { .. } => value == 0 || value == 1,
            Kind::Enumeration { choices, .. } => choices.iter().any(|c| c.value == value),
            Kind::Action => true,
        }
    }

    /// Parses a textual value
    ///
    /// Integers take decimal or `0x` hex, booleans also take `true/false/on/off/yes/no` and
    /// enumerations also take a choice label. Labels win over indices, so the numeric labels of
    /// integer menus select their choice.
    pub fn parse(&self, s: &str) -> Option<i64> {
        let s = s.trim();
        match self {
            Kind::Integer { .. } | Kind::Action => parse_integer(s),
            Kind::Boolean { .. } => match s.to_ascii_lowercase().as_str() {
                "true" | "on" | "yes" => Some(1),
                "false" | "off" | "no" => Some(0),
                _ => parse_integer(s).map(|v| (v != 0) as i64),
            },
            Kind::Enumeration { choices, .. } => choices
                .iter()
                .find(|c| c.label.eq_ignore_ascii_case(s) || normalize_name(&c.label) == s)
                .map(|c| c.value)
                .or_else(|| parse_integer(s)),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Integer {
                min,
                max,
                step,
                default,
            } => write!(
                f,
                "integer [{}..{}] step {} default {}",
                min, max, step, default
            ),
            Kind::Boolean { default } => write!(f, "boolean default {}", default),
            Kind::Enumeration { choices, default } => {
                write!(f, "menu default {} {{", default)?;
                for (i, choice) in choices.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", choice.value, choice.label)?;
                }
                write!(f, "}}")
            }
            Kind::Action => write!(f, "action"),
        }
    }
}

/// Decimal or `0x` hexadecimal, with an optional sign
pub fn parse_integer(s: &str) -> Option<i64> {
    let s = s.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i64>().ok()?,
    };
    Some(if negative { -magnitude } else { magnitude })
}

/// Turns a driver control name into a variable name
///
/// Lower-cases the name, collapses every run of non-alphanumeric characters into one `_` and
/// trims underscores at both ends.
///
/// # Example
///
/// ```
/// use v4l2_capture::controls::normalize_name;
/// assert_eq!(normalize_name("White Balance Temperature, Auto"), "white_balance_temperature_auto");
/// ```
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending && !out.is_empty() {
                out.push('_');
            }
            pending = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending = true;
        }
    }
    out
}

/// Splits a `set-ctrls` string into `(name, value)` pairs
///
/// Surrounding braces are optional. Entries without `=` are dropped with a warning.
pub fn parse_assignments(s: &str) -> Vec<(String, String)> {
    let s = s.trim();
    let s = s.strip_prefix('{').unwrap_or(s);
    let s = s.strip_suffix('}').unwrap_or(s);

    s.split(',')
        .filter(|entry| !entry.trim().is_empty())
        .filter_map(|entry| match entry.split_once('=') {
            Some((name, value)) => Some((name.trim().to_string(), value.trim().to_string())),
            None => {
                warn!("ignoring control assignment without a value: {}", entry.trim());
                None
            }
        })
        .collect()
}

/// Runtime control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub id: u32,
    pub name: String,
    /// Driver type, decides how the value travels
    pub typ: Type,
    pub kind: Kind,
    /// Last value written or read back
    pub value: i64,
    /// Whether the control may change while capturing
    pub live: bool,
    pub read_only: bool,
}

impl Variable {
    /// Builds a variable from a control description, `None` for controls that are not exposed
    pub fn from_description<D: Driver + ?Sized>(driver: &D, desc: &Description) -> Option<Self> {
        let kind = match desc.typ {
            Type::Integer | Type::Integer64 | Type::Bitmask => Kind::Integer {
                min: desc.minimum,
                max: desc.maximum,
                step: desc.step,
                default: desc.default,
            },
            Type::Boolean => Kind::Boolean {
                default: desc.default != 0,
            },
            Type::Menu | Type::IntegerMenu => {
                let mut choices = Vec::new();
                let first = desc.minimum.max(0);
                let last = desc.maximum.max(0).min(first.saturating_add(MAX_MENU_ITEMS - 1));
                if last < desc.maximum {
                    warn!(
                        "control {} reports menu indices up to {}, querying {}",
                        desc.name, desc.maximum, MAX_MENU_ITEMS
                    );
                }
                for index in first..=last {
                    let Ok(index) = u32::try_from(index) else {
                        break;
                    };
                    // Drivers leave holes in menus, skip the indices they reject.
                    if let Ok(item) = driver.menu_item(desc, index) {
                        let label = match item {
                            MenuItem::Name(name) => name,
                            MenuItem::Value(value) => value.to_string(),
                        };
                        choices.push(Choice {
                            value: index as i64,
                            label,
                        });
                    }
                }
                Kind::Enumeration {
                    choices,
                    default: desc.default,
                }
            }
            Type::Button => Kind::Action,
            Type::CtrlClass => return None,
            _ => {
                debug!("skipping control {} of type {}", desc.name, desc.typ);
                return None;
            }
        };

        Some(Variable {
            id: desc.id,
            name: normalize_name(&desc.name),
            typ: desc.typ,
            value: kind.default_value().unwrap_or(0),
            kind,
            live: desc.class() != control::CLASS_MPEG,
            read_only: desc.flags.contains(Flags::READ_ONLY),
        })
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#010x}) = {} : {}", self.name, self.id, self.value, self.kind)?;
        if !self.live {
            write!(f, " [not live]")?;
        }
        if self.read_only {
            write!(f, " [read-only]")?;
        }
        Ok(())
    }
}

/// Control change requested through a [`ControlHandle`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlChange {
    pub name: String,
    pub value: i64,
}

/// Cloneable, thread-safe way to request control changes
///
/// Requests are queued and applied by the capture loop before it waits for the next frame.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: Sender<ControlChange>,
}

impl ControlHandle {
    /// Queues a change, blocking while the queue is full
    ///
    /// Fails with [`Error::Closed`] once the session is gone.
    pub fn set(&self, name: &str, value: i64) -> Result<()> {
        self.tx
            .send(ControlChange {
                name: normalize_name(name),
                value,
            })
            .map_err(|_| Error::Closed)
    }
}

/// Controls of one device
#[derive(Debug)]
pub struct ControlSet {
    vars: Vec<Variable>,
    tx: Sender<ControlChange>,
    rx: Receiver<ControlChange>,
}

impl Default for ControlSet {
    fn default() -> Self {
        ControlSet::new(Vec::new())
    }
}

impl ControlSet {
    fn new(vars: Vec<Variable>) -> Self {
        let (tx, rx) = bounded(QUEUE_DEPTH);
        ControlSet { vars, tx, rx }
    }

    /// Enumerates the controls of a device
    ///
    /// Disabled controls, class headers and controls of unsupported types are left out. When
    /// two controls normalize to the same name, the first one wins.
    pub fn discover<D: Driver + ?Sized>(driver: &D) -> Self {
        let mut vars: Vec<Variable> = Vec::new();
        let mut id = 0;

        while let Ok(desc) = driver.next_control(id) {
            if desc.id <= id && id != 0 {
                warn!("driver repeats control {:#010x}, stopping enumeration", desc.id);
                break;
            }
            id = desc.id;

            if desc.flags.contains(Flags::DISABLED) {
                debug!("skipping disabled control {}", desc.name);
                continue;
            }
            let Some(var) = Variable::from_description(driver, &desc) else {
                continue;
            };
            if vars.iter().any(|v| v.name == var.name) {
                debug!("skipping duplicate control name {}", var.name);
                continue;
            }
            debug!("control {}", var);
            vars.push(var);
        }

        ControlSet::new(vars)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Variable> {
        self.vars.iter()
    }

    /// Looks a control up by name, raw driver names are accepted too
    pub fn get(&self, name: &str) -> Option<&Variable> {
        let name = normalize_name(name);
        self.vars.iter().find(|v| v.name == name)
    }

    fn position(&self, name: &str) -> Result<usize> {
        let normalized = normalize_name(name);
        self.vars
            .iter()
            .position(|v| v.name == normalized)
            .ok_or_else(|| Error::UnknownControl(name.to_string()))
    }

    /// Returns a handle other threads can queue changes through
    pub fn handle(&self) -> ControlHandle {
        ControlHandle {
            tx: self.tx.clone(),
        }
    }

    /// Writes a value and logs instead of failing
    ///
    /// The stored value is read back, drivers clamp out of range values.
    fn write<D: Driver + ?Sized>(driver: &D, var: &mut Variable, value: i64) -> bool {
        match driver.set_control(var.id, var.typ, value) {
            Ok(()) => {
                var.value = match var.kind {
                    Kind::Action => value,
                    _ => driver.control(var.id, var.typ).unwrap_or(value),
                };
                debug!("control {} set to {}", var.name, var.value);
                true
            }
            Err(e) => {
                warn!("cannot set control {} to {}: {}", var.name, value, e);
                false
            }
        }
    }

    /// Applies the configured values when the session opens
    ///
    /// With `controls-reset` every control returns to its default. Otherwise a configured
    /// override wins, and remaining controls get their current value written back. Failures are
    /// logged and skipped.
    pub fn apply_config<D: Driver + ?Sized>(&mut self, driver: &D, config: &Config) {
        for var in self.vars.iter_mut() {
            let Some(default) = var.kind.default_value() else {
                continue;
            };

            if var.read_only {
                if let Ok(value) = driver.control(var.id, var.typ) {
                    var.value = value;
                }
                continue;
            }

            if config.controls_reset {
                Self::write(driver, var, default);
                continue;
            }

            let value = match config.control(&var.name) {
                Some(raw) if raw.trim() != NO_CHANGE => match var.kind.parse(raw) {
                    Some(value) => Some(value),
                    None => {
                        warn!("invalid value {:?} for control {}", raw, var.name);
                        None
                    }
                },
                _ => None,
            };

            match value {
                Some(value) => {
                    Self::write(driver, var, value);
                }
                None => match driver.control(var.id, var.typ) {
                    Ok(current) => {
                        Self::write(driver, var, current);
                    }
                    Err(e) => debug!("cannot get control {}: {}", var.name, e),
                },
            }
        }

        for (name, value) in &config.controls {
            if self.get(name).is_none() && value.trim() != NO_CHANGE {
                debug!("device has no control {}", name);
            }
        }

        if let Some(assignments) = &config.set_ctrls {
            self.apply_assignments(driver, assignments);
        }
    }

    /// Applies a `set-ctrls` string such as `{brightness=10,contrast=-1}`
    ///
    /// Unknown names and unparsable values are skipped with a warning, `-1` leaves a control
    /// unchanged. Returns the number of controls written.
    pub fn apply_assignments<D: Driver + ?Sized>(&mut self, driver: &D, assignments: &str) -> usize {
        let mut written = 0;
        for (name, raw) in parse_assignments(assignments) {
            let Ok(pos) = self.position(&name) else {
                warn!("unknown control {}", name);
                continue;
            };
            if raw == NO_CHANGE {
                debug!("leaving control {} unchanged", name);
                continue;
            }

            let var = &mut self.vars[pos];
            match var.kind.parse(&raw) {
                Some(value) if var.kind.accepts(value) => {
                    if Self::write(driver, var, value) {
                        written += 1;
                    }
                }
                _ => warn!("invalid value {:?} for control {}", raw, name),
            }
        }
        written
    }

    /// Changes a control while capturing
    ///
    /// Booleans and enumerations are validated, integers go to the driver as they are. The value
    /// is then read back since drivers clamp and round it. The stored and returned value is the
    /// one read back.
    pub fn set<D: Driver + ?Sized>(&mut self, driver: &D, name: &str, value: i64) -> Result<i64> {
        let pos = self.position(name)?;
        let var = &mut self.vars[pos];

        if !var.live {
            return Err(Error::ControlNotLive(var.name.clone()));
        }
        if !var.kind.accepts(value) {
            return Err(Error::InvalidControlValue {
                name: var.name.clone(),
                value: value.to_string(),
            });
        }

        driver
            .set_control(var.id, var.typ, value)
            .map_err(|source| Error::Control {
                name: var.name.clone(),
                source,
            })?;

        if var.kind == Kind::Action {
            return Ok(value);
        }

        var.value = driver.control(var.id, var.typ).map_err(|source| Error::Control {
            name: var.name.clone(),
            source,
        })?;
        debug!("control {} is now {}", var.name, var.value);
        Ok(var.value)
    }

    /// Applies the changes queued through handles, returns how many succeeded
    pub fn drain<D: Driver + ?Sized>(&mut self, driver: &D) -> usize {
        let mut applied = 0;
        loop {
            match self.rx.try_recv() {
                Ok(change) => match self.set(driver, &change.name, change.value) {
                    Ok(_) => applied += 1,
                    Err(e) => warn!("{}", e),
                },
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        applied
    }
}

impl<'a> IntoIterator for &'a ControlSet {
    type Item = &'a Variable;
    type IntoIter = std::slice::Iter<'a, Variable>;

    fn into_iter(self) -> Self::IntoIter {
        self.vars.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        assert_eq!(normalize_name("Brightness"), "brightness");
        assert_eq!(normalize_name("  Gain (dB) "), "gain_db");
        assert_eq!(
            normalize_name("Exposure, Auto Priority"),
            "exposure_auto_priority"
        );
        assert_eq!(normalize_name("audio-volume"), "audio_volume");
        assert_eq!(normalize_name("--"), "");
    }

    #[test]
    fn assignments() {
        assert_eq!(
            parse_assignments("{brightness=10,contrast=-1}"),
            vec![
                ("brightness".to_string(), "10".to_string()),
                ("contrast".to_string(), "-1".to_string())
            ]
        );
        assert_eq!(
            parse_assignments("hue = 0x10 , ,junk"),
            vec![("hue".to_string(), "0x10".to_string())]
        );
        assert!(parse_assignments("{}").is_empty());
    }

    #[test]
    fn integers() {
        assert_eq!(parse_integer("42"), Some(42));
        assert_eq!(parse_integer("-7"), Some(-7));
        assert_eq!(parse_integer("0x1F"), Some(31));
        assert_eq!(parse_integer("+3"), Some(3));
        assert_eq!(parse_integer("ten"), None);
    }

    #[test]
    fn values_by_kind() {
        let boolean = Kind::Boolean { default: false };
        assert_eq!(boolean.parse("on"), Some(1));
        assert_eq!(boolean.parse("No"), Some(0));
        assert_eq!(boolean.parse("5"), Some(1));
        assert_eq!(boolean.parse("maybe"), None);

        let menu = Kind::Enumeration {
            choices: vec![
                Choice {
                    value: 0,
                    label: "Disabled".to_string(),
                },
                Choice {
                    value: 1,
                    label: "50 Hz".to_string(),
                },
            ],
            default: 1,
        };
        assert_eq!(menu.parse("50 hz"), Some(1));
        assert_eq!(menu.parse("50_hz"), Some(1));
        assert_eq!(menu.parse("0"), Some(0));
        assert!(!menu.accepts(2));

        let bitrates = Kind::Enumeration {
            choices: vec![
                Choice {
                    value: 0,
                    label: "100".to_string(),
                },
                Choice {
                    value: 1,
                    label: "200".to_string(),
                },
            ],
            default: 0,
        };
        assert_eq!(bitrates.parse("200"), Some(1));
        assert_eq!(bitrates.parse("1"), Some(1));

        let int = Kind::Integer {
            min: -10,
            max: 10,
            step: 1,
            default: 0,
        };
        assert!(int.accepts(-10));
        assert!(int.accepts(11));
        assert!(!boolean.accepts(2));
        assert_eq!(int.default_value(), Some(0));
        assert_eq!(Kind::Action.default_value(), None);
    }
}
