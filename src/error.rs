use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors reported by capture sessions
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot open device {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot get video capabilities: {0}")]
    QueryCaps(#[source] io::Error),

    #[error("no supported I/O method")]
    NoIoMethod,

    /// A mandatory negotiation or allocation step failed
    #[error("cannot {what}: {source}")]
    Setup {
        what: String,
        #[source]
        source: io::Error,
    },

    #[error("insufficient buffers: driver granted {0}, need at least 2")]
    InsufficientBuffers(u32),

    #[error("could not select any of the supported pixel formats")]
    NoFormat,

    #[error("invalid locator: {0}")]
    Locator(String),

    #[error("unknown control {0}")]
    UnknownControl(String),

    #[error("invalid value {value} for control {name}")]
    InvalidControlValue { name: String, value: String },

    #[error("control {0} cannot be changed while capturing")]
    ControlNotLive(String),

    #[error("cannot access control {name}: {source}")]
    Control {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("capture stream failed: {0}")]
    Stream(#[source] io::Error),

    #[error("session is closed")]
    Closed,

    #[error("cannot load libv4l2: {0}")]
    Library(#[from] libloading::Error),
}

impl Error {
    pub(crate) fn setup(what: impl Into<String>, source: io::Error) -> Self {
        Error::Setup {
            what: what.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
