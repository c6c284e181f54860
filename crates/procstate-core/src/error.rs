//! Error types for registry setup, data restore, the binary codec,
//! configuration and the pump thread.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors raised while building or querying a [`StateRegistry`](crate::StateRegistry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A parameter or data item with this identifier is already registered.
    DuplicateIdentifier(String),
    /// No parameter or data item is registered under this identifier.
    UnknownIdentifier(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateIdentifier(id) => write!(f, "duplicate identifier: {id:?}"),
            Self::UnknownIdentifier(id) => write!(f, "unknown identifier: {id:?}"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Result type for registry operations.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Reasons a [`DataItem`](crate::DataItem) refuses a serialized node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    /// The node was produced by a different kind of data item.
    KindMismatch {
        /// Tag this item serializes under.
        expected: &'static str,
        /// Tag found on the node.
        found: String,
    },
    /// A required attribute is absent from the node.
    MissingAttribute(&'static str),
    /// The item's side effect (e.g. loading a referenced resource) failed.
    ActionFailed(String),
    /// The path can't be stored as text without losing bytes.
    NonUtf8Path(PathBuf),
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KindMismatch { expected, found } => {
                write!(f, "expected a {expected:?} node, found {found:?}")
            }
            Self::MissingAttribute(name) => write!(f, "missing attribute {name:?}"),
            Self::ActionFailed(msg) => write!(f, "change action failed: {msg}"),
            Self::NonUtf8Path(path) => write!(f, "path is not valid UTF-8: {}", path.display()),
        }
    }
}

impl std::error::Error for DataError {}

/// Errors encoding or decoding a binary state envelope.
#[derive(Debug)]
pub enum CodecError {
    /// Fewer bytes than the fixed header.
    TooShort(usize),
    /// The magic bytes don't match.
    BadMagic([u8; 4]),
    /// The envelope was written by an unknown format version.
    UnsupportedVersion(u32),
    /// The header announces more payload than is present.
    Truncated {
        /// Payload length from the header.
        expected: usize,
        /// Bytes actually available after the header.
        available: usize,
    },
    /// The payload is not a valid state tree.
    Json(serde_json::Error),
    /// The encoded payload doesn't fit the 32-bit length field.
    PayloadTooLarge(usize),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort(len) => write!(f, "state blob too short ({len} bytes)"),
            Self::BadMagic(magic) => write!(f, "bad state magic {magic:?}"),
            Self::UnsupportedVersion(v) => write!(f, "unsupported state version {v}"),
            Self::Truncated {
                expected,
                available,
            } => write!(
                f,
                "state payload truncated: expected {expected} bytes, got {available}"
            ),
            Self::Json(e) => write!(f, "invalid state payload: {e}"),
            Self::PayloadTooLarge(len) => write!(f, "state payload too large ({len} bytes)"),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

/// Errors loading a [`PumpConfig`](crate::PumpConfig).
#[derive(Debug)]
pub enum ConfigError {
    /// The TOML source could not be parsed.
    Parse(toml::de::Error),
    /// The values parsed but are inconsistent.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "config parse error: {e}"),
            Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(e) => Some(e),
            Self::Invalid(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Parse(e)
    }
}

/// Errors starting a [`PumpThread`](crate::PumpThread).
#[derive(Debug)]
pub enum PumpError {
    /// The pump timing is inconsistent.
    Config(ConfigError),
    /// Another pump thread is already serving this registry.
    AlreadyRunning,
    /// The OS refused to create the thread.
    Spawn(io::Error),
}

impl fmt::Display for PumpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "{e}"),
            Self::AlreadyRunning => write!(f, "a pump thread is already running for this registry"),
            Self::Spawn(e) => write!(f, "failed to spawn pump thread: {e}"),
        }
    }
}

impl std::error::Error for PumpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::AlreadyRunning => None,
            Self::Spawn(e) => Some(e),
        }
    }
}

impl From<ConfigError> for PumpError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<io::Error> for PumpError {
    fn from(e: io::Error) -> Self {
        Self::Spawn(e)
    }
}
