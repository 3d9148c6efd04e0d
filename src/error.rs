//src/error.rs

use thiserror::Error;

/// A rejected combination of thresholds, windows and ordering.
/// Each rule gets its own process exit status.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("only one of --erange, --brange and --irange may be set")]
    ConflictingWindows,

    #[error("--erange requires ordering by evalue (--or e)")]
    EvalueWindowOrder,

    #[error("--brange requires ordering by bitscore (--or b)")]
    BitscoreWindowOrder,

    #[error("--irange requires ordering by percent identity (--or i)")]
    IdentityWindowOrder,

    #[error("tolerance window must not be negative (got {0})")]
    NegativeWindow(f64),

    #[error("threshold {0} is not a number")]
    NanThreshold(&'static str),
}

impl ConfigError {
    pub fn exit_code(&self) -> i32 {
        match self {
            ConfigError::ConflictingWindows => 3,
            ConfigError::EvalueWindowOrder => 4,
            ConfigError::BitscoreWindowOrder => 5,
            ConfigError::IdentityWindowOrder => 6,
            ConfigError::NegativeWindow(_) => 7,
            ConfigError::NanThreshold(_) => 8,
        }
    }
}

#[derive(Debug, Error)]
pub enum BlastQcError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Malformed or incomplete BLAST results. `location` names the XML tag or
    /// the tabular line/column.
    #[error("could not parse BLAST results ({location}): {message}")]
    Parse { location: String, message: String },

    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BlastQcError {
    pub(crate) fn parse(location: impl Into<String>, message: impl Into<String>) -> Self {
        BlastQcError::Parse {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            BlastQcError::Config(e) => e.exit_code(),
            BlastQcError::Parse { .. } | BlastQcError::Xml(_) => 65,
            BlastQcError::Io(_) => 74,
        }
    }
}

pub type Result<T> = std::result::Result<T, BlastQcError>;
