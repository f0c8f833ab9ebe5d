//! Definition of errors.

use core::fmt;
use std::error::Error;
use std::io;

use bincode::error::{DecodeError, EncodeError};

/// Error used when the argument is invalid.
#[derive(Debug)]
pub struct InvalidArgumentError {
    msg: &'static str,
}

impl fmt::Display for InvalidArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidArgumentError: {}", self.msg)
    }
}

impl Error for InvalidArgumentError {}

/// Error used when a configuration value names an unknown solver, loss or parameter.
#[derive(Debug)]
pub struct UnknownConfigError {
    kind: &'static str,
    name: String,
}

impl fmt::Display for UnknownConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "UnknownConfigError: unknown {}: {}", self.kind, self.name)
    }
}

impl Error for UnknownConfigError {}

/// Error used when a persisted model is malformed or cannot be written.
#[derive(Debug)]
pub struct ModelError {
    msg: String,
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ModelError: {}", self.msg)
    }
}

impl Error for ModelError {}

/// Error used when a collection worker fails, panics or times out.
#[derive(Debug)]
pub struct WorkerError {
    msg: String,
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "WorkerError: {}", self.msg)
    }
}

impl Error for WorkerError {}

/// Error used when a batch solver fails.
#[derive(Debug)]
pub struct SolverError {
    msg: String,
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SolverError: {}", self.msg)
    }
}

impl Error for SolverError {}

/// The error type for Rudep.
#[derive(Debug)]
pub enum RudepError {
    /// The argument is invalid.
    InvalidArgument(InvalidArgumentError),

    /// A configuration name is unknown.
    UnknownConfig(UnknownConfigError),

    /// The model data is malformed.
    Model(ModelError),

    /// A worker failed.
    Worker(WorkerError),

    /// A solver failed.
    Solver(SolverError),

    /// An I/O error.
    Io(io::Error),
}

impl RudepError {
    /// Creates a new [`InvalidArgumentError`].
    pub const fn invalid_argument(msg: &'static str) -> Self {
        Self::InvalidArgument(InvalidArgumentError { msg })
    }

    /// Creates a new [`UnknownConfigError`].
    pub fn unknown_config<S>(kind: &'static str, name: S) -> Self
    where
        S: Into<String>,
    {
        Self::UnknownConfig(UnknownConfigError {
            kind,
            name: name.into(),
        })
    }

    /// Creates a new [`ModelError`].
    pub fn model<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::Model(ModelError { msg: msg.into() })
    }

    /// Creates a new [`WorkerError`].
    pub fn worker<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::Worker(WorkerError { msg: msg.into() })
    }

    /// Creates a new [`SolverError`].
    pub fn solver<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::Solver(SolverError { msg: msg.into() })
    }
}

impl fmt::Display for RudepError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidArgument(e) => e.fmt(f),
            Self::UnknownConfig(e) => e.fmt(f),
            Self::Model(e) => e.fmt(f),
            Self::Worker(e) => e.fmt(f),
            Self::Solver(e) => e.fmt(f),
            Self::Io(e) => write!(f, "IoError: {e}"),
        }
    }
}

impl Error for RudepError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for RudepError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<DecodeError> for RudepError {
    fn from(e: DecodeError) -> Self {
        Self::model(e.to_string())
    }
}

impl From<EncodeError> for RudepError {
    fn from(e: EncodeError) -> Self {
        Self::model(e.to_string())
    }
}

/// A specialized Result type.
pub type Result<T, E = RudepError> = core::result::Result<T, E>;
