//! Errors that end a simulation run.
//!
//! Per-line trace problems are not in here: they are
//! [`TraceError`](crate::input::TraceError)s that the runner logs and skips.
//! Everything in [`SimError`] is fatal and maps to exit code 1. A trace that
//! fails mid-read is reported as [`SimError::Io`] against the trace path.

use std::io;
use std::path::PathBuf;

use ghost_cache::{ConfigError, ParseCurveError};
use thiserror::Error;

use crate::tenant::TenantError;

/// A fatal simulation error
#[derive(Debug, Error)]
pub enum SimError {
    /// A file or directory could not be opened, created or written.
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The output path exists but is not a directory.
    #[error("output directory {} exists but is not a directory", .path.display())]
    NotADirectory { path: PathBuf },

    /// A tenant cache rejected an operation.
    #[error("tenant {tenant}: {source}")]
    Tenant {
        tenant: u64,
        #[source]
        source: TenantError,
    },

    /// The capacity sweep or sampling configuration was invalid.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A report could not be decoded.
    #[error("{}: {source}", .path.display())]
    ReportFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A curve line inside a report could not be parsed.
    #[error("{}: checkpoint {checkpoint}: {source}", .path.display())]
    Curve {
        path: PathBuf,
        checkpoint: u64,
        #[source]
        source: ParseCurveError,
    },

    /// The synthetic trace parameters produced no usable key distribution.
    #[error("invalid key distribution: {0}")]
    Distribution(#[from] rand::distributions::WeightedError),
}

impl SimError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        SimError::Io {
            path: path.into(),
            source,
        }
    }
}
