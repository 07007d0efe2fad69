//! Error types for the validator monitor.
//!
//! Only [`ConfigError`] and [`AccountsError`] are fatal. Transport failures
//! end a single data-source call, report failures end a single cycle.

use std::path::PathBuf;

use thiserror::Error;

/// Errors loading or validating the YAML configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither the config file nor its example fallback exists
    #[error("configuration file is missing: {}", path.display())]
    Missing { path: PathBuf },

    /// The file exists but cannot be read
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid YAML for [`crate::config::Settings`]
    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A value is out of range
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors loading the accounts CSV.
#[derive(Debug, Error)]
pub enum AccountsError {
    #[error("failed to read accounts file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("accounts file {} contains no accounts", path.display())]
    Empty { path: PathBuf },

    #[error("duplicate account id {0}")]
    DuplicateId(u64),

    #[error("invalid account #{id}: {reason}")]
    InvalidRow { id: u64, reason: String },
}

/// A data-source call failed: network error, timeout, bad status or a
/// payload that cannot be interpreted.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection, timeout or body decoding failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("unexpected status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// JSON-RPC call returned no result
    #[error("{method} returned no result: {message}")]
    Rpc { method: String, message: String },

    /// Response shape not understood
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Errors writing the per-cycle report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report I/O failed for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write report row: {0}")]
    Csv(#[from] csv::Error),
}
