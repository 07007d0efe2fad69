//! Per-account evaluation results and the per-cycle CSV report.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, TimeZone};
use serde::Serialize;

use crate::accounts::Account;
use crate::config::TIMESTAMP_PLACEHOLDER;
use crate::error::ReportError;

/// Raw units per display unit (18 decimals).
pub const DENOMINATION: u128 = 1_000_000_000_000_000_000;

/// Timestamp format used in report file names.
const REPORT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Report columns, in file order.
pub const REPORT_COLUMNS: [&str; 16] = [
    "id",
    "address",
    "ip",
    "port",
    "note",
    "version",
    "status",
    "sync_latest",
    "balance",
    "rewards",
    "attestations_missed",
    "attestations_succeeded",
    "attestation_success",
    "block_missed",
    "block_mined",
    "block_proposed",
];

/// Round to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// An amount both as raw integer units and as a rounded display value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Balance {
    pub raw: u128,
    pub display: f64,
}

impl Balance {
    pub fn from_raw(raw: u128) -> Self {
        Self {
            raw,
            display: round2(raw as f64 / DENOMINATION as f64),
        }
    }
}

/// Health classification of one validator in one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Status {
    /// The node did not answer.
    ConnectionRefused,
    /// The node lags the explorer by more than the drift tolerance.
    SyncedOut,
    /// Healthy; carries the lower-cased dashboard status (e.g. `validating`).
    Active(String),
    /// Attestation success rate under the configured threshold.
    LowAttestation,
    /// Unknown to the dashboard and absent from the entry queue.
    NotRegistered,
    /// Waiting in the entry queue at the given rank.
    Queued(u64),
    /// The validator has left the set.
    Exited,
    /// Not enough data to classify.
    #[default]
    Unknown,
}

impl Status {
    /// Whether this status warrants an alert.
    pub fn is_alertable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionRefused | Self::SyncedOut | Self::LowAttestation | Self::Exited
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionRefused => f.write_str("connection_refused"),
            Self::SyncedOut => f.write_str("synced_out"),
            Self::Active(label) => f.write_str(label),
            Self::LowAttestation => f.write_str("low_attestation"),
            Self::NotRegistered => f.write_str("not_registered"),
            Self::Queued(rank) => write!(f, "queued:{rank}"),
            Self::Exited => f.write_str("exited"),
            Self::Unknown => Ok(()),
        }
    }
}

/// Result of evaluating one account in one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountReport {
    pub id: u64,
    pub address: String,
    pub ip: String,
    pub port: u16,
    pub note: Option<String>,
    pub version: String,
    pub status: Status,
    pub sync_latest: u64,
    /// Explorer height the evaluation compared against, if known.
    pub explorer_height: Option<u64>,
    pub balance: Balance,
    pub rewards: Balance,
    pub attestations_missed: u64,
    pub attestations_succeeded: u64,
    /// Percent, two decimals; `None` when there were no attestations.
    pub attestation_success: Option<f64>,
    pub blocks_missed: u64,
    pub blocks_mined: u64,
    pub blocks_proposed: u64,
}

impl AccountReport {
    /// Report with only the account identity filled in.
    pub fn blank(account: &Account) -> Self {
        Self {
            id: account.id,
            address: account.address.clone(),
            ip: account.ip.clone(),
            port: account.port,
            note: account.note.clone(),
            version: String::new(),
            status: Status::Unknown,
            sync_latest: 0,
            explorer_height: None,
            balance: Balance::default(),
            rewards: Balance::default(),
            attestations_missed: 0,
            attestations_succeeded: 0,
            attestation_success: None,
            blocks_missed: 0,
            blocks_mined: 0,
            blocks_proposed: 0,
        }
    }
}

#[derive(Serialize)]
struct ReportRow<'a> {
    id: u64,
    address: &'a str,
    ip: &'a str,
    port: u16,
    note: &'a str,
    version: &'a str,
    status: String,
    sync_latest: u64,
    balance: f64,
    rewards: f64,
    attestations_missed: u64,
    attestations_succeeded: u64,
    attestation_success: Option<f64>,
    block_missed: u64,
    block_mined: u64,
    block_proposed: u64,
}

impl<'a> From<&'a AccountReport> for ReportRow<'a> {
    fn from(report: &'a AccountReport) -> Self {
        Self {
            id: report.id,
            address: &report.address,
            ip: &report.ip,
            port: report.port,
            note: report.note.as_deref().unwrap_or_default(),
            version: &report.version,
            status: report.status.to_string(),
            sync_latest: report.sync_latest,
            balance: report.balance.display,
            rewards: report.rewards.display,
            attestations_missed: report.attestations_missed,
            attestations_succeeded: report.attestations_succeeded,
            attestation_success: report.attestation_success,
            block_missed: report.blocks_missed,
            block_mined: report.blocks_mined,
            block_proposed: report.blocks_proposed,
        }
    }
}

/// Expand the `{timestamp}` placeholder of a report path template.
pub fn report_path<Tz>(template: &str, started_at: &DateTime<Tz>) -> PathBuf
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let stamp = started_at.format(REPORT_TIMESTAMP_FORMAT).to_string();
    PathBuf::from(template.replace(TIMESTAMP_PLACEHOLDER, &stamp))
}

/// Append-only CSV report for one cycle. Rows from concurrent workers are
/// serialized through a mutex and flushed one at a time.
#[derive(Debug)]
pub struct ReportWriter {
    path: PathBuf,
    writer: Mutex<csv::Writer<File>>,
}

impl ReportWriter {
    /// Open (or create) the report, writing the header if the file is new.
    pub fn create(path: &Path) -> Result<Self, ReportError> {
        let io_err = |source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_err)?;
        let is_new = file.metadata().map_err(io_err)?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_new {
            writer.write_record(REPORT_COLUMNS)?;
            writer.flush().map_err(io_err)?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one report row.
    pub fn append(&self, report: &AccountReport) -> Result<(), ReportError> {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        writer.serialize(ReportRow::from(report))?;
        writer.flush().map_err(|source| ReportError::Io {
            path: self.path.clone(),
            source,
        })
    }
}
