//! Validator health monitor.
//!
//! Every cycle each configured validator is checked against three sources:
//! its own node (JSON-RPC), the public dashboard and the chain explorer. The
//! outcome is classified into a [`Status`], unhealthy validators trigger an
//! alert through the `notify` crate, and every result lands in a per-cycle
//! CSV report.
//!
//! # Modules
//!
//! - [`accounts`]: the validator list loaded from CSV
//! - [`clients`]: node, dashboard and explorer data sources
//! - [`evaluator`]: per-account health evaluation
//! - [`alerting`]: alert policy and message templates
//! - [`cycle`]: concurrent cycle orchestration and the run loop
//! - [`report`]: report rows and the CSV writer

pub mod accounts;
pub mod alerting;
pub mod clients;
pub mod config;
pub mod cycle;
pub mod error;
pub mod evaluator;
pub mod logging;
pub mod report;
pub mod retry;

pub use accounts::{Account, AccountRegistry};
pub use alerting::AlertPolicy;
pub use config::Settings;
pub use cycle::{CycleRunner, CycleStats, CycleSummary};
pub use error::{AccountsError, ConfigError, ReportError, TransportError};
pub use evaluator::{Evaluator, DRIFT_TOLERANCE};
pub use report::{AccountReport, Balance, ReportWriter, Status, DENOMINATION};
pub use retry::RetryPolicy;
