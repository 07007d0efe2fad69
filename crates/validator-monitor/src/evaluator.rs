//! Per-account evaluation: node reachability, sync lag and dashboard stats
//! folded into one [`AccountReport`].

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::accounts::Account;
use crate::clients::node::UNKNOWN_VERSION;
use crate::clients::{ActiveStats, Dashboard, DashboardStats, NodeRpc, QueuePosition};
use crate::report::{round2, AccountReport, Balance, Status};
use crate::retry::RetryPolicy;

/// Blocks a node may trail the explorer before it counts as out of sync.
pub const DRIFT_TOLERANCE: u64 = 3;

/// Evaluates accounts against the node, dashboard and explorer data.
///
/// Holds no mutable state; it is shared by all workers of a cycle.
pub struct Evaluator {
    node: Arc<dyn NodeRpc>,
    dashboard: Arc<dyn Dashboard>,
    retry: RetryPolicy,
    attestation_threshold: f64,
}

impl Evaluator {
    pub fn new(
        node: Arc<dyn NodeRpc>,
        dashboard: Arc<dyn Dashboard>,
        retry: RetryPolicy,
        attestation_threshold: f64,
    ) -> Self {
        Self {
            node,
            dashboard,
            retry,
            attestation_threshold,
        }
    }

    /// Produce the report for one account.
    ///
    /// `explorer_height` of `None` or `0` disables the sync check.
    pub async fn evaluate(&self, account: &Account, explorer_height: Option<u64>) -> AccountReport {
        let mut report = AccountReport::blank(account);
        report.explorer_height = explorer_height;
        let label = account.label();

        let node = &self.node;
        let host = account.ip.as_str();
        let port = account.port;

        let tip = match self
            .retry
            .run("node tip", move || node.fetch_node_tip(host, port))
            .await
        {
            Ok(tip) => tip,
            Err(e) => {
                error!(account = %label, error = %e, "Node unreachable");
                report.status = Status::ConnectionRefused;
                return report;
            }
        };

        report.version = match self
            .retry
            .run("node version", move || node.fetch_node_version(host, port))
            .await
        {
            Ok(version) => version,
            Err(e) => {
                debug!(account = %label, error = %e, "Node version unavailable");
                UNKNOWN_VERSION.to_string()
            }
        };
        report.sync_latest = tip.latest.number;

        if let Some(height) = explorer_height.filter(|h| *h > 0) {
            if report.sync_latest.saturating_add(DRIFT_TOLERANCE) < height {
                error!(
                    account = %label,
                    latest = report.sync_latest,
                    proven = tip.proven.number,
                    finalized = tip.finalized.number,
                    explorer = height,
                    "Node is out of sync"
                );
                report.status = Status::SyncedOut;
                return report;
            }
        }
        debug!(
            account = %label,
            latest = report.sync_latest,
            proven = tip.proven.number,
            finalized = tip.finalized.number,
            explorer = ?explorer_height,
            "Node in sync"
        );

        let dashboard = &self.dashboard;
        let address = account.address.as_str();

        let stats = match self
            .retry
            .run("dashboard stats", move || dashboard.fetch_dashboard_stats(address))
            .await
        {
            Ok(stats) => stats,
            Err(e) => {
                warn!(account = %label, error = %e, "Dashboard unavailable");
                return report;
            }
        };

        match stats {
            DashboardStats::Active(active) => self.apply_active(&mut report, &active, &label),
            DashboardStats::NotFound => {
                match self
                    .retry
                    .run("queue position", move || dashboard.fetch_queue_position(address))
                    .await
                {
                    Ok(QueuePosition::NotRegistered) => {
                        warn!(account = %label, "Validator is not registered");
                        report.status = Status::NotRegistered;
                    }
                    Ok(QueuePosition::Ranked(rank)) => {
                        info!(account = %label, rank, "Validator is in the entry queue");
                        report.status = Status::Queued(rank);
                    }
                    Err(e) => {
                        warn!(account = %label, error = %e, "Queue lookup failed");
                    }
                }
            }
            DashboardStats::Exited { status_label } => {
                error!(account = %label, status = %status_label, "Validator has exited");
                report.status = Status::Exited;
            }
            DashboardStats::Unknown => {
                warn!(account = %label, "Unrecognized dashboard response");
            }
        }

        report
    }

    fn apply_active(&self, report: &mut AccountReport, active: &ActiveStats, label: &str) {
        report.balance = Balance::from_raw(active.balance);
        report.rewards = Balance::from_raw(active.unclaimed_rewards);
        report.attestations_succeeded = active.attestations_succeeded;
        report.attestations_missed = active.attestations_missed;
        report.blocks_proposed = active.blocks_proposed;
        report.blocks_mined = active.blocks_mined;
        report.blocks_missed = active.blocks_missed;
        report.attestation_success =
            attestation_rate(active.attestations_succeeded, active.attestations_missed);

        let low = report
            .attestation_success
            .is_some_and(|rate| rate < self.attestation_threshold);

        if low {
            report.status = Status::LowAttestation;
            error!(
                account = %label,
                balance = report.balance.display,
                rewards = report.rewards.display,
                succeeded = report.attestations_succeeded,
                missed = report.attestations_missed,
                rate = ?report.attestation_success,
                threshold = self.attestation_threshold,
                "Low attestation success"
            );
        } else {
            report.status = Status::Active(active.status_label.trim().to_lowercase());
            info!(
                account = %label,
                status = %report.status,
                balance = report.balance.display,
                rewards = report.rewards.display,
                succeeded = report.attestations_succeeded,
                missed = report.attestations_missed,
                rate = ?report.attestation_success,
                proposed = report.blocks_proposed,
                mined = report.blocks_mined,
                block_missed = report.blocks_missed,
                "Validator healthy"
            );
        }
    }
}

/// Attestation success in percent, two decimals. `None` with no attestations.
pub fn attestation_rate(succeeded: u64, missed: u64) -> Option<f64> {
    let total = succeeded.saturating_add(missed);
    (total > 0).then(|| round2(succeeded as f64 / total as f64 * 100.0))
}
