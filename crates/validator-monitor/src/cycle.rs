//! Monitoring cycles: evaluate every account, alert, write the report, sleep.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::accounts::Account;
use crate::alerting::AlertPolicy;
use crate::clients::Explorer;
use crate::config::{CycleConfig, MonitoringConfig};
use crate::error::ReportError;
use crate::evaluator::Evaluator;
use crate::report::{report_path, AccountReport, ReportWriter, Status};
use crate::retry::RetryPolicy;

/// Outcome of one monitoring cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleSummary {
    /// 1-based cycle number.
    pub cycle: u64,
    pub report_path: PathBuf,
    pub explorer_height: Option<u64>,
    /// Accounts evaluated (including ones whose worker failed).
    pub evaluated: usize,
    /// Accounts with an active status.
    pub healthy: usize,
    /// Accounts in an alertable state.
    pub unhealthy: usize,
    /// Alerts accepted by every channel.
    pub alerts_sent: usize,
    /// Per-account problems that did not abort the cycle.
    pub errors: Vec<String>,
}

/// Totals over a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub completed: u64,
    pub failed: u64,
}

/// Drives monitoring cycles over a fixed account list.
pub struct CycleRunner {
    accounts: Arc<[Account]>,
    explorer: Arc<dyn Explorer>,
    evaluator: Arc<Evaluator>,
    alerts: Arc<AlertPolicy>,
    retry: RetryPolicy,
    threads: usize,
    report_template: String,
    cycle: CycleConfig,
}

impl CycleRunner {
    pub fn new(
        accounts: Arc<[Account]>,
        explorer: Arc<dyn Explorer>,
        evaluator: Arc<Evaluator>,
        alerts: Arc<AlertPolicy>,
        config: &MonitoringConfig,
    ) -> Self {
        Self {
            accounts,
            explorer,
            evaluator,
            alerts,
            retry: RetryPolicy::from_config(&config.requests),
            threads: config.threads.max(1),
            report_template: config.report.output_file.clone(),
            cycle: config.cycle.clone(),
        }
    }

    /// Run cycles until the configured limit is reached or `shutdown` fires.
    ///
    /// A cycle in progress always completes; cancellation is observed
    /// between cycles and while sleeping.
    pub async fn run_forever(&self, shutdown: CancellationToken) -> CycleStats {
        let mut stats = CycleStats::default();
        let mut cycle = 0_u64;

        while !shutdown.is_cancelled() {
            cycle += 1;

            match self.run_cycle(cycle).await {
                Ok(summary) => {
                    stats.completed += 1;
                    info!(
                        cycle,
                        evaluated = summary.evaluated,
                        healthy = summary.healthy,
                        unhealthy = summary.unhealthy,
                        alerts_sent = summary.alerts_sent,
                        errors = summary.errors.len(),
                        report = %summary.report_path.display(),
                        "Cycle completed"
                    );
                }
                Err(e) => {
                    stats.failed += 1;
                    error!(cycle, error = %e, "Cycle failed");
                }
            }

            if !self.cycle.enabled {
                break;
            }
            if self.cycle.max_cycles > 0 && cycle >= self.cycle.max_cycles {
                info!(max_cycles = self.cycle.max_cycles, "Cycle limit reached");
                break;
            }

            let pause = self.cycle.sleep();
            if pause.is_zero() {
                continue;
            }
            info!(minutes = self.cycle.sleep_minutes, "Sleeping until next cycle");
            tokio::select! {
                () = shutdown.cancelled() => break,
                () = tokio::time::sleep(pause) => {}
            }
        }

        if shutdown.is_cancelled() {
            info!(cycles = cycle, "Shutdown requested, monitoring stopped");
        }
        stats
    }

    /// Evaluate every account once and write the cycle report.
    ///
    /// Accounts are evaluated and alerted on even when the report file
    /// cannot be created; the cycle then still fails with that error.
    pub async fn run_cycle(&self, cycle: u64) -> Result<CycleSummary, ReportError> {
        let started_at = Local::now();
        let path = report_path(&self.report_template, &started_at);
        let writer = ReportWriter::create(&path);
        if let Err(e) = &writer {
            error!(cycle, error = %e, "Cannot create report, rows will not be written");
        }

        info!(cycle, accounts = self.accounts.len(), threads = self.threads, "Starting cycle");

        let explorer = &self.explorer;
        let explorer_height = match self
            .retry
            .run("explorer height", move || explorer.fetch_explorer_height())
            .await
        {
            Ok(height) => {
                info!(height, "Explorer height");
                Some(height)
            }
            Err(e) => {
                warn!(error = %e, "Explorer unavailable, sync check disabled this cycle");
                None
            }
        };

        let mut summary = CycleSummary {
            cycle,
            report_path: path,
            explorer_height,
            ..CycleSummary::default()
        };

        let handles = self.spawn_workers(explorer_height);

        for (account, handle) in self.accounts.iter().zip(handles) {
            let report = match handle.await {
                Ok((report, sent)) => {
                    if sent {
                        summary.alerts_sent += 1;
                    }
                    report
                }
                Err(e) => {
                    error!(account = %account.label(), error = %e, "Worker failed");
                    summary.errors.push(format!("account #{}: {e}", account.id));
                    AccountReport::blank(account)
                }
            };

            summary.evaluated += 1;
            if report.status.is_alertable() {
                summary.unhealthy += 1;
            } else if matches!(report.status, Status::Active(_)) {
                summary.healthy += 1;
            }

            let Ok(writer) = &writer else {
                continue;
            };
            if let Err(e) = writer.append(&report) {
                error!(account = %account.label(), error = %e, "Failed to write report row");
                summary.errors.push(format!("account #{}: {e}", account.id));
            }
        }

        writer.map(|_| summary)
    }

    /// One task per account; at most `threads` run at a time.
    fn spawn_workers(&self, explorer_height: Option<u64>) -> Vec<JoinHandle<(AccountReport, bool)>> {
        let permits = Arc::new(Semaphore::new(self.threads));

        self.accounts
            .iter()
            .cloned()
            .map(|account| {
                let permits = Arc::clone(&permits);
                let evaluator = Arc::clone(&self.evaluator);
                let alerts = Arc::clone(&self.alerts);

                tokio::spawn(async move {
                    let Ok(_permit) = permits.acquire_owned().await else {
                        return (AccountReport::blank(&account), false);
                    };
                    let report = evaluator.evaluate(&account, explorer_height).await;
                    let sent = alerts.maybe_alert(&account, &report).await;
                    (report, sent)
                })
            })
            .collect()
    }
}
