//! Turns unhealthy reports into alerts.

use notify::{Alert, Notifier};
use tracing::{debug, info, warn};

use crate::accounts::Account;
use crate::config::{LinksConfig, ADDRESS_PLACEHOLDER};
use crate::report::{AccountReport, Status};

/// Decides which reports warrant an alert and dispatches them.
pub struct AlertPolicy {
    notifier: Notifier,
    links: LinksConfig,
}

impl AlertPolicy {
    pub fn new(notifier: Notifier, links: LinksConfig) -> Self {
        Self { notifier, links }
    }

    /// Build the alert for a report, if its status is alertable.
    pub fn build_alert(&self, account: &Account, report: &AccountReport) -> Option<Alert> {
        let body = match &report.status {
            Status::ConnectionRefused => {
                format!("can't connect to {}:{}.", account.ip, account.port)
            }
            Status::SyncedOut => format!(
                "node is out of sync: {}/{} blocks.",
                report.sync_latest,
                report.explorer_height.unwrap_or_default()
            ),
            Status::LowAttestation => {
                let succeeded = report.attestations_succeeded;
                let total = succeeded.saturating_add(report.attestations_missed);
                let rate = format_rate(report.attestation_success.unwrap_or_default());
                format!("low attestation success: {succeeded}/{total} ({rate}%).")
            }
            Status::Exited => "validator is exited.".to_string(),
            Status::Active(_) | Status::NotRegistered | Status::Queued(_) | Status::Unknown => {
                return None;
            }
        };

        let address = account.address.as_str();
        Some(
            Alert::new(account.label(), body)
                .with_link(
                    "DASHBOARD",
                    self.links.dashboard.replace(ADDRESS_PLACEHOLDER, address),
                )
                .with_link(
                    "EXPLORER",
                    self.links.explorer.replace(ADDRESS_PLACEHOLDER, address),
                ),
        )
    }

    /// Send an alert for the report when its status calls for one.
    ///
    /// Returns `true` when an alert went out and every channel accepted it.
    pub async fn maybe_alert(&self, account: &Account, report: &AccountReport) -> bool {
        let Some(alert) = self.build_alert(account, report) else {
            return false;
        };

        if !self.notifier.has_channels() {
            debug!(account = %alert.head, status = %report.status, "Notifications disabled");
            return false;
        }

        let delivered = self.notifier.notify_and_wait(&alert).await;
        if delivered {
            info!(account = %alert.head, status = %report.status, "Alert sent");
        } else {
            warn!(account = %alert.head, status = %report.status, "Alert not delivered");
        }
        delivered
    }
}

/// Percent with at least one decimal: `85.0`, `66.67`.
fn format_rate(rate: f64) -> String {
    if rate.fract().abs() < f64::EPSILON {
        format!("{rate:.1}")
    } else {
        rate.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use notify::{ChannelError, NotifyChannel};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingChannel {
        sent: Mutex<Vec<Alert>>,
        fail: bool,
    }

    #[async_trait]
    impl NotifyChannel for RecordingChannel {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn enabled(&self) -> bool {
            true
        }

        async fn send(&self, alert: &Alert) -> Result<(), ChannelError> {
            self.sent.lock().unwrap().push(alert.clone());
            if self.fail {
                Err(ChannelError::Other("rejected".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn account(note: Option<&str>) -> Account {
        Account {
            id: 3,
            address: "0xfeed".to_string(),
            ip: "192.168.0.9".to_string(),
            port: 8080,
            note: note.map(str::to_string),
        }
    }

    fn report_with(status: Status) -> AccountReport {
        let mut report = AccountReport::blank(&account(Some("eu-1")));
        report.status = status;
        report
    }

    fn policy(channel: Arc<RecordingChannel>) -> AlertPolicy {
        let notifier = Notifier::with_channels(vec![channel as Arc<dyn NotifyChannel>]);
        AlertPolicy::new(notifier, LinksConfig::default())
    }

    #[test]
    fn connection_refused_alert() {
        let policy = AlertPolicy::new(Notifier::disabled(), LinksConfig::default());
        let alert = policy
            .build_alert(&account(Some("eu-1")), &report_with(Status::ConnectionRefused))
            .unwrap();

        assert_eq!(alert.head, "192.168.0.9 | eu-1");
        assert_eq!(alert.body, "can't connect to 192.168.0.9:8080.");
        assert_eq!(alert.links[0].label, "DASHBOARD");
        assert_eq!(alert.links[0].url, "https://dashtec.xyz/validators/0xfeed");
        assert_eq!(alert.links[1].label, "EXPLORER");
        assert_eq!(alert.links[1].url, "https://sepolia.etherscan.io/address/0xfeed");
    }

    #[test]
    fn head_without_note() {
        let policy = AlertPolicy::new(Notifier::disabled(), LinksConfig::default());
        let alert = policy
            .build_alert(&account(None), &report_with(Status::Exited))
            .unwrap();
        assert_eq!(alert.head, "192.168.0.9");
        assert_eq!(alert.body, "validator is exited.");
    }

    #[test]
    fn sync_and_attestation_bodies() {
        let policy = AlertPolicy::new(Notifier::disabled(), LinksConfig::default());
        let acct = account(Some("eu-1"));

        let mut synced_out = report_with(Status::SyncedOut);
        synced_out.sync_latest = 1000;
        synced_out.explorer_height = Some(1010);
        assert_eq!(
            policy.build_alert(&acct, &synced_out).unwrap().body,
            "node is out of sync: 1000/1010 blocks."
        );

        let mut low = report_with(Status::LowAttestation);
        low.attestations_succeeded = 85;
        low.attestations_missed = 15;
        low.attestation_success = Some(85.0);
        assert_eq!(
            policy.build_alert(&acct, &low).unwrap().body,
            "low attestation success: 85/100 (85.0%)."
        );

        low.attestations_succeeded = 2;
        low.attestations_missed = 1;
        low.attestation_success = Some(66.67);
        assert_eq!(
            policy.build_alert(&acct, &low).unwrap().body,
            "low attestation success: 2/3 (66.67%)."
        );
    }

    #[tokio::test]
    async fn only_alertable_statuses_are_sent() {
        let channel = Arc::new(RecordingChannel::default());
        let policy = policy(channel.clone());
        let acct = account(Some("eu-1"));

        for status in [
            Status::Active("validating".to_string()),
            Status::NotRegistered,
            Status::Queued(4),
            Status::Unknown,
        ] {
            assert!(!policy.maybe_alert(&acct, &report_with(status)).await);
        }
        assert!(channel.sent.lock().unwrap().is_empty());

        assert!(policy.maybe_alert(&acct, &report_with(Status::Exited)).await);
        assert_eq!(channel.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn channel_failure_is_swallowed() {
        let channel = Arc::new(RecordingChannel {
            fail: true,
            ..RecordingChannel::default()
        });
        let policy = policy(channel.clone());

        let delivered = policy
            .maybe_alert(&account(None), &report_with(Status::ConnectionRefused))
            .await;
        assert!(!delivered);
        assert_eq!(channel.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn disabled_notifier_sends_nothing() {
        let policy = AlertPolicy::new(Notifier::disabled(), LinksConfig::default());
        assert!(
            !policy
                .maybe_alert(&account(None), &report_with(Status::Exited))
                .await
        );
    }
}
