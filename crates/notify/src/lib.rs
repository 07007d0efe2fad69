//! Alert delivery for the validator monitor.
//!
//! This crate provides a best-effort notification system: an [`Alert`] is
//! handed to every enabled channel and delivery failures are logged rather
//! than propagated, so a broken messaging backend never stalls monitoring.
//!
//! # Usage
//!
//! ```no_run
//! use notify::{Alert, Notifier, TelegramChannel};
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let telegram = TelegramChannel::new("123:token", "-1001234");
//! let notifier = Notifier::with_channels(vec![Arc::new(telegram)]);
//!
//! let alert = Alert::new("10.0.0.1 | main", "can't connect to 10.0.0.1:8080.")
//!     .with_link("DASHBOARD", "https://dashtec.xyz/validators/0xabc");
//! let delivered = notifier.notify_and_wait(&alert).await;
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`NotifyChannel`] trait defines the interface for notification channels
//! - [`TelegramChannel`] implements Telegram Bot API delivery
//! - [`Notifier`] dispatches alerts to all enabled channels

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod alert;
pub mod channels;
pub mod error;

pub use alert::{Alert, Link};
pub use channels::telegram::TelegramChannel;
pub use channels::NotifyChannel;
pub use error::ChannelError;

use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Central notification dispatcher.
///
/// The `Notifier` manages notification channels and dispatches alerts to
/// all enabled channels.
pub struct Notifier {
    channels: Vec<Arc<dyn NotifyChannel>>,
    disabled: bool,
}

impl Notifier {
    /// Create a notifier with specific channels.
    ///
    /// Channels that report themselves as not configured are dropped here.
    #[must_use]
    pub fn with_channels(channels: Vec<Arc<dyn NotifyChannel>>) -> Self {
        let channels: Vec<_> = channels
            .into_iter()
            .filter(|channel| {
                let enabled = channel.enabled();
                if !enabled {
                    warn!(channel = channel.name(), "Channel not configured, skipping");
                }
                enabled
            })
            .collect();

        if channels.is_empty() {
            warn!("No notification channels configured");
        } else {
            info!(
                channel_count = channels.len(),
                "Notification system initialized"
            );
        }

        Self {
            channels,
            disabled: false,
        }
    }

    /// Create a disabled notifier (for testing or when notifications are off).
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            channels: vec![],
            disabled: true,
        }
    }

    /// Check if any notification channels are enabled.
    #[must_use]
    pub fn has_channels(&self) -> bool {
        !self.disabled && !self.channels.is_empty()
    }

    /// Send an alert to every channel and wait for all of them.
    ///
    /// Failures are logged per channel and never returned. The result is
    /// `true` only when at least one channel exists and all accepted the
    /// alert.
    pub async fn notify_and_wait(&self, alert: &Alert) -> bool {
        if !self.has_channels() {
            debug!("No channels configured, skipping alert");
            return false;
        }

        let mut delivered = true;

        for channel in &self.channels {
            let channel_name = channel.name();
            match channel.send(alert).await {
                Ok(()) => {
                    debug!(channel = channel_name, "Notification sent");
                }
                Err(e) => {
                    error!(
                        channel = channel_name,
                        error = %e,
                        "Failed to send notification"
                    );
                    delivered = false;
                }
            }
        }

        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingChannel {
        sent: AtomicUsize,
        fail: bool,
        configured: bool,
    }

    impl CountingChannel {
        fn new(fail: bool) -> Self {
            Self {
                sent: AtomicUsize::new(0),
                fail,
                configured: true,
            }
        }
    }

    #[async_trait]
    impl NotifyChannel for CountingChannel {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn enabled(&self) -> bool {
            self.configured
        }

        async fn send(&self, _alert: &Alert) -> Result<(), ChannelError> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ChannelError::Other("boom".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_disabled_notifier() {
        let notifier = Notifier::disabled();
        assert!(!notifier.has_channels());
    }

    #[test]
    fn test_unconfigured_channels_are_dropped() {
        let channel = CountingChannel {
            configured: false,
            ..CountingChannel::new(false)
        };
        let notifier = Notifier::with_channels(vec![Arc::new(channel)]);
        assert!(!notifier.has_channels());
    }

    #[tokio::test]
    async fn test_failures_are_swallowed() {
        let ok = Arc::new(CountingChannel::new(false));
        let failing = Arc::new(CountingChannel::new(true));
        let notifier = Notifier::with_channels(vec![ok.clone(), failing.clone()]);

        let delivered = notifier.notify_and_wait(&Alert::new("h", "b")).await;

        assert!(!delivered);
        assert_eq!(ok.sent.load(Ordering::SeqCst), 1);
        assert_eq!(failing.sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disabled_notifier_sends_nothing() {
        let notifier = Notifier::disabled();
        assert!(!notifier.notify_and_wait(&Alert::new("h", "b")).await);
    }
}
