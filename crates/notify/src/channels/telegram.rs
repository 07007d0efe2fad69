//! Telegram Bot API notification channel.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::alert::Alert;
use crate::error::ChannelError;
use crate::NotifyChannel;

/// Public Bot API endpoint.
const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Characters that must be escaped in MarkdownV2 text.
const MARKDOWN_V2_SPECIAL: &[char] = &[
    '\\', '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Telegram channel posting alerts to a chat (optionally a forum thread).
pub struct TelegramChannel {
    bot_token: String,
    chat_id: String,
    thread_id: Option<i64>,
    api_base: String,
    client: reqwest::Client,
}

impl TelegramChannel {
    /// Create a channel for the given bot token and target chat.
    #[must_use]
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            thread_id: None,
            api_base: DEFAULT_API_BASE.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Post into a forum topic instead of the main chat.
    #[must_use]
    pub fn with_thread_id(mut self, thread_id: Option<i64>) -> Self {
        self.thread_id = thread_id;
        self
    }

    /// Override the Bot API base URL.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Use a preconfigured HTTP client (timeouts, proxy).
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Render an alert as MarkdownV2 text.
    ///
    /// Head in bold, links on one line separated by `///`, body as inline code.
    #[must_use]
    pub fn format_text(alert: &Alert) -> String {
        let links = alert
            .links
            .iter()
            .map(|link| {
                format!(
                    "[{}]({})",
                    escape_markdown_v2(&link.label),
                    escape_link_url(&link.url)
                )
            })
            .collect::<Vec<_>>()
            .join(" /// ");

        let mut text = format!("*{}*\n\n", escape_markdown_v2(&alert.head));
        if !links.is_empty() {
            text.push_str(&links);
            text.push_str("\n\n");
        }
        text.push('`');
        text.push_str(&escape_markdown_v2(&alert.body));
        text.push('`');
        text
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base.trim_end_matches('/'),
            self.bot_token
        )
    }
}

#[async_trait]
impl NotifyChannel for TelegramChannel {
    fn name(&self) -> &'static str {
        "telegram"
    }

    fn enabled(&self) -> bool {
        !self.bot_token.trim().is_empty() && !self.chat_id.trim().is_empty()
    }

    async fn send(&self, alert: &Alert) -> Result<(), ChannelError> {
        if !self.enabled() {
            return Err(ChannelError::NotConfigured(
                "telegram bot token or chat id".to_string(),
            ));
        }

        let payload = SendMessage {
            chat_id: &self.chat_id,
            text: Self::format_text(alert),
            parse_mode: "MarkdownV2",
            disable_web_page_preview: true,
            message_thread_id: self.thread_id,
        };

        debug!(channel = "telegram", head = %alert.head, "Sending notification");

        let response: TelegramResponse = self
            .client
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await?
            .json()
            .await?;

        if response.ok {
            debug!(channel = "telegram", "Notification sent successfully");
            Ok(())
        } else {
            let description = response.description.unwrap_or_default();
            warn!(
                channel = "telegram",
                code = ?response.error_code,
                description = %description,
                "Telegram rejected message"
            );
            Err(ChannelError::Api {
                code: response.error_code,
                description,
            })
        }
    }
}

/// Escape text for Telegram MarkdownV2.
#[must_use]
pub fn escape_markdown_v2(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if MARKDOWN_V2_SPECIAL.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Inside the `(...)` part of a link only `)` and `\` need escaping.
fn escape_link_url(url: &str) -> String {
    url.replace('\\', "\\\\").replace(')', "\\)")
}

// =============================================================================
// Telegram API types
// =============================================================================

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: String,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_thread_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_reserved_characters() {
        assert_eq!(
            escape_markdown_v2("10.0.0.1 | node-1 (main)!"),
            "10\\.0\\.0\\.1 \\| node\\-1 \\(main\\)\\!"
        );
        assert_eq!(escape_markdown_v2("plain text"), "plain text");
    }

    #[test]
    fn formats_head_links_and_body() {
        let alert = Alert::new("1.2.3.4 | main", "can't connect.")
            .with_link("DASHBOARD", "https://dashtec.xyz/validators/0xabc")
            .with_link("EXPLORER", "https://sepolia.etherscan.io/address/0xabc");

        let text = TelegramChannel::format_text(&alert);

        assert_eq!(
            text,
            "*1\\.2\\.3\\.4 \\| main*\n\n\
             [DASHBOARD](https://dashtec.xyz/validators/0xabc) /// \
             [EXPLORER](https://sepolia.etherscan.io/address/0xabc)\n\n\
             `can't connect\\.`"
        );
    }

    #[test]
    fn formats_without_links() {
        let text = TelegramChannel::format_text(&Alert::new("head", "body"));
        assert_eq!(text, "*head*\n\n`body`");
    }

    #[test]
    fn disabled_without_credentials() {
        assert!(!TelegramChannel::new("", "-100").enabled());
        assert!(!TelegramChannel::new("123:abc", " ").enabled());
        assert!(TelegramChannel::new("123:abc", "-100").enabled());
    }
}
