//! Telegram Bot API notification sink.
//!
//! Sends plain `sendMessage` calls. Delivery problems are logged and reported
//! as `NotificationResult::Failed`; they never surface as errors to callers.

use std::time::Duration;

use domain::services::{ActivationNotice, ActivationNotifier, NotificationResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::NotificationsConfig;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

pub struct TelegramNotifier {
    client: Client,
    api_url: String,
    bot_token: String,
    enabled: bool,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    result: Option<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

impl TelegramNotifier {
    pub fn new(config: &NotificationsConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(SEND_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_url: config.telegram_api_url.trim_end_matches('/').to_string(),
            bot_token: config.telegram_bot_token.trim().to_string(),
            enabled: config.enabled,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.enabled && !self.bot_token.is_empty()
    }

    /// Send an HTML-formatted message to `chat_id`.
    pub async fn send_message(&self, chat_id: &str, text: &str) -> NotificationResult {
        if !self.is_configured() {
            tracing::debug!(chat_id = %chat_id, "Telegram notifications disabled, skipping");
            return NotificationResult::Skipped;
        }

        let url = format!("{}/bot{}/sendMessage", self.api_url, self.bot_token);
        let body = SendMessage {
            chat_id,
            text,
            parse_mode: "HTML",
        };

        let response = match self.client.post(&url).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                // reqwest errors carry the URL, which holds the bot token
                let e = e.without_url();
                tracing::error!(chat_id = %chat_id, error = %e, "Telegram request failed");
                return NotificationResult::Failed(e.to_string());
            }
        };

        let status = response.status();
        let parsed = match response.json::<SendMessageResponse>().await {
            Ok(parsed) => parsed,
            Err(e) => {
                let e = e.without_url();
                tracing::warn!(chat_id = %chat_id, status = %status, error = %e, "Unreadable Telegram response");
                return NotificationResult::Failed(format!("status {}: {}", status, e));
            }
        };

        if !status.is_success() || !parsed.ok {
            let description = parsed.description.unwrap_or_default();
            tracing::warn!(
                chat_id = %chat_id,
                status = %status,
                description = %description,
                "Telegram rejected message"
            );
            return NotificationResult::Failed(description);
        }

        let message_id = parsed.result.map(|m| m.message_id);
        tracing::info!(chat_id = %chat_id, message_id = ?message_id, "Telegram message sent");
        NotificationResult::Sent(message_id)
    }
}

#[async_trait::async_trait]
impl ActivationNotifier for TelegramNotifier {
    async fn notify_activation(&self, notice: &ActivationNotice) -> NotificationResult {
        self.send_message(&notice.chat_id, notice.text()).await
    }
}
