///! Notification dispatch
///!
///! Thin adapter over the messaging transport. Failures are always
///! non-fatal to callers: the loops log and move to the next recipient.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use lumos_core::UserId;

const TELEGRAM_API: &str = "https://api.telegram.org";
const DONATE_URL: &str = "https://send.monobank.ua/jar/5N86nkGZ1R";

#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Deliver one formatted message to one recipient.
    async fn send(&self, user: UserId, text: &str) -> Result<()>;

    /// Same, but marks the message as the last of a batch. The default
    /// adds nothing; the Telegram adapter attaches the donate button.
    async fn send_closing(&self, user: UserId, text: &str) -> Result<()> {
        self.send(user, text).await
    }
}

/// Telegram Bot API adapter (`sendMessage`, Markdown parse mode).
pub struct TelegramDispatcher {
    client: Client,
    token: String,
    api_base: String,
}

impl TelegramDispatcher {
    pub fn new(client: Client, token: String) -> Self {
        Self {
            client,
            token,
            api_base: TELEGRAM_API.to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }

    async fn post(&self, body: serde_json::Value) -> Result<()> {
        self.client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .context("Failed to reach Telegram API")?
            .error_for_status()
            .context("Telegram API rejected the message")?;
        Ok(())
    }
}

#[async_trait]
impl Dispatcher for TelegramDispatcher {
    async fn send(&self, user: UserId, text: &str) -> Result<()> {
        self.post(json!({
            "chat_id": user,
            "text": text,
            "parse_mode": "Markdown",
        }))
        .await
    }

    async fn send_closing(&self, user: UserId, text: &str) -> Result<()> {
        self.post(json!({
            "chat_id": user,
            "text": text,
            "parse_mode": "Markdown",
            "reply_markup": {
                "inline_keyboard": [[
                    { "text": "💛 Підтримати проєкт", "url": DONATE_URL }
                ]]
            },
        }))
        .await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records every send; optionally fails for chosen recipients.
    #[derive(Default)]
    pub struct RecordingDispatcher {
        pub sent: Mutex<Vec<(UserId, String)>>,
        pub failing_users: Vec<UserId>,
    }

    impl RecordingDispatcher {
        pub fn sent_to(&self, user: UserId) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|(u, _)| *u == user)
                .map(|(_, text)| text.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Dispatcher for RecordingDispatcher {
        async fn send(&self, user: UserId, text: &str) -> Result<()> {
            if self.failing_users.contains(&user) {
                anyhow::bail!("simulated delivery failure for {}", user);
            }
            self.sent.lock().unwrap().push((user, text.to_string()));
            Ok(())
        }
    }
}
