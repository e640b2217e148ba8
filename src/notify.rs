use anyhow::{Context, Result, anyhow};
use serde_json::json;

use crate::http_client::http_client;

const TELEGRAM_API: &str = "https://api.telegram.org";

/// Delivers the finished report to a Telegram chat.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    /// `None` unless both `TELEGRAM_TOKEN` and `TELEGRAM_CHAT_ID` are set.
    pub fn from_env() -> Option<Self> {
        let token = std::env::var("TELEGRAM_TOKEN").ok()?;
        let chat_id = std::env::var("TELEGRAM_CHAT_ID").ok()?;
        if token.trim().is_empty() || chat_id.trim().is_empty() {
            return None;
        }
        Some(Self {
            token: token.trim().to_string(),
            chat_id: chat_id.trim().to_string(),
        })
    }

    pub fn send(&self, text: &str) -> Result<()> {
        let url = format!("{TELEGRAM_API}/bot{}/sendMessage", self.token);
        let resp = http_client()
            .context("build http client")?
            .post(&url)
            .json(&json!({ "chat_id": self.chat_id, "text": text }))
            .send()
            .context("telegram request failed")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(anyhow!("telegram http {}: {}", status, body));
        }
        Ok(())
    }
}
