//! Messaging collaborator backed by the Telegram Bot API

use async_trait::async_trait;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::TelegramConfig;
use crate::error::{BotError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageOptions {
    pub parse_mode: Option<String>,
    pub disable_web_page_preview: bool,
}

impl Default for MessageOptions {
    fn default() -> Self {
        Self {
            parse_mode: Some("Markdown".to_string()),
            disable_web_page_preview: true,
        }
    }
}

#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(&self, chat_id: &str, text: &str, options: &MessageOptions)
    -> Result<()>;
}

/// Sends `text` to every channel concurrently. Fails if any send fails.
pub async fn broadcast(messenger: &dyn Messenger, text: &str, channels: &[&str]) -> Result<()> {
    let options = MessageOptions::default();
    try_join_all(
        channels
            .iter()
            .map(|chat| messenger.send_message(chat, text, &options)),
    )
    .await?;
    Ok(())
}

pub struct TelegramClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
    disable_web_page_preview: bool,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let bot_token = config
            .bot_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| BotError::ConfigError("telegram.bot_token is not set".to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token,
        })
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        options: &MessageOptions,
    ) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let body = SendMessage {
            chat_id,
            text,
            parse_mode: options.parse_mode.as_deref(),
            disable_web_page_preview: options.disable_web_page_preview,
        };

        let response = self.http.post(url).json(&body).send().await?;
        let status = response.status();
        let reply: ApiResponse = response.json().await.map_err(|e| {
            BotError::Telegram(format!("unreadable sendMessage response ({}): {}", status, e))
        })?;

        if !reply.ok {
            return Err(BotError::Telegram(format!(
                "sendMessage to {} failed: {}",
                chat_id,
                reply.description.unwrap_or_else(|| status.to_string())
            )));
        }
        debug!("Sent Telegram message to {}", chat_id);
        Ok(())
    }
}
