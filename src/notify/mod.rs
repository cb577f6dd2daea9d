// Fire-and-forget chat notifications

use crate::config::NotifyConfig;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Outbound notification sink. Delivery failures are logged and swallowed.
pub trait Notifier: Send + Sync {
    fn notify(&self, text: &str);
}

/// Posts messages to a Slack channel via `chat.postMessage`
pub struct SlackNotifier {
    client: reqwest::Client,
    token: String,
    config: NotifyConfig,
}

#[derive(Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    icon_emoji: &'a str,
    parse: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

impl SlackNotifier {
    pub fn new(token: String, config: NotifyConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            config,
        }
    }

    async fn post(client: reqwest::Client, token: String, config: NotifyConfig, text: String) -> Result<()> {
        let body = PostMessage {
            channel: &config.channel,
            icon_emoji: &config.icon_emoji,
            parse: "full",
            text: &text,
        };

        let response = client
            .post(&config.post_url)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .context("Failed to send chat notification")?;

        if !response.status().is_success() {
            return Err(anyhow!("Chat notification failed with status {}", response.status()));
        }

        let reply: PostMessageResponse = response
            .json()
            .await
            .context("Failed to parse chat notification response")?;
        if !reply.ok {
            return Err(anyhow!(
                "Chat notification rejected: {}",
                reply.error.unwrap_or_else(|| "unknown error".to_string())
            ));
        }

        Ok(())
    }
}

impl Notifier for SlackNotifier {
    fn notify(&self, text: &str) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime, dropping chat notification");
            return;
        };

        let client = self.client.clone();
        let token = self.token.clone();
        let config = self.config.clone();
        let text = text.to_string();
        handle.spawn(async move {
            match Self::post(client, token, config, text).await {
                Ok(()) => debug!("Chat notification delivered"),
                Err(e) => warn!(error = %e, "Chat notification failed"),
            }
        });
    }
}

/// Drops every message; used when notifications are disabled
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, text: &str) {
        debug!(text = %text, "Notification suppressed");
    }
}

/// Keeps messages in memory so tests can inspect them
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .expect("RecordingNotifier lock poisoned")
            .clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, text: &str) {
        self.messages
            .lock()
            .expect("RecordingNotifier lock poisoned")
            .push(text.to_string());
    }
}
