//! Channel publisher — posts the finished ad to the configured target.

use async_trait::async_trait;
use serde_json::json;

use crate::error::PublishError;

/// Outbound publishing seam.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Post `text` to `target`. The text must already be escaped for the
    /// output formatting layer.
    async fn publish(&self, target: &str, text: &str) -> Result<(), PublishError>;
}

/// Publishes to a Telegram channel with MarkdownV2 formatting.
///
/// `target` is the channel's numeric id (`-100…`) or public name
/// (`@my_channel`).
pub struct TelegramPublisher {
    bot_token: String,
    client: reqwest::Client,
}

impl TelegramPublisher {
    pub fn new(bot_token: String) -> Self {
        Self {
            bot_token,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self) -> String {
        format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token)
    }
}

#[async_trait]
impl Publisher for TelegramPublisher {
    async fn publish(&self, target: &str, text: &str) -> Result<(), PublishError> {
        let body = json!({
            "chat_id": target,
            "text": text,
            "parse_mode": "MarkdownV2",
        });

        let resp = self
            .client
            .post(self.api_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| PublishError::SendFailed {
                target: target.to_string(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(PublishError::SendFailed {
                target: target.to_string(),
                reason: format!("sendMessage returned {status}: {detail}"),
            });
        }

        tracing::info!(target = %target, "Ad published to channel");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publisher_api_url() {
        let publisher = TelegramPublisher::new("123:ABC".into());
        assert_eq!(
            publisher.api_url(),
            "https://api.telegram.org/bot123:ABC/sendMessage"
        );
    }

    #[tokio::test]
    async fn publish_without_server_is_a_send_error() {
        let publisher = TelegramPublisher::new("fake-token".into());
        let result = publisher.publish("@nowhere", "text").await;

        let err = result.unwrap_err();
        assert!(matches!(
            err,
            PublishError::SendFailed { ref target, .. } if target == "@nowhere"
        ));
    }
}
