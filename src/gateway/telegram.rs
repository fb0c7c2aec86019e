//! Telegram gateway — long-polls the Bot API for updates.
//!
//! Translates `message` and `callback_query` updates into [`InboundEvent`]s
//! and sends prompts/inline keyboards back through `sendMessage`,
//! `editMessageText`, and `editMessageReplyMarkup`.

use async_trait::async_trait;
use serde_json::json;

use crate::error::GatewayError;
use crate::gateway::{EventKind, EventStream, Gateway, InboundEvent, Markup, MessageRef};

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Telegram gateway — connects to the Bot API via long-polling.
pub struct TelegramGateway {
    bot_token: String,
    client: reqwest::Client,
}

impl TelegramGateway {
    pub fn new(bot_token: String) -> Self {
        Self {
            bot_token,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{method}", self.bot_token)
    }

    /// POST a Bot API method, mapping any failure through `err`.
    async fn call(
        &self,
        method: &str,
        body: serde_json::Value,
        err: impl Fn(String) -> GatewayError,
    ) -> Result<(), GatewayError> {
        let resp = self
            .client
            .post(self.api_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|e| err(e.to_string()))?;

        if resp.status().is_success() {
            return Ok(());
        }

        let status = resp.status();
        let detail = resp.text().await.unwrap_or_default();
        Err(err(format!("{method} returned {status}: {detail}")))
    }
}

// ── Gateway trait implementation ────────────────────────────────────

#[async_trait]
impl Gateway for TelegramGateway {
    async fn start(&self) -> Result<EventStream, GatewayError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let bot_token = self.bot_token.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram gateway polling for updates...");

            loop {
                let url = format!("https://api.telegram.org/bot{bot_token}/getUpdates");
                let body = json!({
                    "offset": offset,
                    "timeout": 30,
                    "allowed_updates": ["message", "callback_query"]
                });

                let resp = match client.post(&url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let data: serde_json::Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                if let Some(results) = data.get("result").and_then(serde_json::Value::as_array) {
                    for update in results {
                        if let Some(uid) =
                            update.get("update_id").and_then(serde_json::Value::as_i64)
                        {
                            offset = uid + 1;
                        }

                        // Stop the client-side spinner on button presses
                        if let Some(cb_id) = update
                            .pointer("/callback_query/id")
                            .and_then(serde_json::Value::as_str)
                        {
                            let ack = json!({ "callback_query_id": cb_id });
                            let url = format!(
                                "https://api.telegram.org/bot{bot_token}/answerCallbackQuery"
                            );
                            if let Err(e) = client.post(&url).json(&ack).send().await {
                                tracing::debug!("answerCallbackQuery failed: {e}");
                            }
                        }

                        let Some(event) = parse_update(update) else {
                            continue;
                        };

                        if tx.send(event).is_err() {
                            tracing::info!("Telegram listener channel closed");
                            return;
                        }
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        markup: Option<&Markup>,
    ) -> Result<(), GatewayError> {
        let chunks = split_message(text, TELEGRAM_MAX_MESSAGE_LENGTH);
        let last = chunks.len() - 1;

        for (i, chunk) in chunks.iter().enumerate() {
            let mut body = json!({
                "chat_id": chat_id,
                "text": chunk,
            });
            // The keyboard rides on the final chunk
            if i == last {
                if let Some(markup) = markup {
                    body["reply_markup"] = markup_json(markup);
                }
            }
            self.call("sendMessage", body, |reason| GatewayError::SendFailed {
                chat_id,
                reason,
            })
            .await?;
        }
        Ok(())
    }

    async fn edit_text(
        &self,
        message: MessageRef,
        text: &str,
        markup: Option<&Markup>,
    ) -> Result<(), GatewayError> {
        let mut body = json!({
            "chat_id": message.chat_id,
            "message_id": message.message_id,
            "text": text,
        });
        if let Some(markup) = markup {
            body["reply_markup"] = markup_json(markup);
        }
        self.call("editMessageText", body, |reason| GatewayError::EditFailed {
            chat_id: message.chat_id,
            message_id: message.message_id,
            reason,
        })
        .await
    }

    async fn edit_markup(&self, message: MessageRef, markup: &Markup) -> Result<(), GatewayError> {
        let body = json!({
            "chat_id": message.chat_id,
            "message_id": message.message_id,
            "reply_markup": markup_json(markup),
        });
        self.call("editMessageReplyMarkup", body, |reason| {
            GatewayError::EditFailed {
                chat_id: message.chat_id,
                message_id: message.message_id,
                reason,
            }
        })
        .await
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Translate one `getUpdates` entry into an [`InboundEvent`].
fn parse_update(update: &serde_json::Value) -> Option<InboundEvent> {
    if let Some(message) = update.get("message") {
        let user_id = message.pointer("/from/id")?.as_i64()?;
        let chat_id = message.pointer("/chat/id")?.as_i64()?;
        let text = message.get("text")?.as_str()?;

        let kind = match parse_command(text) {
            Some(command) => EventKind::Command(command),
            None => EventKind::Text(text.to_string()),
        };

        let mut event = InboundEvent::new(user_id, chat_id, kind);
        if let Some(username) = message.pointer("/from/username").and_then(|u| u.as_str()) {
            event = event.with_username(username);
        }
        return Some(event);
    }

    if let Some(query) = update.get("callback_query") {
        let user_id = query.pointer("/from/id")?.as_i64()?;
        let token = query.get("data")?.as_str()?;
        let chat_id = query.pointer("/message/chat/id")?.as_i64()?;
        let message_id = query.pointer("/message/message_id")?.as_i64()?;

        let mut event = InboundEvent::new(
            user_id,
            chat_id,
            EventKind::ButtonPress {
                token: token.to_string(),
                message: MessageRef {
                    chat_id,
                    message_id,
                },
            },
        );
        if let Some(username) = query.pointer("/from/username").and_then(|u| u.as_str()) {
            event = event.with_username(username);
        }
        return Some(event);
    }

    None
}

/// Parse a slash command: `/start@my_bot arg` → `start`. Returns `None`
/// for ordinary text.
fn parse_command(text: &str) -> Option<String> {
    let rest = text.strip_prefix('/')?;
    let word = rest.split_whitespace().next()?;
    let name = word.split('@').next()?;
    if name.is_empty() {
        return None;
    }
    Some(name.to_ascii_lowercase())
}

/// Serialize a [`Markup`] grid into Telegram's `inline_keyboard` shape.
fn markup_json(markup: &Markup) -> serde_json::Value {
    let rows: Vec<serde_json::Value> = markup
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| json!({ "text": b.label, "callback_data": b.token }))
                .collect()
        })
        .collect();
    json!({ "inline_keyboard": rows })
}

/// Escape every character MarkdownV2 treats as markup.
///
/// The final channel post is free text including user-supplied content, so
/// everything special is escaped before sending.
pub fn escape_markdown_v2(text: &str) -> String {
    const SPECIAL: &[char] = &[
        '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
    ];
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if SPECIAL.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Split a message into chunks that fit Telegram's character limit.
/// Tries to split on newlines, then spaces, then hard-cuts.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let chunk = &remaining[..max_len];
        let split_at = chunk
            .rfind('\n')
            .or_else(|| chunk.rfind(' '))
            .unwrap_or(max_len);

        // Don't split at position 0 (infinite loop guard)
        let split_at = if split_at == 0 { max_len } else { split_at };

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}

// ── Tests ───────────────────────────────────────────────────────────
