//! Messaging gateway abstraction for dialog I/O.

pub mod telegram;

pub use telegram::TelegramGateway;

use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::Stream;

use crate::error::GatewayError;

/// Stream of inbound events produced by a gateway.
pub type EventStream = Pin<Box<dyn Stream<Item = InboundEvent> + Send>>;

/// Reference to a previously sent message, for in-place edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i64,
}

/// What the user did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Plain text message.
    Text(String),
    /// Slash command, lowercased, without the leading slash.
    Command(String),
    /// Inline button press carrying its token and the message it sits on.
    ButtonPress { token: String, message: MessageRef },
}

/// An inbound event tagged with the user who produced it.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub user_id: i64,
    pub chat_id: i64,
    /// Public handle, if the user has one.
    pub username: Option<String>,
    pub kind: EventKind,
}

impl InboundEvent {
    pub fn new(user_id: i64, chat_id: i64, kind: EventKind) -> Self {
        Self {
            user_id,
            chat_id,
            username: None,
            kind,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

/// One clickable cell in an inline keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub token: String,
}

impl Button {
    pub fn new(label: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            token: token.into(),
        }
    }
}

/// A grid of clickable rows attached to an outbound message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Markup {
    pub rows: Vec<Vec<Button>>,
}

impl Markup {
    pub fn new(rows: Vec<Vec<Button>>) -> Self {
        Self { rows }
    }

    pub fn single_row(buttons: Vec<Button>) -> Self {
        Self {
            rows: vec![buttons],
        }
    }
}

/// Transport seam the dialog machine talks through.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Start delivering inbound events.
    async fn start(&self) -> Result<EventStream, GatewayError>;

    /// Send a new message to a chat, optionally with an inline keyboard.
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        markup: Option<&Markup>,
    ) -> Result<(), GatewayError>;

    /// Replace the text (and markup) of a previously sent message.
    async fn edit_text(
        &self,
        message: MessageRef,
        text: &str,
        markup: Option<&Markup>,
    ) -> Result<(), GatewayError>;

    /// Replace only the inline keyboard of a previously sent message.
    async fn edit_markup(&self, message: MessageRef, markup: &Markup) -> Result<(), GatewayError>;
}
