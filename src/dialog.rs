//! Dialog state machine — drives the ad-posting conversation.
//!
//! Every inbound event is dispatched on its (state, event-kind) pair; all
//! session mutation happens here, through the transition methods on
//! [`Session`]. Unrouted combinations are ignored and never advance state.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;

use crate::calendar::{self, CalendarAction, Month};
use crate::error::Result;
use crate::gateway::telegram::escape_markdown_v2;
use crate::gateway::{Button, EventKind, Gateway, InboundEvent, Markup, MessageRef};
use crate::messages::{AdFields, BotTexts};
use crate::publisher::Publisher;
use crate::session::{DialogState, Session, SessionStore};
use crate::store::{AdRepository, NewAd};

// Button tokens wired to fixed dialog choices.
const ROLE_PASSENGER: &str = "role_passenger";
const ROLE_CARGO: &str = "role_cargo";
const CONFIRM_YES: &str = "confirm_yes";
const CONFIRM_NO: &str = "confirm_no";

const START_COMMAND: &str = "start";
const CANCEL_COMMAND: &str = "cancel";

/// External collaborators the dialog machine talks to.
pub struct DialogDeps {
    pub gateway: Arc<dyn Gateway>,
    pub repository: Arc<dyn AdRepository>,
    pub publisher: Arc<dyn Publisher>,
}

/// The ad-posting dialog machine. One instance serves all users; per-user
/// progress lives in the owned [`SessionStore`].
pub struct Dialog {
    gateway: Arc<dyn Gateway>,
    repository: Arc<dyn AdRepository>,
    publisher: Arc<dyn Publisher>,
    sessions: SessionStore,
    texts: BotTexts,
    channel_target: String,
    timezone: Tz,
}

impl Dialog {
    pub fn new(
        deps: DialogDeps,
        sessions: SessionStore,
        texts: BotTexts,
        channel_target: String,
        timezone: Tz,
    ) -> Self {
        Self {
            gateway: deps.gateway,
            repository: deps.repository,
            publisher: deps.publisher,
            sessions,
            texts,
            channel_target,
            timezone,
        }
    }

    /// Snapshot of a user's session (inspection/testing).
    pub async fn session(&self, user_id: i64) -> Session {
        self.sessions.get(user_id).await
    }

    /// Handle one inbound event to completion.
    ///
    /// Storage, publish, and gateway failures bubble up with the session
    /// left as-is, so nothing collected is lost and the caller can log
    /// and retry without redesign.
    pub async fn handle_event(&self, event: InboundEvent) -> Result<()> {
        // Commands route before state dispatch: cancel must work everywhere.
        if let EventKind::Command(command) = &event.kind {
            return match command.as_str() {
                START_COMMAND => self.handle_start(&event).await,
                CANCEL_COMMAND => self.handle_cancel(&event).await,
                _ => {
                    tracing::debug!(command = %command, "Ignoring unknown command");
                    Ok(())
                }
            };
        }

        let state = self.sessions.get(event.user_id).await.state;
        match (state, &event.kind) {
            (DialogState::ChoosingRole, EventKind::ButtonPress { token, message }) => {
                self.handle_role(&event, token, *message).await
            }
            (DialogState::TypingSource, EventKind::Text(text)) => {
                self.handle_source(&event, text).await
            }
            (DialogState::TypingDestination, EventKind::Text(text)) => {
                self.handle_destination(&event, text).await
            }
            (DialogState::SelectingDate, EventKind::ButtonPress { token, message }) => {
                self.handle_date(&event, token, *message).await
            }
            (DialogState::TypingDescription, EventKind::Text(text)) => {
                self.handle_description(&event, text).await
            }
            (DialogState::Confirmation, EventKind::ButtonPress { token, message }) => {
                self.handle_confirmation(&event, token, *message).await
            }
            _ => {
                tracing::debug!(
                    user_id = event.user_id,
                    state = %state,
                    "Ignoring unrouted event"
                );
                Ok(())
            }
        }
    }

    // ── Entry and fallback ──────────────────────────────────────────

    /// `/start` — wipe any in-flight session and offer the role choice.
    async fn handle_start(&self, event: &InboundEvent) -> Result<()> {
        self.sessions.reset(event.user_id).await;

        let markup = Markup::single_row(vec![
            Button::new(&self.texts.catalog.button_passenger, ROLE_PASSENGER),
            Button::new(&self.texts.catalog.button_cargo, ROLE_CARGO),
        ]);
        self.gateway
            .send_text(event.chat_id, &self.texts.catalog.welcome, Some(&markup))
            .await?;
        Ok(())
    }

    /// `/cancel` — always available, regardless of current state.
    async fn handle_cancel(&self, event: &InboundEvent) -> Result<()> {
        self.gateway
            .send_text(event.chat_id, &self.texts.catalog.operation_cancelled, None)
            .await?;
        self.sessions.remove(event.user_id).await;
        Ok(())
    }

    // ── Step handlers ───────────────────────────────────────────────

    async fn handle_role(
        &self,
        event: &InboundEvent,
        token: &str,
        message: MessageRef,
    ) -> Result<()> {
        let role = match token {
            ROLE_PASSENGER => &self.texts.catalog.button_passenger,
            ROLE_CARGO => &self.texts.catalog.button_cargo,
            // Only the two known choices are wired; anything else is not
            // routed here.
            _ => {
                tracing::debug!(token = %token, "Ignoring unknown role token");
                return Ok(());
            }
        };
        let role = role.clone();

        self.gateway
            .edit_text(message, &self.texts.catalog.prompt_source, None)
            .await?;
        self.sessions
            .update(event.user_id, |s| s.choose_role(&role))
            .await;
        Ok(())
    }

    async fn handle_source(&self, event: &InboundEvent, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            self.gateway
                .send_text(event.chat_id, &self.texts.catalog.invalid_source, None)
                .await?;
            return Ok(());
        }

        self.gateway
            .send_text(event.chat_id, &self.texts.catalog.prompt_destination, None)
            .await?;
        self.sessions
            .update(event.user_id, |s| s.set_source(text))
            .await;
        Ok(())
    }

    async fn handle_destination(&self, event: &InboundEvent, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            self.gateway
                .send_text(event.chat_id, &self.texts.catalog.invalid_destination, None)
                .await?;
            return Ok(());
        }

        let today = self.today();
        let markup = calendar::build_calendar(Month::of(today), today);

        self.gateway
            .send_text(event.chat_id, &self.texts.catalog.prompt_calendar, None)
            .await?;
        self.gateway
            .send_text(
                event.chat_id,
                &self.texts.catalog.calendar_label_current,
                Some(&markup),
            )
            .await?;
        self.sessions
            .update(event.user_id, |s| s.set_destination(text))
            .await;
        Ok(())
    }

    async fn handle_date(
        &self,
        event: &InboundEvent,
        token: &str,
        message: MessageRef,
    ) -> Result<()> {
        match CalendarAction::parse(token) {
            Some(CalendarAction::Day(date)) => {
                let iso = date.format("%Y-%m-%d").to_string();
                self.gateway
                    .edit_text(message, &self.texts.catalog.date_selected_text(&iso), None)
                    .await?;
                self.gateway
                    .send_text(event.chat_id, &self.texts.catalog.prompt_description, None)
                    .await?;
                self.sessions
                    .update(event.user_id, |s| s.set_flight_date(&iso))
                    .await;
                Ok(())
            }
            Some(CalendarAction::Goto(month)) => {
                // All navigation state rides in the token; just re-render.
                let markup = calendar::build_calendar(month, self.today());
                self.gateway.edit_markup(message, &markup).await?;
                Ok(())
            }
            Some(CalendarAction::Ignore) => Ok(()),
            None => {
                tracing::debug!(token = %token, "Ignoring unknown calendar token");
                Ok(())
            }
        }
    }

    async fn handle_description(&self, event: &InboundEvent, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            self.gateway
                .send_text(event.chat_id, &self.texts.catalog.invalid_description, None)
                .await?;
            return Ok(());
        }

        let session = self.sessions.get(event.user_id).await;
        let author = resolve_author(event);
        let fields = AdFields {
            role: session.collected_role()?,
            source: session.collected_source()?,
            destination: session.collected_destination()?,
            flight_date: session.collected_flight_date()?,
            description: text,
            user_id: &author,
        };
        let preview = self.texts.preview.render(&fields)?;

        let markup = Markup::single_row(vec![
            Button::new(&self.texts.catalog.button_yes, CONFIRM_YES),
            Button::new(&self.texts.catalog.button_no, CONFIRM_NO),
        ]);
        self.gateway
            .send_text(event.chat_id, &preview, Some(&markup))
            .await?;
        self.sessions
            .update(event.user_id, |s| s.set_description(text))
            .await;
        Ok(())
    }

    async fn handle_confirmation(
        &self,
        event: &InboundEvent,
        token: &str,
        message: MessageRef,
    ) -> Result<()> {
        match token {
            CONFIRM_NO => {
                self.gateway
                    .edit_text(message, &self.texts.catalog.cancelled_no_send, None)
                    .await?;
                self.sessions.remove(event.user_id).await;
                Ok(())
            }
            CONFIRM_YES => self.publish_ad(event, message).await,
            _ => {
                tracing::debug!(token = %token, "Ignoring unknown confirmation token");
                Ok(())
            }
        }
    }

    /// The terminal confirm=yes transition: persist, render, escape,
    /// publish, notify, clear. Any failure leaves the session untouched.
    async fn publish_ad(&self, event: &InboundEvent, message: MessageRef) -> Result<()> {
        let session = self.sessions.get(event.user_id).await;
        // The persisted author is the confirm-time resolution, even if the
        // identity changed since the preview.
        let author = resolve_author(event);
        let fields = AdFields {
            role: session.collected_role()?,
            source: session.collected_source()?,
            destination: session.collected_destination()?,
            flight_date: session.collected_flight_date()?,
            description: session.collected_description()?,
            user_id: &author,
        };

        let ad = NewAd {
            role: fields.role.to_string(),
            source: fields.source.to_string(),
            destination: fields.destination.to_string(),
            flight_date: fields.flight_date.to_string(),
            description: fields.description.to_string(),
            author: author.clone(),
        };
        let record = self.repository.insert(&ad).await?;

        let post = self.texts.post.render(&fields)?;
        let safe_text = escape_markdown_v2(&post);
        self.publisher
            .publish(&self.channel_target, &safe_text)
            .await?;

        self.gateway
            .edit_text(message, &self.texts.catalog.success_posted, None)
            .await?;
        self.sessions.remove(event.user_id).await;

        tracing::info!(ad_id = %record.id, author = %record.author, "Ad confirmed and published");
        Ok(())
    }

    /// Current date in the configured display timezone.
    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }
}

/// Public handle if the user has one, otherwise the numeric id as text.
/// Deterministic: preview and confirm resolve through this same function.
fn resolve_author(event: &InboundEvent) -> String {
    match event.username.as_deref() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => event.user_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_event(username: Option<&str>) -> InboundEvent {
        let mut event = InboundEvent::new(42, 42, EventKind::Text("hi".into()));
        if let Some(name) = username {
            event = event.with_username(name);
        }
        event
    }

    #[test]
    fn author_prefers_public_handle() {
        assert_eq!(resolve_author(&text_event(Some("traveler"))), "traveler");
    }

    #[test]
    fn author_falls_back_to_numeric_id() {
        assert_eq!(resolve_author(&text_event(None)), "42");
        assert_eq!(resolve_author(&text_event(Some(""))), "42");
    }
}
