//! Dialog session state — tracks which step of the ad dialog a user is in.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::ContractError;

/// The steps of the ad-posting dialog.
///
/// Progresses linearly: ChoosingRole → TypingSource → TypingDestination →
/// SelectingDate → TypingDescription → Confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogState {
    ChoosingRole,
    TypingSource,
    TypingDestination,
    SelectingDate,
    TypingDescription,
    Confirmation,
}

impl DialogState {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: DialogState) -> bool {
        use DialogState::*;
        matches!(
            (self, target),
            (ChoosingRole, TypingSource)
                | (TypingSource, TypingDestination)
                | (TypingDestination, SelectingDate)
                | (SelectingDate, TypingDescription)
                | (TypingDescription, Confirmation)
        )
    }

    /// Get the next step in the linear progression, if any.
    pub fn next(&self) -> Option<DialogState> {
        use DialogState::*;
        match self {
            ChoosingRole => Some(TypingSource),
            TypingSource => Some(TypingDestination),
            TypingDestination => Some(SelectingDate),
            SelectingDate => Some(TypingDescription),
            TypingDescription => Some(Confirmation),
            Confirmation => None,
        }
    }
}

impl Default for DialogState {
    fn default() -> Self {
        Self::ChoosingRole
    }
}

impl std::fmt::Display for DialogState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ChoosingRole => "choosing_role",
            Self::TypingSource => "typing_source",
            Self::TypingDestination => "typing_destination",
            Self::SelectingDate => "selecting_date",
            Self::TypingDescription => "typing_description",
            Self::Confirmation => "confirmation",
        };
        write!(f, "{s}")
    }
}

/// In-progress ad data for one user.
///
/// Fields are populated strictly in dialog order, and only through the
/// transition methods below: a field is `Some` only once the step that
/// collects it has been passed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub state: DialogState,
    pub role: Option<String>,
    pub source: Option<String>,
    pub destination: Option<String>,
    pub flight_date: Option<String>,
    pub description: Option<String>,
}

impl Session {
    /// Store the chosen role and move on to collecting the origin.
    pub fn choose_role(&mut self, role: &str) {
        self.role = Some(role.to_string());
        self.state = DialogState::TypingSource;
    }

    /// Store the origin and move on to collecting the destination.
    pub fn set_source(&mut self, source: &str) {
        self.source = Some(source.to_string());
        self.state = DialogState::TypingDestination;
    }

    /// Store the destination and move on to date selection.
    pub fn set_destination(&mut self, destination: &str) {
        self.destination = Some(destination.to_string());
        self.state = DialogState::SelectingDate;
    }

    /// Store the ISO flight date and move on to the description.
    pub fn set_flight_date(&mut self, flight_date: &str) {
        self.flight_date = Some(flight_date.to_string());
        self.state = DialogState::TypingDescription;
    }

    /// Store the description and move on to the final confirmation.
    pub fn set_description(&mut self, description: &str) {
        self.description = Some(description.to_string());
        self.state = DialogState::Confirmation;
    }

    // ── Collected-field access ──────────────────────────────────────
    //
    // Reading a field that the ordering invariant guarantees is populated.
    // A `None` here is a broken invariant, surfaced loudly instead of
    // rendering blanks.

    pub fn collected_role(&self) -> Result<&str, ContractError> {
        Self::collected(self.state, "role", &self.role)
    }

    pub fn collected_source(&self) -> Result<&str, ContractError> {
        Self::collected(self.state, "source", &self.source)
    }

    pub fn collected_destination(&self) -> Result<&str, ContractError> {
        Self::collected(self.state, "destination", &self.destination)
    }

    pub fn collected_flight_date(&self) -> Result<&str, ContractError> {
        Self::collected(self.state, "flight_date", &self.flight_date)
    }

    pub fn collected_description(&self) -> Result<&str, ContractError> {
        Self::collected(self.state, "description", &self.description)
    }

    fn collected<'a>(
        state: DialogState,
        field: &'static str,
        value: &'a Option<String>,
    ) -> Result<&'a str, ContractError> {
        value
            .as_deref()
            .ok_or(ContractError::MissingField { state, field })
    }
}

/// Keyed store of in-progress sessions, one per user identifier.
///
/// The dialog machine is the sole mutator. Per-key access goes through the
/// async lock, so concurrent users never observe each other's state.
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: RwLock<HashMap<i64, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the user's session; a default session if none exists.
    pub async fn get(&self, user_id: i64) -> Session {
        self.inner
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Reset the user to a clean default session (entry command).
    pub async fn reset(&self, user_id: i64) {
        self.inner.write().await.insert(user_id, Session::default());
    }

    /// Drop the user's session entirely (terminal transitions).
    pub async fn remove(&self, user_id: i64) {
        self.inner.write().await.remove(&user_id);
    }

    /// Mutate the user's session in place, creating a default one if absent.
    pub async fn update<F>(&self, user_id: i64, f: F)
    where
        F: FnOnce(&mut Session),
    {
        let mut sessions = self.inner.write().await;
        f(sessions.entry(user_id).or_default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_transitions() {
        use DialogState::*;
        let transitions = [
            (ChoosingRole, TypingSource),
            (TypingSource, TypingDestination),
            (TypingDestination, SelectingDate),
            (SelectingDate, TypingDescription),
            (TypingDescription, Confirmation),
        ];
        for (from, to) in transitions {
            assert!(
                from.can_transition_to(to),
                "{from} should transition to {to}"
            );
        }
    }

    #[test]
    fn invalid_transitions() {
        use DialogState::*;
        // Skip steps
        assert!(!ChoosingRole.can_transition_to(SelectingDate));
        assert!(!TypingSource.can_transition_to(Confirmation));
        // Go backward
        assert!(!SelectingDate.can_transition_to(TypingSource));
        // Terminal
        assert!(!Confirmation.can_transition_to(ChoosingRole));
        // Self-transition
        assert!(!TypingSource.can_transition_to(TypingSource));
    }

    #[test]
    fn next_walks_all_states() {
        use DialogState::*;
        let expected = [
            TypingSource,
            TypingDestination,
            SelectingDate,
            TypingDescription,
            Confirmation,
        ];
        let mut current = ChoosingRole;
        for expected_next in expected {
            let next = current.next().unwrap();
            assert_eq!(next, expected_next);
            current = next;
        }
        assert!(current.next().is_none());
    }

    #[test]
    fn display_matches_serde() {
        use DialogState::*;
        for state in [
            ChoosingRole,
            TypingSource,
            TypingDestination,
            SelectingDate,
            TypingDescription,
            Confirmation,
        ] {
            let display = format!("{state}");
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(
                format!("\"{display}\""),
                json,
                "Display and serde should match for {state:?}"
            );
        }
    }

    /// description ⊃ flight_date ⊃ destination ⊃ source ⊃ role: each field
    /// is populated only after everything before it.
    #[test]
    fn transition_methods_preserve_population_ordering() {
        fn assert_ordering(s: &Session) {
            if s.description.is_some() {
                assert!(s.flight_date.is_some());
            }
            if s.flight_date.is_some() {
                assert!(s.destination.is_some());
            }
            if s.destination.is_some() {
                assert!(s.source.is_some());
            }
            if s.source.is_some() {
                assert!(s.role.is_some());
            }
        }

        let mut session = Session::default();
        assert_ordering(&session);
        session.choose_role("Passenger");
        assert_ordering(&session);
        session.set_source("Baku");
        assert_ordering(&session);
        session.set_destination("Istanbul");
        assert_ordering(&session);
        session.set_flight_date("2025-07-10");
        assert_ordering(&session);
        session.set_description("2 bags, flexible dates");
        assert_ordering(&session);
        assert_eq!(session.state, DialogState::Confirmation);
    }

    #[test]
    fn collected_field_fails_loudly_when_absent() {
        let session = Session::default();
        let err = session.collected_role().unwrap_err();
        assert!(err.to_string().contains("role"));

        let mut session = Session::default();
        session.choose_role("Cargo");
        assert_eq!(session.collected_role().unwrap(), "Cargo");
        assert!(session.collected_description().is_err());
    }

    #[tokio::test]
    async fn store_get_returns_default_for_unknown_user() {
        let store = SessionStore::new();
        assert_eq!(store.get(42).await, Session::default());
    }

    #[tokio::test]
    async fn store_update_then_get_roundtrip() {
        let store = SessionStore::new();
        store.update(42, |s| s.choose_role("Passenger")).await;
        let session = store.get(42).await;
        assert_eq!(session.state, DialogState::TypingSource);
        assert_eq!(session.role.as_deref(), Some("Passenger"));
        // Other users are unaffected
        assert_eq!(store.get(43).await, Session::default());
    }

    #[tokio::test]
    async fn store_reset_clears_to_default() {
        let store = SessionStore::new();
        store.update(42, |s| s.choose_role("Passenger")).await;
        store.reset(42).await;
        assert_eq!(store.get(42).await, Session::default());
    }

    #[tokio::test]
    async fn store_remove_then_get_starts_clean() {
        let store = SessionStore::new();
        store.update(42, |s| s.choose_role("Passenger")).await;
        store.remove(42).await;
        assert_eq!(store.get(42).await, Session::default());
    }
}
