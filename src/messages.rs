//! User-facing text: the fixed message catalog and the two ad templates.

use serde::Deserialize;

use crate::error::TemplateError;

/// The fixed set of user-facing strings, loaded once from `messages.json`.
///
/// Deserialization fails on a missing or unknown key, so a hole in the
/// catalog is caught at startup rather than mid-dialog.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageCatalog {
    pub welcome: String,
    pub button_passenger: String,
    pub button_cargo: String,
    pub prompt_source: String,
    pub invalid_source: String,
    pub prompt_destination: String,
    pub invalid_destination: String,
    pub prompt_calendar: String,
    pub calendar_label_current: String,
    pub date_selected: String,
    pub prompt_description: String,
    pub invalid_description: String,
    pub button_yes: String,
    pub button_no: String,
    pub cancelled_no_send: String,
    pub success_posted: String,
    pub operation_cancelled: String,
}

impl MessageCatalog {
    /// Fill the `{flight_date}` placeholder in the date-selected text.
    pub fn date_selected_text(&self, flight_date: &str) -> String {
        self.date_selected.replace("{flight_date}", flight_date)
    }
}

/// The six fields every ad template is rendered from.
///
/// All fields are mandatory by construction, so a template can never
/// observe a missing value.
#[derive(Debug, Clone, Copy)]
pub struct AdFields<'a> {
    pub role: &'a str,
    pub source: &'a str,
    pub destination: &'a str,
    pub flight_date: &'a str,
    pub description: &'a str,
    pub user_id: &'a str,
}

impl AdFields<'_> {
    fn get(&self, name: &str) -> Option<&str> {
        match name {
            "role" => Some(self.role),
            "source" => Some(self.source),
            "destination" => Some(self.destination),
            "flight_date" => Some(self.flight_date),
            "description" => Some(self.description),
            "user_id" => Some(self.user_id),
            _ => None,
        }
    }
}

const EMPTY_FIELDS: AdFields<'static> = AdFields {
    role: "",
    source: "",
    destination: "",
    flight_date: "",
    description: "",
    user_id: "",
};

/// A free-text template with `{name}` placeholders drawn from [`AdFields`].
#[derive(Debug, Clone)]
pub struct AdTemplate {
    raw: String,
}

impl AdTemplate {
    /// Parse a template, rejecting placeholders outside the known six.
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        substitute(raw, &EMPTY_FIELDS)?;
        Ok(Self {
            raw: raw.to_string(),
        })
    }

    /// Substitute every placeholder from `fields`.
    pub fn render(&self, fields: &AdFields<'_>) -> Result<String, TemplateError> {
        substitute(&self.raw, fields)
    }
}

fn substitute(raw: &str, fields: &AdFields<'_>) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('}').ok_or(TemplateError::Unterminated)?;
        let name = &after[..end];
        let value = fields.get(name).ok_or_else(|| TemplateError::UnknownPlaceholder {
            name: name.to_string(),
        })?;
        out.push_str(value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// All user-facing text loaded at startup.
#[derive(Debug, Clone)]
pub struct BotTexts {
    pub catalog: MessageCatalog,
    /// Preview shown to the author before confirming.
    pub preview: AdTemplate,
    /// Final text published to the channel.
    pub post: AdTemplate,
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: AdFields<'static> = AdFields {
        role: "Passenger",
        source: "Baku",
        destination: "Istanbul",
        flight_date: "2025-07-10",
        description: "2 bags, flexible dates",
        user_id: "traveler",
    };

    #[test]
    fn render_fills_all_six_fields() {
        let template = AdTemplate::parse(
            "{role} from {source} to {destination} on {flight_date}: {description} (by {user_id})",
        )
        .unwrap();
        assert_eq!(
            template.render(&FIELDS).unwrap(),
            "Passenger from Baku to Istanbul on 2025-07-10: 2 bags, flexible dates (by traveler)"
        );
    }

    #[test]
    fn repeated_placeholders_are_all_filled() {
        let template = AdTemplate::parse("{source} -> {destination} -> {source}").unwrap();
        assert_eq!(template.render(&FIELDS).unwrap(), "Baku -> Istanbul -> Baku");
    }

    #[test]
    fn template_without_placeholders_passes_through() {
        let template = AdTemplate::parse("plain text").unwrap();
        assert_eq!(template.render(&FIELDS).unwrap(), "plain text");
    }

    #[test]
    fn unknown_placeholder_rejected_at_parse_time() {
        let err = AdTemplate::parse("hello {nme}").unwrap_err();
        assert!(matches!(err, TemplateError::UnknownPlaceholder { name } if name == "nme"));
    }

    #[test]
    fn unterminated_placeholder_rejected() {
        assert!(matches!(
            AdTemplate::parse("hello {role"),
            Err(TemplateError::Unterminated)
        ));
    }

    #[test]
    fn catalog_rejects_missing_keys() {
        let err = serde_json::from_str::<MessageCatalog>(r#"{"welcome": "hi"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn catalog_rejects_unknown_keys() {
        let mut value = full_catalog_json();
        value["surprise"] = serde_json::json!("nope");
        assert!(serde_json::from_value::<MessageCatalog>(value).is_err());
    }

    #[test]
    fn catalog_deserializes_full_set() {
        let catalog: MessageCatalog = serde_json::from_value(full_catalog_json()).unwrap();
        assert_eq!(catalog.button_passenger, "Passenger");
        assert_eq!(
            catalog.date_selected_text("2025-07-10"),
            "Selected date: 2025-07-10"
        );
    }

    fn full_catalog_json() -> serde_json::Value {
        serde_json::json!({
            "welcome": "Welcome! Who are you?",
            "button_passenger": "Passenger",
            "button_cargo": "I have cargo",
            "prompt_source": "Where are you flying from?",
            "invalid_source": "Please enter a non-empty origin.",
            "prompt_destination": "Where are you flying to?",
            "invalid_destination": "Please enter a non-empty destination.",
            "prompt_calendar": "Pick your flight date:",
            "calendar_label_current": "Current month",
            "date_selected": "Selected date: {flight_date}",
            "prompt_description": "Describe your trip.",
            "invalid_description": "Please enter a non-empty description.",
            "button_yes": "Yes",
            "button_no": "No",
            "cancelled_no_send": "Okay, nothing was posted.",
            "success_posted": "Your ad has been posted!",
            "operation_cancelled": "Operation cancelled."
        })
    }
}
