//! Environment-driven configuration and startup text loading.

use std::path::PathBuf;

use chrono_tz::Tz;
use secrecy::SecretString;

use crate::error::ConfigError;
use crate::messages::{AdTemplate, BotTexts, MessageCatalog};

const DEFAULT_DB_PATH: &str = "./data/hamsafar.db";
const DEFAULT_TIMEZONE: &str = "Asia/Baku";
const DEFAULT_TEMPLATE_DIR: &str = "./templates";

/// Bot configuration, read once at process start.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Telegram Bot API token.
    pub bot_token: SecretString,
    /// Publish target: numeric channel id (`-100…`) or `@channel_name`.
    pub channel_target: String,
    /// Location of the libSQL ad database.
    pub db_path: PathBuf,
    /// Timezone used to decide "today" for the calendar.
    pub timezone: Tz,
    /// Directory holding messages.json and the two ad templates.
    pub template_dir: PathBuf,
}

impl BotConfig {
    /// Read configuration from the environment. `.env` loading is the
    /// caller's concern (dotenvy in `main`).
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token = SecretString::from(require_env("HAMSAFAR_BOT_TOKEN")?);
        let channel_target = require_env("HAMSAFAR_CHANNEL")?;

        let db_path = std::env::var("HAMSAFAR_DB_PATH")
            .unwrap_or_else(|_| DEFAULT_DB_PATH.to_string())
            .into();

        let tz_name =
            std::env::var("HAMSAFAR_TIMEZONE").unwrap_or_else(|_| DEFAULT_TIMEZONE.to_string());
        let timezone: Tz = tz_name.parse().map_err(|_| ConfigError::InvalidValue {
            key: "HAMSAFAR_TIMEZONE".to_string(),
            message: format!("'{tz_name}' is not an IANA timezone name"),
        })?;

        let template_dir = std::env::var("HAMSAFAR_TEMPLATE_DIR")
            .unwrap_or_else(|_| DEFAULT_TEMPLATE_DIR.to_string())
            .into();

        Ok(Self {
            bot_token,
            channel_target,
            db_path,
            timezone,
            template_dir,
        })
    }

    /// Load the message catalog and both ad templates from `template_dir`.
    ///
    /// Missing catalog keys and unknown template placeholders fail here,
    /// at startup, not mid-dialog.
    pub fn load_texts(&self) -> Result<BotTexts, ConfigError> {
        let catalog_path = self.template_dir.join("messages.json");
        let raw = std::fs::read_to_string(&catalog_path)?;
        let catalog: MessageCatalog =
            serde_json::from_str(&raw).map_err(|e| ConfigError::ParseError {
                path: catalog_path.display().to_string(),
                message: e.to_string(),
            })?;

        let preview = self.load_template("preview_template.txt")?;
        let post = self.load_template("message_template.txt")?;

        Ok(BotTexts {
            catalog,
            preview,
            post,
        })
    }

    fn load_template(&self, file_name: &str) -> Result<AdTemplate, ConfigError> {
        let path = self.template_dir.join(file_name);
        let raw = std::fs::read_to_string(&path)?;
        AdTemplate::parse(&raw).map_err(|source| ConfigError::Template {
            path: path.display().to_string(),
            source,
        })
    }
}

fn require_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}
