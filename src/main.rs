use std::sync::Arc;

use futures::StreamExt;
use secrecy::ExposeSecret;

use hamsafar::config::BotConfig;
use hamsafar::dialog::{Dialog, DialogDeps};
use hamsafar::gateway::{Gateway, TelegramGateway};
use hamsafar::publisher::TelegramPublisher;
use hamsafar::session::SessionStore;
use hamsafar::store::LibSqlAdStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BotConfig::from_env()?;
    let texts = config.load_texts()?;

    eprintln!("✈️  Hamsafar v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Channel: {}", config.channel_target);
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!("   Timezone: {}", config.timezone);
    eprintln!("   Templates: {}\n", config.template_dir.display());

    let repository = Arc::new(LibSqlAdStore::new_local(&config.db_path).await?);

    let bot_token = config.bot_token.expose_secret().to_string();
    let gateway = Arc::new(TelegramGateway::new(bot_token.clone()));
    let publisher = Arc::new(TelegramPublisher::new(bot_token));

    let deps = DialogDeps {
        gateway: gateway.clone(),
        repository,
        publisher,
    };
    let dialog = Dialog::new(
        deps,
        SessionStore::new(),
        texts,
        config.channel_target,
        config.timezone,
    );

    let mut events = gateway.start().await?;
    while let Some(event) = events.next().await {
        let user_id = event.user_id;
        if let Err(e) = dialog.handle_event(event).await {
            tracing::error!(user_id, "Event handling failed: {e}");
        }
    }

    Ok(())
}
