#![allow(clippy::result_large_err)]

use charity_hub::{
    bot::{self, BotData},
    config::{database, settings},
    errors::Result,
    http::{self, AppState},
    notify::{self, DiscordNotifier, Dispatcher, LogNotifier},
};
use dotenvy::dotenv;
use std::{env, sync::Arc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load settings (config.toml plus env overrides)
    let settings = Arc::new(
        settings::load_default_settings()
            .inspect_err(|e| error!("Failed to load settings: {}", e))?,
    );

    // 4. Connect, create tables, and rebuild the fund ledger
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Start the notification dispatcher
    let token = env::var("DISCORD_BOT_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty());
    let admin_channel = settings.notifications.admin_channel_id.clone();
    let (events, rx) = notify::channel();
    let dispatcher = if let Some(token) = &token {
        tokio::spawn(Dispatcher::new(DiscordNotifier::new(token), admin_channel).run(rx))
    } else {
        warn!("DISCORD_BOT_TOKEN not set; notifications will only be logged");
        tokio::spawn(Dispatcher::new(LogNotifier, admin_channel).run(rx))
    };

    // 6. Serve the HTTP API, alongside the Discord bot when a token is present
    let state = AppState {
        db: db.clone(),
        events: events.clone(),
        settings: Arc::clone(&settings),
    };

    if let Some(token) = token {
        let data = BotData::new(db, events, settings);
        tokio::select! {
            served = http::serve(state) => served?,
            bot = bot::run_bot(token, data) => bot?,
        }
    } else {
        drop(events);
        http::serve(state).await?;
    }

    // 7. Let queued notifications go out before exiting
    if let Err(e) = dispatcher.await {
        warn!("Notification dispatcher ended abnormally: {}", e);
    }
    Ok(())
}
