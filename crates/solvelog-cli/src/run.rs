//! The `run` subcommand: wire the store, the Discord channel, and the
//! reminder scheduler together, then wait for ctrl-c.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use solvelog_channel_discord::DiscordChannel;
use solvelog_reminder::{Notifier, ReminderScheduler};
use solvelog_store::ActivityStore;
use solvelog_tracker::Tracker;

pub async fn run_bot(config_path: Option<PathBuf>, db_override: Option<PathBuf>) -> anyhow::Result<()> {
    let config = match &config_path {
        Some(path) => solvelog_config::load_config_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => solvelog_config::load_config().unwrap_or_default(),
    };

    let token = config.bot_token()?;
    let db_path = match db_override {
        Some(path) => path,
        None => config.database_path()?,
    };

    let store = Arc::new(ActivityStore::open(&db_path)?);
    let tracker = Arc::new(Tracker::new(store.clone()));

    let channel = Arc::new(DiscordChannel::new(
        token,
        config.discord.command_prefix.clone(),
        tracker,
    ));

    let notifier: Arc<dyn Notifier> = channel.clone();
    let scheduler = Arc::new(ReminderScheduler::with_period(
        store,
        notifier,
        Duration::from_secs(config.reminder.tick_seconds),
    ));

    channel.start().await?;
    // Ticking begins once the gateway reports ready
    scheduler.start(channel.ready_signal()).await?;

    info!("solvelog running, press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;

    info!("Shutting down");
    scheduler.stop().await;
    channel.stop().await?;

    Ok(())
}
