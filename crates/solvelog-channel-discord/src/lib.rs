//! Discord channel for the solved-problem tracker.
//!
//! Presentation glue only: connects to the Discord gateway with serenity,
//! parses `!`-prefix text commands into tracker calls, and delivers reminder
//! direct messages for the scheduler via the `Notifier` trait. The core
//! never depends on anything in this crate.

pub mod handler;

use std::sync::Arc;

use anyhow::{Context as _, bail};
use serenity::Client;
use serenity::all::{GatewayIntents, Http, UserId};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::info;

use solvelog_reminder::Notifier;
use solvelog_tracker::Tracker;

/// Lifecycle state of the Discord connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelStatus {
    Stopped,
    Starting,
    Running,
}

/// Owns the serenity client lifecycle.
///
/// Interior mutability behind a `Mutex`; all methods take `&self`.
pub struct DiscordChannel {
    bot_token: String,
    prefix: String,
    tracker: Arc<Tracker>,
    ready_tx: watch::Sender<bool>,
    state: Mutex<DiscordState>,
}

struct DiscordState {
    status: ChannelStatus,
    http: Option<Arc<Http>>,
    client_handle: Option<JoinHandle<()>>,
    /// Serenity shard manager for graceful shutdown.
    shard_manager: Option<Arc<serenity::gateway::ShardManager>>,
}

impl DiscordChannel {
    pub fn new(bot_token: String, prefix: String, tracker: Arc<Tracker>) -> Self {
        let (ready_tx, _) = watch::channel(false);
        Self {
            bot_token,
            prefix,
            tracker,
            ready_tx,
            state: Mutex::new(DiscordState {
                status: ChannelStatus::Stopped,
                http: None,
                client_handle: None,
                shard_manager: None,
            }),
        }
    }

    /// Readiness signal, flipped to true once the gateway reports ready.
    /// The reminder scheduler gates its first tick on this.
    pub fn ready_signal(&self) -> watch::Receiver<bool> {
        self.ready_tx.subscribe()
    }

    /// Connect and start processing events in a background task.
    pub async fn start(&self) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        if state.status == ChannelStatus::Running {
            bail!("Discord channel is already running");
        }

        state.status = ChannelStatus::Starting;

        let intents = GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT;

        let event_handler = handler::CommandHandler {
            tracker: self.tracker.clone(),
            prefix: self.prefix.clone(),
            ready_tx: self.ready_tx.clone(),
        };

        let mut client = Client::builder(&self.bot_token, intents)
            .event_handler(event_handler)
            .await
            .context("Failed to create Discord client")?;

        let http = client.http.clone();
        let shard_manager = client.shard_manager.clone();

        let handle = tokio::spawn(async move {
            if let Err(e) = client.start().await {
                tracing::error!("Discord client error: {e}");
            }
        });

        state.http = Some(http);
        state.shard_manager = Some(shard_manager);
        state.client_handle = Some(handle);
        state.status = ChannelStatus::Running;

        info!("Discord channel started");

        Ok(())
    }

    /// Disconnect and wait for the client task to exit.
    pub async fn stop(&self) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;

        if let Some(shard_manager) = state.shard_manager.take() {
            shard_manager.shutdown_all().await;
        }

        if let Some(handle) = state.client_handle.take() {
            let _ = handle.await;
        }

        state.http = None;
        state.status = ChannelStatus::Stopped;
        let _ = self.ready_tx.send(false);

        info!("Discord channel stopped");

        Ok(())
    }

    pub fn status(&self) -> ChannelStatus {
        match self.state.try_lock() {
            Ok(state) => state.status.clone(),
            Err(_) => ChannelStatus::Starting,
        }
    }
}

#[async_trait::async_trait]
impl Notifier for DiscordChannel {
    /// Deliver a reminder as a direct message.
    async fn send_direct_message(&self, user_id: i64, text: &str) -> anyhow::Result<()> {
        let state = self.state.lock().await;
        let http = state
            .http
            .as_ref()
            .context("Discord channel not started")?
            .clone();
        drop(state);

        let dm = UserId::new(user_id as u64)
            .create_dm_channel(&http)
            .await
            .context("could not open DM channel (user may have DMs disabled)")?;
        dm.id.say(&http, text).await?;

        Ok(())
    }
}
