//! Discord surface for bossbot.
//!
//! Uses serenity to connect to the Discord Gateway. The event handler feeds
//! admin commands into the engine; the [`DiscordNotifier`] delivers
//! announcements, as an embed when the schedule carries an image and as a
//! plain message otherwise.

pub mod handler;

use std::sync::Arc;

use anyhow::Context as _;
use once_cell::sync::OnceCell;
use serenity::Client;
use serenity::all::{
    CreateEmbed, CreateMessage, GatewayIntents, Http, Timestamp,
};
use serenity::model::id::ChannelId;
use tokio::sync::{Mutex, mpsc};
use tracing::info;

use bossbot_config::BotConfig;
use bossbot_sched::{Catalog, Engine, Notifier, Scheduler, ScheduleStore};
use bossbot_types::Notification;

/// Embed accent colour for boss announcements.
const EMBED_COLOUR: u32 = 0x00aeff;

/// Sends announcements through the Discord HTTP API.
///
/// The HTTP handle only exists once the gateway session is up, so it is
/// filled in by the `ready` event; a send before that fails cleanly.
pub struct DiscordNotifier {
    http: OnceCell<Arc<Http>>,
}

impl DiscordNotifier {
    pub fn new() -> Self {
        Self {
            http: OnceCell::new(),
        }
    }

    pub(crate) fn set_http(&self, http: Arc<Http>) {
        let _ = self.http.set(http);
    }
}

impl Default for DiscordNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()> {
        let http = self
            .http
            .get()
            .context("Discord session not ready")?;
        let channel_id: u64 = notification
            .channel_id
            .parse()
            .with_context(|| format!("invalid channel id {:?}", notification.channel_id))?;
        let channel = ChannelId::new(channel_id);

        let builder = match &notification.image {
            Some(image) => {
                let embed = CreateEmbed::new()
                    .colour(EMBED_COLOUR)
                    .title("⚔️ Boss Spawn Imminente!")
                    .description(&notification.body)
                    .image(image)
                    .timestamp(Timestamp::now());
                CreateMessage::new()
                    .content(&notification.role_mention)
                    .embed(embed)
            }
            None => CreateMessage::new().content(format!(
                "{} {}",
                notification.role_mention, notification.body
            )),
        };

        channel
            .send_message(http, builder)
            .await
            .context("failed to send announcement")?;
        Ok(())
    }
}

/// Wire the engine to a serenity client and run until the gateway drops.
pub async fn start(config: BotConfig) -> anyhow::Result<()> {
    let token = config.require_token()?.to_string();

    let (fire_tx, fire_rx) = mpsc::unbounded_channel();
    let notifier = Arc::new(DiscordNotifier::new());
    let engine = Arc::new(Engine::new(
        ScheduleStore::new(&config.schedule_file),
        Catalog::new(&config.bosses_file),
        Scheduler::new(config.timezone, fire_tx),
        notifier.clone(),
        config.fire_policy,
    ));

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let event_handler = handler::BossHandler {
        engine,
        notifier,
        fire_rx: Mutex::new(Some(fire_rx)),
    };

    let mut client = Client::builder(&token, intents)
        .event_handler(event_handler)
        .await
        .context("Failed to create Discord client")?;

    info!(timezone = %config.timezone, "Starting Discord client");
    client.start().await.context("Discord client error")?;
    Ok(())
}
