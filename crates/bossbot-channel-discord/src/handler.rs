//! Serenity EventHandler: admin gate, command dispatch, trigger consumer.

use std::sync::Arc;

use serenity::async_trait;
use serenity::http::Http;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::GuildId;
use serenity::model::permissions::Permissions;
use serenity::prelude::*;
use tokio::sync::{Mutex, mpsc};
use tracing::{error, info, warn};

use bossbot_sched::{Engine, command};

use crate::DiscordNotifier;

/// Bridges Discord events into the engine.
pub struct BossHandler {
    pub(crate) engine: Arc<Engine<Arc<DiscordNotifier>>>,
    pub(crate) notifier: Arc<DiscordNotifier>,
    /// Taken by the first `ready` to spawn the fire consumer.
    pub(crate) fire_rx: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
}

#[async_trait]
impl EventHandler for BossHandler {
    async fn message(&self, ctx: Context, msg: Message) {
        // Only admins in guild channels talk to the bot; everything else,
        // including our own messages, is ignored without a reply.
        if msg.author.bot {
            return;
        }
        let Some(guild_id) = msg.guild_id else {
            return;
        };
        let Some(parsed) = command::parse(&msg.content) else {
            return;
        };
        if !is_admin(&ctx.http, guild_id, &msg).await {
            return;
        }

        match parsed {
            Err(e) => reply(&ctx, &msg, &e.to_string()).await,
            Ok(cmd) => match self.engine.handle_command(cmd).await {
                Ok(replies) => {
                    for text in replies {
                        reply(&ctx, &msg, &text).await;
                    }
                }
                Err(e) => {
                    error!(message_id = %msg.id, "Command failed: {e:#}");
                    reply(&ctx, &msg, "Erro interno, veja logs.").await;
                }
            },
        }
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(bot_name = ready.user.name, "Discord bot connected and ready");
        self.notifier.set_http(ctx.http.clone());

        match self.engine.resync().await {
            Ok(count) => info!(count, "Schedules loaded, triggers armed"),
            Err(e) => error!("Failed to arm triggers: {e:#}"),
        }

        if let Some(mut fire_rx) = self.fire_rx.lock().await.take() {
            let engine = self.engine.clone();
            tokio::spawn(async move {
                while let Some(schedule_id) = fire_rx.recv().await {
                    engine.handle_fire(&schedule_id).await;
                }
            });
        }
    }
}

async fn reply(ctx: &Context, msg: &Message, text: &str) {
    if let Err(e) = msg.reply(&ctx.http, text).await {
        warn!(message_id = %msg.id, "Failed to reply: {e}");
    }
}

/// Administrator-equivalent authority: guild owner, or any role carrying
/// ADMINISTRATOR or MANAGE_GUILD. Resolved over HTTP since the client runs
/// without a cache.
async fn is_admin(http: &Http, guild_id: GuildId, msg: &Message) -> bool {
    let guild = match guild_id.to_partial_guild(http).await {
        Ok(guild) => guild,
        Err(e) => {
            warn!(%guild_id, "Failed to fetch guild for permission check: {e}");
            return false;
        }
    };
    if guild.owner_id == msg.author.id {
        return true;
    }
    let member = match guild_id.member(http, msg.author.id).await {
        Ok(member) => member,
        Err(e) => {
            warn!(%guild_id, "Failed to fetch member for permission check: {e}");
            return false;
        }
    };
    member
        .roles
        .iter()
        .filter_map(|role_id| guild.roles.get(role_id))
        .any(|role| has_admin_authority(role.permissions))
}

fn has_admin_authority(permissions: Permissions) -> bool {
    permissions.administrator() || permissions.manage_guild()
}
