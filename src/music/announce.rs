use std::sync::Arc;

use dashmap::DashMap;
use serenity::{
    async_trait,
    builder::{CreateEmbed, CreateMessage, EditMessage},
    http::Http,
    model::id::{ChannelId, GuildId, MessageId},
};

use super::{backend::Announcer, controls, embeds, session::Track};

#[derive(Debug, Clone, Copy)]
struct NowPlayingMessage {
    channel_id: ChannelId,
    message_id: MessageId,
}

/// Keeps one now-playing message per guild up to date.
pub struct DiscordAnnouncer {
    http: Arc<Http>,
    messages: DashMap<GuildId, NowPlayingMessage>,
}

impl DiscordAnnouncer {
    pub fn new(http: Arc<Http>) -> Self {
        Self {
            http,
            messages: DashMap::new(),
        }
    }

    /// Replaces the stored message's content and drops its buttons.
    async fn close(&self, msg: NowPlayingMessage, embed: CreateEmbed) {
        let edit = EditMessage::new().embed(embed).components(vec![]);
        if let Err(e) = msg
            .channel_id
            .edit_message(&self.http, msg.message_id, edit)
            .await
        {
            log::debug!("could not edit now-playing message: {}", e);
        }
    }
}

#[async_trait]
impl Announcer for DiscordAnnouncer {
    async fn now_playing(&self, guild_id: GuildId, channel_id: ChannelId, track: &Track, upcoming: usize) {
        let embed = embeds::now_playing(track, upcoming);
        let existing = self.messages.get(&guild_id).map(|m| *m);

        if let Some(msg) = existing.filter(|m| m.channel_id == channel_id) {
            let edit = EditMessage::new()
                .embed(embed.clone())
                .components(controls::buttons());
            match channel_id.edit_message(&self.http, msg.message_id, edit).await {
                Ok(_) => return,
                Err(e) => log::debug!("now-playing message gone, sending a new one: {}", e),
            }
        } else if let Some(msg) = existing {
            self.close(msg, embeds::ended()).await;
        }

        let message = CreateMessage::new()
            .embed(embed)
            .components(controls::buttons());
        match channel_id.send_message(&self.http, message).await {
            Ok(sent) => {
                self.messages.insert(
                    guild_id,
                    NowPlayingMessage {
                        channel_id,
                        message_id: sent.id,
                    },
                );
            }
            Err(e) => log::warn!("failed to send now-playing message in {}: {}", channel_id, e),
        }
    }

    async fn queue_finished(&self, guild_id: GuildId) {
        let existing = self.messages.get(&guild_id).map(|m| *m);
        if let Some(msg) = existing {
            self.close(msg, embeds::finished()).await;
        }
    }

    async fn session_ended(&self, guild_id: GuildId) {
        if let Some((_, msg)) = self.messages.remove(&guild_id) {
            self.close(msg, embeds::ended()).await;
        }
    }
}
