//! [`AudioBackend`] on top of a Lavalink node, with songbird handling the
//! Discord side of the voice connection.

use std::{sync::Arc, time::Duration};

use lavalink_rs::{
    error::LavalinkError,
    hook,
    model::{
        events::{self, TrackEndReason},
        http::UpdatePlayer,
        track::{TrackData, TrackLoadData},
    },
    prelude::*,
};
use serenity::{
    async_trait,
    model::id::{ChannelId, GuildId, UserId},
};
use songbird::Songbird;
use tokio::sync::mpsc::UnboundedSender;

use super::{
    backend::{AudioBackend, Loaded, PlayerEvent},
    session::Track,
};
use crate::{config::LavalinkConfig, error::BackendError};

type EventSender = UnboundedSender<PlayerEvent>;

pub struct LavalinkBackend {
    lavalink: LavalinkClient,
    songbird: Arc<Songbird>,
}

impl LavalinkBackend {
    /// Connects to the node. Player events are forwarded to `event_tx`.
    pub async fn connect(
        config: &LavalinkConfig,
        bot_id: UserId,
        songbird: Arc<Songbird>,
        event_tx: EventSender,
    ) -> Self {
        let hooks = events::Events {
            ready: Some(ready),
            track_end: Some(track_end),
            track_exception: Some(track_exception),
            track_stuck: Some(track_stuck),
            websocket_closed: Some(websocket_closed),
            ..Default::default()
        };

        let node = NodeBuilder {
            hostname: config.host.clone(),
            is_ssl: config.ssl,
            events: events::Events::default(),
            password: config.password.clone(),
            user_id: bot_id.into(),
            session_id: None,
        };

        let lavalink = LavalinkClient::new_with_data(
            hooks,
            vec![node],
            NodeDistributionStrategy::round_robin(),
            Arc::new(event_tx),
        )
        .await;

        Self { lavalink, songbird }
    }

    fn player(&self, guild_id: GuildId) -> Result<PlayerContext, BackendError> {
        self.lavalink
            .get_player_context(guild_id)
            .ok_or(BackendError::NoPlayer)
    }
}

fn node(e: LavalinkError) -> BackendError {
    BackendError::Node(Box::new(e))
}

fn track(data: TrackData) -> Track {
    Track {
        id: data.encoded.clone(),
        title: data.info.title.clone(),
        author: data.info.author.clone(),
        uri: data.info.uri.clone(),
        artwork: data.info.artwork_url.clone(),
        length: Duration::from_millis(data.info.length),
        is_stream: data.info.is_stream,
        requester: None,
        source: Arc::new(data),
    }
}

#[async_trait]
impl AudioBackend for LavalinkBackend {
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), BackendError> {
        let (info, _call) = self
            .songbird
            .join_gateway(guild_id, channel_id)
            .await
            .map_err(|e| BackendError::Join(Box::new(e)))?;

        self.lavalink
            .create_player_context(guild_id, info)
            .await
            .map_err(node)?;
        Ok(())
    }

    async fn reconnect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), BackendError> {
        let player = self.player(guild_id)?;
        let (info, _call) = self
            .songbird
            .join_gateway(guild_id, channel_id)
            .await
            .map_err(|e| BackendError::Join(Box::new(e)))?;

        let update = UpdatePlayer {
            voice: Some(info.into()),
            ..Default::default()
        };
        player.update_player(&update, true).await.map_err(node)?;
        log::info!("reconnected voice in guild {}", guild_id);
        Ok(())
    }

    async fn load(&self, guild_id: GuildId, query: &str) -> Result<Loaded, BackendError> {
        let loaded = self
            .lavalink
            .load_tracks(guild_id, query)
            .await
            .map_err(node)?;

        Ok(match loaded.data {
            Some(TrackLoadData::Track(data)) => Loaded::Track(track(data)),
            Some(TrackLoadData::Playlist(playlist)) => Loaded::Playlist {
                name: playlist.info.name,
                tracks: playlist.tracks.into_iter().map(track).collect(),
            },
            Some(TrackLoadData::Search(hits)) if hits.is_empty() => Loaded::Empty,
            Some(TrackLoadData::Search(hits)) => Loaded::Search(hits.into_iter().map(track).collect()),
            Some(TrackLoadData::Error(e)) => Loaded::Failed(format!("{:?}", e)),
            None => Loaded::Empty,
        })
    }

    async fn play(&self, guild_id: GuildId, track: &Track) -> Result<(), BackendError> {
        let data = track
            .source
            .downcast_ref::<TrackData>()
            .ok_or_else(|| BackendError::Node("track was not loaded from lavalink".into()))?;
        self.player(guild_id)?.play_now(data).await.map_err(node)?;
        Ok(())
    }

    async fn set_paused(&self, guild_id: GuildId, paused: bool) -> Result<(), BackendError> {
        self.player(guild_id)?.set_pause(paused).await.map_err(node)?;
        Ok(())
    }

    async fn stop(&self, guild_id: GuildId) -> Result<(), BackendError> {
        self.player(guild_id)?.stop_now().await.map_err(node)?;
        Ok(())
    }

    async fn disconnect(&self, guild_id: GuildId) -> Result<(), BackendError> {
        let deleted = self.lavalink.delete_player(guild_id).await.map_err(node);
        if let Err(e) = self.songbird.remove(guild_id).await {
            log::debug!("leaving voice in guild {}: {}", guild_id, e);
        }
        deleted
    }
}

fn forward(client: &LavalinkClient, event: PlayerEvent) {
    match client.data::<EventSender>() {
        Ok(tx) => {
            if tx.send(event).is_err() {
                log::warn!("player event receiver is gone");
            }
        }
        Err(e) => log::error!("lavalink client has no event sender: {}", e),
    }
}

fn guild(id: lavalink_rs::model::GuildId) -> GuildId {
    GuildId::new(id.0)
}

#[hook]
async fn ready(_client: LavalinkClient, session_id: String, event: &events::Ready) {
    log::info!(
        "lavalink node ready, session {} (resumed: {})",
        session_id,
        event.resumed
    );
}

#[hook]
async fn track_end(client: LavalinkClient, _session_id: String, event: &events::TrackEnd) {
    let may_advance = matches!(
        event.reason,
        TrackEndReason::Finished | TrackEndReason::LoadFailed
    );
    forward(
        &client,
        PlayerEvent::TrackEnd {
            guild_id: guild(event.guild_id),
            track_id: event.track.encoded.clone(),
            may_advance,
        },
    );
}

#[hook]
async fn track_exception(client: LavalinkClient, _session_id: String, event: &events::TrackException) {
    forward(
        &client,
        PlayerEvent::TrackException {
            guild_id: guild(event.guild_id),
            message: format!("{:?}", event.exception),
        },
    );
}

#[hook]
async fn track_stuck(client: LavalinkClient, _session_id: String, event: &events::TrackStuck) {
    forward(
        &client,
        PlayerEvent::TrackStuck {
            guild_id: guild(event.guild_id),
            track_id: event.track.encoded.clone(),
        },
    );
}

#[hook]
async fn websocket_closed(client: LavalinkClient, _session_id: String, event: &events::WebSocketClosed) {
    forward(
        &client,
        PlayerEvent::VoiceClosed {
            guild_id: guild(event.guild_id),
            code: event.code,
            reason: event.reason.clone(),
            by_remote: event.by_remote,
        },
    );
}
