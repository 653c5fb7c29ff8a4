use serenity::{
    async_trait,
    model::id::{ChannelId, GuildId},
};

use super::session::Track;
use crate::error::BackendError;

/// Result of resolving a query on the audio node.
#[derive(Debug)]
pub enum Loaded {
    /// A direct link to a single track.
    Track(Track),
    Playlist { name: String, tracks: Vec<Track> },
    /// Search hits, best match first.
    Search(Vec<Track>),
    Empty,
    Failed(String),
}

/// Things the audio node tells us about a guild's player.
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    TrackEnd {
        guild_id: GuildId,
        /// [`Track::id`] of the track that ended.
        track_id: String,
        /// False when the track was stopped or replaced on purpose.
        may_advance: bool,
    },
    TrackException {
        guild_id: GuildId,
        message: String,
    },
    TrackStuck {
        guild_id: GuildId,
        track_id: String,
    },
    VoiceClosed {
        guild_id: GuildId,
        code: u16,
        reason: String,
        by_remote: bool,
    },
}

/// Voice connection plus audio node, per guild.
#[async_trait]
pub trait AudioBackend: Send + Sync + 'static {
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), BackendError>;
    /// Re-joins the voice channel and hands the fresh connection to the node.
    async fn reconnect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), BackendError>;
    async fn load(&self, guild_id: GuildId, query: &str) -> Result<Loaded, BackendError>;
    async fn play(&self, guild_id: GuildId, track: &Track) -> Result<(), BackendError>;
    async fn set_paused(&self, guild_id: GuildId, paused: bool) -> Result<(), BackendError>;
    async fn stop(&self, guild_id: GuildId) -> Result<(), BackendError>;
    /// Destroys the player and leaves voice.
    async fn disconnect(&self, guild_id: GuildId) -> Result<(), BackendError>;
}

/// Where playback state changes are shown to users.
#[async_trait]
pub trait Announcer: Send + Sync + 'static {
    async fn now_playing(&self, guild_id: GuildId, channel_id: ChannelId, track: &Track, upcoming: usize);
    async fn queue_finished(&self, guild_id: GuildId);
    async fn session_ended(&self, guild_id: GuildId);
}
