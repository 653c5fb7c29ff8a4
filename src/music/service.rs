use std::sync::{Arc, Weak};

use dashmap::DashMap;
use rand::seq::IndexedRandom;
use serenity::model::id::{ChannelId, GuildId, UserId};
use tokio::sync::Mutex;

use super::{
    backend::{Announcer, AudioBackend, Loaded, PlayerEvent},
    reconnect::{self, Recovery},
    session::{Session, Track},
};
use crate::{
    config::MusicConfig,
    error::{ControlError, PlayError},
    timer::Timers,
};

/// Outcome of a `/play`.
#[derive(Debug)]
pub struct Enqueued {
    pub first: Track,
    pub count: usize,
    /// Queue position of the first track, `None` when it started right away.
    pub position: Option<usize>,
    pub playlist: Option<String>,
}

/// Read-only view of a guild's queue.
#[derive(Debug)]
pub struct QueueView {
    pub now_playing: Option<Track>,
    pub upcoming: Vec<Track>,
    pub total: usize,
    pub paused: bool,
    pub autoplay: bool,
    pub twenty_four_seven: bool,
}

const QUEUE_PREVIEW: usize = 10;

/// Owns every guild's session and drives playback through an
/// [`AudioBackend`], reporting to an [`Announcer`].
pub struct MusicService<B, A> {
    backend: B,
    announcer: A,
    config: MusicConfig,
    sessions: DashMap<GuildId, Arc<Mutex<Session>>>,
    inactivity: Timers<GuildId>,
    reconnects: Timers<GuildId>,
}

impl<B, A> MusicService<B, A>
where
    B: AudioBackend,
    A: Announcer,
{
    pub fn new(backend: B, announcer: A, config: MusicConfig) -> Arc<Self> {
        Arc::new(Self {
            backend,
            announcer,
            config,
            sessions: DashMap::new(),
            inactivity: Timers::default(),
            reconnects: Timers::default(),
        })
    }

    fn session(&self, guild_id: GuildId) -> Option<Arc<Mutex<Session>>> {
        self.sessions.get(&guild_id).map(|s| s.clone())
    }

    /// Voice channel the bot is currently in for `guild_id`.
    pub async fn voice_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        let session = self.session(guild_id)?;
        let channel_id = session.lock().await.channel_id;
        Some(channel_id)
    }

    pub async fn play(
        self: &Arc<Self>,
        guild_id: GuildId,
        voice_channel: ChannelId,
        text_channel: ChannelId,
        user: UserId,
        query: &str,
    ) -> Result<Enqueued, PlayError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PlayError::NoQuery);
        }

        let session = match self.session(guild_id) {
            Some(session) => {
                let channel_id = session.lock().await.channel_id;
                if channel_id != voice_channel {
                    return Err(PlayError::OtherChannel(channel_id));
                }
                session
            }
            None => {
                self.backend.connect(guild_id, voice_channel).await?;
                log::info!("joined voice channel {} in guild {}", voice_channel, guild_id);
                self.sessions
                    .entry(guild_id)
                    .or_insert_with(|| Arc::new(Mutex::new(Session::new(voice_channel, text_channel))))
                    .clone()
            }
        };

        let result = self.enqueue(guild_id, &session, text_channel, user, query).await;
        if result.is_err() && session.lock().await.is_idle() {
            self.arm_inactivity(guild_id).await;
        }
        result
    }

    async fn enqueue(
        self: &Arc<Self>,
        guild_id: GuildId,
        session: &Arc<Mutex<Session>>,
        text_channel: ChannelId,
        user: UserId,
        query: &str,
    ) -> Result<Enqueued, PlayError> {
        let (tracks, playlist) = match self.backend.load(guild_id, &search_query(query)).await? {
            Loaded::Track(track) => (vec![track], None),
            Loaded::Playlist { name, tracks } => (tracks, Some(name)),
            Loaded::Search(mut hits) => {
                hits.truncate(1);
                (hits, None)
            }
            Loaded::Empty => return Err(PlayError::NoMatches(query.to_string())),
            Loaded::Failed(reason) => {
                log::warn!("loading `{}` failed: {}", query, reason);
                return Err(PlayError::Load(query.to_string()));
            }
        };

        let tracks: Vec<Track> = tracks.into_iter().map(|t| t.requested_by(user)).collect();
        let first = tracks
            .first()
            .cloned()
            .ok_or_else(|| PlayError::NoMatches(query.to_string()))?;
        let count = tracks.len();

        let mut s = session.lock().await;
        s.text_channel_id = text_channel;
        // whoever ran /play is in the channel
        s.listeners_present = true;
        let position = s.enqueue(tracks);
        self.inactivity.cancel(&guild_id);

        let position = if s.now_playing.is_none() {
            self.start_next(guild_id, &mut s).await;
            position.checked_sub(1).filter(|p| *p > 0)
        } else {
            Some(position)
        };

        Ok(Enqueued {
            first,
            count,
            position,
            playlist,
        })
    }

    /// Replaces whatever is playing with the next queued track, refilling
    /// from autoplay if enabled. Returns the track that started, if any.
    ///
    /// The caller must hold the session lock from the moment it decides to
    /// advance until this returns.
    async fn start_next(self: &Arc<Self>, guild_id: GuildId, s: &mut Session) -> Option<Track> {
        s.now_playing = None;
        s.paused = false;

        let mut refilled = false;
        loop {
            let next = match s.queue.pop_front() {
                Some(track) => track,
                None if s.autoplay && !refilled => {
                    refilled = true;
                    self.autoplay_refill(guild_id, s).await;
                    continue;
                }
                None => break,
            };

            match self.backend.play(guild_id, &next).await {
                Ok(()) => {
                    log::debug!("playing `{}` in guild {}", next.title, guild_id);
                    if s.listeners_present {
                        self.inactivity.cancel(&guild_id);
                    }
                    s.now_playing = Some(next.clone());
                    self.announcer
                        .now_playing(guild_id, s.text_channel_id, &next, s.queue.len())
                        .await;
                    return Some(next);
                }
                Err(e) => log::warn!("failed to play `{}` in guild {}: {}", next.title, guild_id, e),
            }
        }

        if let Err(e) = self.backend.stop(guild_id).await {
            log::warn!("failed to stop player in guild {}: {}", guild_id, e);
        }
        self.announcer.queue_finished(guild_id).await;
        if !s.twenty_four_seven {
            self.arm_inactivity(guild_id).await;
        }
        None
    }

    async fn autoplay_refill(&self, guild_id: GuildId, session: &mut Session) {
        let genre = match pick_genre(&self.config.genres) {
            Some(genre) => genre.to_string(),
            None => return,
        };
        log::info!("autoplay in guild {} picked `{}`", guild_id, genre);

        let hits = match self.backend.load(guild_id, &search_query(&genre)).await {
            Ok(Loaded::Search(hits)) => hits,
            Ok(Loaded::Playlist { tracks, .. }) => tracks,
            Ok(Loaded::Track(track)) => vec![track],
            Ok(other) => {
                log::warn!("autoplay search for `{}` returned {:?}", genre, other);
                return;
            }
            Err(e) => {
                log::warn!("autoplay search for `{}` failed: {}", genre, e);
                return;
            }
        };

        session.enqueue(hits.into_iter().take(self.config.autoplay_results).map(|mut t| {
            t.requester = None;
            t
        }));
    }

    pub async fn pause(&self, guild_id: GuildId, user: UserId) -> Result<Track, ControlError> {
        let session = self.session(guild_id).ok_or(ControlError::NotPlaying)?;
        let mut s = session.lock().await;
        let track = s.check_requester(user)?.clone();
        if s.paused {
            return Err(ControlError::AlreadyPaused);
        }
        self.backend.set_paused(guild_id, true).await?;
        s.paused = true;
        Ok(track)
    }

    pub async fn resume(&self, guild_id: GuildId, user: UserId) -> Result<Track, ControlError> {
        let session = self.session(guild_id).ok_or(ControlError::NotPlaying)?;
        let mut s = session.lock().await;
        let track = s.check_requester(user)?.clone();
        if !s.paused {
            return Err(ControlError::NotPaused);
        }
        self.backend.set_paused(guild_id, false).await?;
        s.paused = false;
        Ok(track)
    }

    /// Skips the current track. Returns the skipped track and the one that
    /// replaced it.
    pub async fn skip(
        self: &Arc<Self>,
        guild_id: GuildId,
        user: UserId,
    ) -> Result<(Track, Option<Track>), ControlError> {
        let session = self.session(guild_id).ok_or(ControlError::NotPlaying)?;
        let mut s = session.lock().await;
        let skipped = s.check_requester(user)?.clone();
        let next = self.start_next(guild_id, &mut s).await;
        Ok((skipped, next))
    }

    /// Stops playback and clears the queue. Returns how many queued tracks
    /// were dropped.
    pub async fn stop(self: &Arc<Self>, guild_id: GuildId, user: UserId) -> Result<usize, ControlError> {
        let session = self.session(guild_id).ok_or(ControlError::NotPlaying)?;
        let mut s = session.lock().await;
        s.check_requester(user)?;

        self.backend.stop(guild_id).await?;
        let cleared = s.queue.len();
        s.queue.clear();
        s.now_playing = None;
        s.paused = false;

        self.announcer.queue_finished(guild_id).await;
        if !s.twenty_four_seven {
            self.arm_inactivity(guild_id).await;
        }
        Ok(cleared)
    }

    pub async fn shuffle(&self, guild_id: GuildId, user: UserId) -> Result<usize, ControlError> {
        let session = self.session(guild_id).ok_or(ControlError::NotPlaying)?;
        let mut s = session.lock().await;
        s.check_requester(user)?;
        s.shuffle()?;
        Ok(s.queue.len())
    }

    /// Flips autoplay. Turning it on while idle starts playing right away.
    pub async fn toggle_autoplay(self: &Arc<Self>, guild_id: GuildId) -> Result<bool, ControlError> {
        let session = self.session(guild_id).ok_or(ControlError::NotPlaying)?;
        let mut s = session.lock().await;
        s.autoplay = !s.autoplay;
        if s.autoplay && s.now_playing.is_none() {
            self.start_next(guild_id, &mut s).await;
        }
        Ok(s.autoplay)
    }

    pub async fn toggle_twenty_four_seven(self: &Arc<Self>, guild_id: GuildId) -> Result<bool, ControlError> {
        let session = self.session(guild_id).ok_or(ControlError::NotPlaying)?;
        let mut s = session.lock().await;
        s.twenty_four_seven = !s.twenty_four_seven;
        if s.twenty_four_seven {
            self.inactivity.cancel(&guild_id);
        } else if s.is_idle() {
            self.arm_inactivity(guild_id).await;
        }
        Ok(s.twenty_four_seven)
    }

    /// Leaves voice. Managers may always do this; others only when they
    /// requested the current track or nothing is playing.
    pub async fn leave(&self, guild_id: GuildId, user: UserId, is_manager: bool) -> Result<(), ControlError> {
        let session = self.session(guild_id).ok_or(ControlError::NotPlaying)?;
        {
            let s = session.lock().await;
            if !is_manager && s.now_playing.is_some() {
                s.check_requester(user)?;
            }
        }
        self.teardown(guild_id).await;
        Ok(())
    }

    pub async fn queue(&self, guild_id: GuildId) -> Option<QueueView> {
        let session = self.session(guild_id)?;
        let s = session.lock().await;
        Some(QueueView {
            now_playing: s.now_playing.clone(),
            upcoming: s.queue.iter().take(QUEUE_PREVIEW).cloned().collect(),
            total: s.queue.len(),
            paused: s.paused,
            autoplay: s.autoplay,
            twenty_four_seven: s.twenty_four_seven,
        })
    }

    /// Records whether anyone is left to listen in the bot's channel.
    pub async fn set_listeners_present(self: &Arc<Self>, guild_id: GuildId, present: bool) {
        let session = match self.session(guild_id) {
            Some(session) => session,
            None => return,
        };
        let mut s = session.lock().await;
        if s.listeners_present == present {
            return;
        }
        s.listeners_present = present;

        if !s.is_idle() {
            self.inactivity.cancel(&guild_id);
        } else if !s.twenty_four_seven {
            self.arm_inactivity(guild_id).await;
        }
    }

    /// The bot was moved to another voice channel by someone.
    pub async fn moved(&self, guild_id: GuildId, channel_id: ChannelId) {
        if let Some(session) = self.session(guild_id) {
            session.lock().await.channel_id = channel_id;
        }
    }

    /// Destroys the player, leaves voice and forgets the session. Returns
    /// whether a session existed.
    pub async fn teardown(&self, guild_id: GuildId) -> bool {
        self.inactivity.cancel(&guild_id);
        self.reconnects.cancel(&guild_id);
        let existed = self.sessions.remove(&guild_id).is_some();

        if let Err(e) = self.backend.disconnect(guild_id).await {
            log::warn!("failed to disconnect from guild {}: {}", guild_id, e);
        }
        if existed {
            log::info!("session in guild {} ended", guild_id);
            self.announcer.session_ended(guild_id).await;
        }
        existed
    }

    pub async fn handle_event(self: &Arc<Self>, event: PlayerEvent) {
        match event {
            PlayerEvent::TrackEnd {
                guild_id,
                track_id,
                may_advance,
            } => {
                if may_advance {
                    self.advance_past(guild_id, &track_id, true).await;
                }
            }
            PlayerEvent::TrackException { guild_id, message } => {
                // the node follows up with a load-failed track end
                log::warn!("track exception in guild {}: {}", guild_id, message);
            }
            PlayerEvent::TrackStuck { guild_id, track_id } => {
                log::warn!("track stuck in guild {}, skipping", guild_id);
                self.advance_past(guild_id, &track_id, false).await;
            }
            PlayerEvent::VoiceClosed {
                guild_id,
                code,
                reason,
                by_remote,
            } => self.voice_closed(guild_id, code, &reason, by_remote).await,
        }
    }

    /// Moves on from `track_id`, unless something else is playing by now.
    async fn advance_past(self: &Arc<Self>, guild_id: GuildId, track_id: &str, finished: bool) {
        let session = match self.session(guild_id) {
            Some(session) => session,
            None => return,
        };
        let mut s = session.lock().await;
        if s.now_playing.as_ref().map(|t| t.id.as_str()) != Some(track_id) {
            log::debug!("ignoring stale end of {} in guild {}", track_id, guild_id);
            return;
        }
        if finished {
            s.reconnect_attempts = 0;
        }
        self.start_next(guild_id, &mut s).await;
    }

    async fn voice_closed(self: &Arc<Self>, guild_id: GuildId, code: u16, reason: &str, by_remote: bool) {
        let session = match self.session(guild_id) {
            Some(session) => session,
            None => return,
        };
        log::warn!(
            "voice socket for guild {} closed with {} ({}), remote: {}",
            guild_id,
            code,
            reason,
            by_remote
        );

        let delay = match reconnect::recovery_for(code, reason, by_remote) {
            Recovery::Ignore => return,
            Recovery::Teardown => {
                self.teardown(guild_id).await;
                return;
            }
            Recovery::Reconnect(delay) => delay,
        };

        let channel_id = {
            let mut s = session.lock().await;
            s.reconnect_attempts += 1;
            if s.reconnect_attempts > reconnect::MAX_ATTEMPTS {
                None
            } else {
                Some(s.channel_id)
            }
        };
        let channel_id = match channel_id {
            Some(channel_id) => channel_id,
            None => {
                log::warn!("giving up reconnecting in guild {}", guild_id);
                self.teardown(guild_id).await;
                return;
            }
        };

        let this = Arc::downgrade(self);
        self.reconnects.schedule(guild_id, delay, async move {
            if let Some(this) = this.upgrade() {
                if let Err(e) = this.backend.reconnect(guild_id, channel_id).await {
                    log::warn!("reconnect in guild {} failed: {}", guild_id, e);
                    this.teardown(guild_id).await;
                }
            }
        });
    }

    async fn arm_inactivity(self: &Arc<Self>, guild_id: GuildId) {
        let this: Weak<Self> = Arc::downgrade(self);
        self.inactivity
            .schedule(guild_id, self.config.inactivity_timeout(), async move {
                if let Some(this) = this.upgrade() {
                    this.expire_idle(guild_id).await;
                }
            });
    }

    async fn expire_idle(&self, guild_id: GuildId) {
        let session = match self.session(guild_id) {
            Some(session) => session,
            None => return,
        };
        let idle = {
            let s = session.lock().await;
            s.is_idle() && !s.twenty_four_seven
        };
        if idle {
            log::info!("leaving guild {} after inactivity", guild_id);
            self.teardown(guild_id).await;
        }
    }
}

/// URLs load directly, anything else becomes a YouTube search.
pub fn search_query(query: &str) -> String {
    if query.starts_with("https://") || query.starts_with("http://") {
        query.to_string()
    } else {
        format!("ytsearch:{}", query)
    }
}

fn pick_genre(genres: &[String]) -> Option<&str> {
    genres.choose(&mut rand::rng()).map(String::as_str)
}
