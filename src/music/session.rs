use std::{any::Any, collections::VecDeque, sync::Arc, time::Duration};

use rand::seq::SliceRandom;
use serenity::model::id::{ChannelId, UserId};

use crate::error::ControlError;

/// A playable track as the music service sees it.
#[derive(Debug, Clone)]
pub struct Track {
    /// Identifies the track on the audio node.
    pub id: String,
    pub title: String,
    pub author: String,
    pub uri: Option<String>,
    pub artwork: Option<String>,
    pub length: Duration,
    pub is_stream: bool,
    /// `None` for tracks the bot picked itself (autoplay).
    pub requester: Option<UserId>,
    /// Backend specific handle needed to actually play the track.
    pub source: Arc<dyn Any + Send + Sync>,
}

impl Track {
    pub fn requested_by(mut self, user: UserId) -> Self {
        self.requester = Some(user);
        self
    }
}

/// Per-guild playback state.
#[derive(Debug)]
pub struct Session {
    pub channel_id: ChannelId,
    pub text_channel_id: ChannelId,
    pub queue: VecDeque<Track>,
    pub now_playing: Option<Track>,
    pub paused: bool,
    pub autoplay: bool,
    pub twenty_four_seven: bool,
    /// Whether any non-bot user shares the voice channel with us.
    pub listeners_present: bool,
    pub reconnect_attempts: u8,
}

impl Session {
    pub fn new(channel_id: ChannelId, text_channel_id: ChannelId) -> Self {
        Self {
            channel_id,
            text_channel_id,
            queue: VecDeque::new(),
            now_playing: None,
            paused: false,
            autoplay: false,
            twenty_four_seven: false,
            listeners_present: true,
            reconnect_attempts: 0,
        }
    }

    /// Appends tracks, returning the 1-based queue position of the first one.
    pub fn enqueue(&mut self, tracks: impl IntoIterator<Item = Track>) -> usize {
        let position = self.queue.len() + 1;
        self.queue.extend(tracks);
        position
    }

    /// Nothing is playing, or nobody is around to hear it.
    pub fn is_idle(&self) -> bool {
        self.now_playing.is_none() || !self.listeners_present
    }

    /// Checks that `user` may control the current track.
    pub fn check_requester(&self, user: UserId) -> Result<&Track, ControlError> {
        let track = self.now_playing.as_ref().ok_or(ControlError::NotPlaying)?;
        match track.requester {
            Some(requester) if requester != user => Err(ControlError::NotRequester(requester)),
            _ => Ok(track),
        }
    }

    pub fn shuffle(&mut self) -> Result<(), ControlError> {
        if self.queue.len() < 2 {
            return Err(ControlError::NotEnoughTracks);
        }
        self.queue.make_contiguous().shuffle(&mut rand::rng());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn track(title: &str, requester: Option<u64>) -> Track {
    Track {
        id: title.to_string(),
        title: title.to_string(),
        author: "someone".to_string(),
        uri: None,
        artwork: None,
        length: Duration::from_secs(180),
        is_stream: false,
        requester: requester.map(UserId::new),
        source: Arc::new(title.to_string()),
    }
}
