use serenity::model::id::{ChannelId, UserId};
use thiserror::Error;

pub type DynError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read file `{0}`: {1:?}")]
    InvalidPath(String, std::io::Error),
    #[error("Read invalid toml content from `{0}`: {1:?}")]
    InvalidContent(String, toml::de::Error),
    #[error("Config `{0}` is missing the `[{1}]` section")]
    Missing(String, &'static str),
    #[error("Config `{0}` is invalid: {1}")]
    Invalid(String, &'static str),
}

/// Failures of the audio backend (voice gateway + audio node).
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("voice gateway join failed: {0}")]
    Join(DynError),
    #[error("no player exists for this guild")]
    NoPlayer,
    #[error("audio node request failed: {0}")]
    Node(DynError),
}

#[derive(Debug, Error)]
pub enum PlayError {
    #[error("You must provide a song name or URL to play.")]
    NoQuery,
    #[error("You can only use this command in a guild text channel.")]
    NoGuildId,
    #[error("Join a voice channel before trying to queue a song.")]
    NoChannel,
    #[error("Unable to join your voice channel.")]
    Join,
    #[error("I'm already playing in <#{0}>, join me there.")]
    OtherChannel(ChannelId),
    #[error("Nothing matched `{0}`.")]
    NoMatches(String),
    #[error("Failed to load `{0}`.")]
    Load(String),

    #[error("Unknown play command error: {0:?}")]
    Unknown(DynError),
}

impl From<BackendError> for PlayError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Join(_) => PlayError::Join,
            e => PlayError::Unknown(Box::new(e)),
        }
    }
}

/// Errors from the playback controls (buttons and their slash command twins).
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("You can only use this command in a guild text channel.")]
    NoGuildId,
    #[error("Nothing is playing right now.")]
    NotPlaying,
    #[error("Only <@{0}> can control this track.")]
    NotRequester(UserId),
    #[error("You need the Manage Server permission to do that.")]
    MissingPermission,
    #[error("There need to be at least two songs in the queue to shuffle.")]
    NotEnoughTracks,
    #[error("Playback is already paused.")]
    AlreadyPaused,
    #[error("Playback is not paused.")]
    NotPaused,

    #[error("Unknown playback error: {0}")]
    Backend(#[from] BackendError),
}

#[derive(Debug, Error)]
pub enum GiveawayError {
    #[error("You can only use this command in a server.")]
    NoGuildId,
    #[error("You need the Manage Server permission to run giveaways.")]
    MissingPermission,
    #[error("Missing required option `{0}`.")]
    MissingOption(&'static str),
    #[error("Prizes can be at most {0} characters long.")]
    PrizeTooLong(usize),
    #[error("`{0}` is not a valid duration. Try something like `30m`, `1h30m` or `2d`.")]
    InvalidDuration(String),
    #[error("Giveaways must last between 10 seconds and 30 days.")]
    DurationOutOfRange,
    #[error("The number of winners must be between 1 and {0}.")]
    InvalidWinners(u64),
    #[error("`{0}` is not a message ID.")]
    InvalidMessageId(String),
    #[error("No running giveaway found for that message.")]
    NotRunning,
    #[error("No ended giveaway found for that message.")]
    NotEnded,

    #[error("Discord request failed: {0}")]
    Discord(#[from] serenity::Error),
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error("A poll needs a question.")]
    NoQuestion,
    #[error("Questions can be at most {0} characters long.")]
    QuestionTooLong(usize),
    #[error("A poll needs at least two non-empty choices.")]
    NotEnoughChoices,

    #[error("Discord request failed: {0}")]
    Discord(#[from] serenity::Error),
}
