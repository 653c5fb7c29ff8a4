//! The music bot: Lavalink playback with per-guild queues, autoplay,
//! 24/7 mode and inactivity teardown.

pub mod announce;
pub mod backend;
mod bot;
pub mod controls;
mod embeds;
pub mod lavalink;
pub mod reconnect;
pub mod service;
pub mod session;

pub use bot::Handler;
