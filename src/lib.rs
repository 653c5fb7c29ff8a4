//! Three small Discord bots sharing one crate: a Lavalink music bot, a
//! giveaway bot and a poll bot. Each has its own binary under `src/bin`.

pub mod config;
pub mod error;
pub mod giveaway;
pub mod interaction;
pub mod keepalive;
pub mod music;
pub mod poll;
pub mod timer;
