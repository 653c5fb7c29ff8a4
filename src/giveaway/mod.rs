//! The giveaway bot: reaction-entry giveaways with timed draws and rerolls.

mod bot;
pub mod draw;
pub mod duration;
pub mod store;

pub use bot::Handler;
