use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId, MessageId, UserId};

use crate::timer::Timers;

#[derive(Debug, Clone)]
pub struct Giveaway {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub prize: String,
    pub winners: u64,
    pub host: UserId,
    /// Unix timestamp, seconds.
    pub ends_at: i64,
}

/// Running and finished giveaways, keyed by their announcement message.
#[derive(Default)]
pub struct Giveaways {
    active: DashMap<MessageId, Giveaway>,
    ended: DashMap<MessageId, Giveaway>,
    pub(super) timers: Timers<MessageId>,
}

impl Giveaways {
    pub fn start(&self, message_id: MessageId, giveaway: Giveaway) {
        self.active.insert(message_id, giveaway);
    }

    /// Removes a running giveaway so it can be ended, cancelling its timer.
    /// Only one caller can win this, so a giveaway is never ended twice.
    pub fn take_active(&self, message_id: MessageId) -> Option<Giveaway> {
        self.timers.cancel(&message_id);
        self.active.remove(&message_id).map(|(_, g)| g)
    }

    /// Like [`Giveaways::take_active`], but only for giveaways in `guild_id`.
    pub fn take_active_in(&self, guild_id: GuildId, message_id: MessageId) -> Option<Giveaway> {
        self.active
            .remove_if(&message_id, |_, g| g.guild_id == guild_id)
            .map(|(_, g)| {
                self.timers.cancel(&message_id);
                g
            })
    }

    /// Keeps an ended giveaway around for rerolls.
    pub fn finish(&self, message_id: MessageId, giveaway: Giveaway) {
        self.ended.insert(message_id, giveaway);
    }

    pub fn ended_in(&self, guild_id: GuildId, message_id: MessageId) -> Option<Giveaway> {
        self.ended
            .get(&message_id)
            .filter(|g| g.guild_id == guild_id)
            .map(|g| g.value().clone())
    }

    /// Running giveaways in `guild_id`, soonest first.
    pub fn active_in(&self, guild_id: GuildId) -> Vec<(MessageId, Giveaway)> {
        let mut list: Vec<_> = self
            .active
            .iter()
            .filter(|entry| entry.guild_id == guild_id)
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        list.sort_by_key(|(_, g)| g.ends_at);
        list
    }
}
