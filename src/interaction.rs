//! Small helpers shared by the three bots for reading slash command options
//! and answering interactions.

use serenity::{
    builder::{CreateEmbed, CreateInteractionResponse, CreateInteractionResponseMessage},
    client::Context,
    model::{
        application::{CommandDataOptionValue, CommandInteraction, ComponentInteraction},
        guild::Member,
        id::ChannelId,
        permissions::Permissions,
    },
};

pub fn option<'a>(cmd: &'a CommandInteraction, name: &str) -> Option<&'a CommandDataOptionValue> {
    cmd.data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .map(|opt| &opt.value)
}

pub fn str_option<'a>(cmd: &'a CommandInteraction, name: &str) -> Option<&'a str> {
    option(cmd, name).and_then(|v| v.as_str())
}

pub fn int_option(cmd: &CommandInteraction, name: &str) -> Option<i64> {
    option(cmd, name).and_then(|v| v.as_i64())
}

pub fn channel_option(cmd: &CommandInteraction, name: &str) -> Option<ChannelId> {
    option(cmd, name).and_then(|v| v.as_channel_id())
}

/// Whether the interaction member may manage the guild. Interaction payloads
/// carry the member's resolved permissions for the invoking channel.
pub fn can_manage_guild(member: Option<&Member>) -> bool {
    member
        .and_then(|m| m.permissions)
        .map_or(false, |p| p.contains(Permissions::MANAGE_GUILD))
}

pub async fn reply(ctx: &Context, cmd: &CommandInteraction, content: impl Into<String>, ephemeral: bool) {
    let msg = CreateInteractionResponseMessage::new()
        .content(content)
        .ephemeral(ephemeral);
    if let Err(e) = cmd
        .create_response(&ctx.http, CreateInteractionResponse::Message(msg))
        .await
    {
        log::warn!("failed to answer /{}: {}", cmd.data.name, e);
    }
}

pub async fn reply_embed(ctx: &Context, cmd: &CommandInteraction, embed: CreateEmbed, ephemeral: bool) {
    let msg = CreateInteractionResponseMessage::new()
        .embed(embed)
        .ephemeral(ephemeral);
    if let Err(e) = cmd
        .create_response(&ctx.http, CreateInteractionResponse::Message(msg))
        .await
    {
        log::warn!("failed to answer /{}: {}", cmd.data.name, e);
    }
}

pub async fn reply_component(ctx: &Context, comp: &ComponentInteraction, content: impl Into<String>) {
    let msg = CreateInteractionResponseMessage::new()
        .content(content)
        .ephemeral(true);
    if let Err(e) = comp
        .create_response(&ctx.http, CreateInteractionResponse::Message(msg))
        .await
    {
        log::warn!("failed to answer button `{}`: {}", comp.data.custom_id, e);
    }
}
