use std::sync::Arc;

use serenity::{
    async_trait,
    builder::{
        CreateCommand, CreateCommandOption, CreateEmbed, CreateInteractionResponse,
        CreateInteractionResponseMessage, EditInteractionResponse,
    },
    client::{Context, EventHandler},
    model::{
        application::{Command, CommandInteraction, CommandOptionType, ComponentInteraction, Interaction},
        gateway::Ready,
        id::{ChannelId, GuildId, UserId},
        permissions::Permissions,
        voice::VoiceState,
    },
};

use super::{
    announce::DiscordAnnouncer,
    backend::AudioBackend,
    controls::{self, Control},
    embeds,
    service::MusicService,
};
use crate::{
    error::{ControlError, PlayError},
    interaction::{self, can_manage_guild, str_option},
};

pub struct Handler<B: AudioBackend> {
    service: Arc<MusicService<B, DiscordAnnouncer>>,
}

impl<B: AudioBackend> Handler<B> {
    pub fn new(service: Arc<MusicService<B, DiscordAnnouncer>>) -> Self {
        Self { service }
    }
}

fn commands() -> Vec<CreateCommand> {
    let control = |name: &str, description: &str| {
        CreateCommand::new(name)
            .description(description)
            .dm_permission(false)
    };

    vec![
        CreateCommand::new("play")
            .description("Adds a song or playlist to the queue.")
            .add_option(
                CreateCommandOption::new(CommandOptionType::String, "query", "Song name or URL.")
                    .required(true),
            )
            .dm_permission(false),
        control("pause", "Pauses the current song."),
        control("resume", "Resumes the current song."),
        control("skip", "Skips the currently playing song."),
        control("shuffle", "Shuffles the queue."),
        control("stop", "Stops playback and clears the queue."),
        control("queue", "Shows the queue."),
        control("nowplaying", "Shows the current song with playback controls."),
        control("leave", "Leaves the voice channel."),
        control("autoplay", "Toggles playing similar music when the queue runs out.")
            .default_member_permissions(Permissions::MANAGE_GUILD),
        control("247", "Toggles staying in the voice channel while idle.")
            .default_member_permissions(Permissions::MANAGE_GUILD),
    ]
}

#[async_trait]
impl<B: AudioBackend> EventHandler for Handler<B> {
    async fn ready(&self, ctx: Context, ready: Ready) {
        log::info!("music bot ready as {}", ready.user.name);

        if let Err(e) = Command::set_global_commands(&ctx.http, commands()).await {
            log::error!("failed to register music commands: {}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(cmd) => self.handle_command(&ctx, &cmd).await,
            Interaction::Component(comp) => self.handle_button(&ctx, &comp).await,
            _ => {}
        }
    }

    async fn voice_state_update(&self, ctx: Context, _old: Option<VoiceState>, new: VoiceState) {
        let guild_id = match new.guild_id {
            Some(guild_id) => guild_id,
            None => return,
        };
        let bot_id = ctx.cache.current_user().id;

        if new.user_id == bot_id {
            match new.channel_id {
                None => {
                    // our own teardown also ends up here
                    if self.service.voice_channel(guild_id).await.is_some()
                        && self.service.teardown(guild_id).await
                    {
                        log::info!("disconnected from voice in guild {}", guild_id);
                    }
                    return;
                }
                Some(channel_id) => self.service.moved(guild_id, channel_id).await,
            }
        }

        let channel_id = match self.service.voice_channel(guild_id).await {
            Some(channel_id) => channel_id,
            None => return,
        };
        if let Some(present) = listeners_present(&ctx, guild_id, channel_id, bot_id) {
            self.service.set_listeners_present(guild_id, present).await;
        }
    }
}

/// Whether any human is in `channel_id`, from the cache.
fn listeners_present(ctx: &Context, guild_id: GuildId, channel_id: ChannelId, bot_id: UserId) -> Option<bool> {
    let guild = ctx.cache.guild(guild_id)?;
    let present = guild.voice_states.values().any(|vs| {
        let is_bot = vs
            .member
            .as_ref()
            .map(|m| m.user.bot)
            .or_else(|| guild.members.get(&vs.user_id).map(|m| m.user.bot))
            .unwrap_or(false);
        vs.channel_id == Some(channel_id) && vs.user_id != bot_id && !is_bot
    });
    Some(present)
}

fn user_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    ctx.cache
        .guild(guild_id)?
        .voice_states
        .get(&user_id)?
        .channel_id
}

impl<B: AudioBackend> Handler<B> {
    async fn handle_command(&self, ctx: &Context, cmd: &CommandInteraction) {
        let name = cmd.data.name.as_str();
        log::debug!("/{} from {} in {:?}", name, cmd.user.id, cmd.guild_id);

        if name == "play" {
            self.handle_play(ctx, cmd).await;
            return;
        }

        let guild_id = match cmd.guild_id {
            Some(guild_id) => guild_id,
            None => {
                interaction::reply(ctx, cmd, ControlError::NoGuildId.to_string(), true).await;
                return;
            }
        };

        if let Some(control) = Control::from_command(name) {
            let response = self.control(guild_id, cmd.user.id, control).await;
            respond_command(ctx, cmd, response).await;
            return;
        }

        match name {
            "queue" => match self.service.queue(guild_id).await {
                Some(view) => interaction::reply_embed(ctx, cmd, embeds::queue(&view), false).await,
                None => interaction::reply(ctx, cmd, ControlError::NotPlaying.to_string(), true).await,
            },
            "nowplaying" => self.handle_now_playing(ctx, cmd, guild_id).await,
            "leave" => {
                let response = self
                    .service
                    .leave(guild_id, cmd.user.id, can_manage_guild(cmd.member.as_deref()))
                    .await
                    .map(|_| "Left the voice channel.".to_string());
                respond_command(ctx, cmd, response).await;
            }
            "autoplay" => {
                let response = match require_manager(cmd) {
                    Ok(()) => self
                        .service
                        .toggle_autoplay(guild_id)
                        .await
                        .map(|on| format!("Autoplay is now **{}**.", on_off(on))),
                    Err(e) => Err(e),
                };
                respond_command(ctx, cmd, response).await;
            }
            "247" => {
                let response = match require_manager(cmd) {
                    Ok(()) => self
                        .service
                        .toggle_twenty_four_seven(guild_id)
                        .await
                        .map(|on| format!("24/7 mode is now **{}**.", on_off(on))),
                    Err(e) => Err(e),
                };
                respond_command(ctx, cmd, response).await;
            }
            _ => {}
        }
    }

    async fn handle_play(&self, ctx: &Context, cmd: &CommandInteraction) {
        if let Err(e) = cmd.defer(&ctx.http).await {
            log::warn!("failed to defer /play: {}", e);
            return;
        }

        let edit = match self.play(ctx, cmd).await {
            Ok(embed) => EditInteractionResponse::new().embed(embed),
            Err(e) => {
                if let PlayError::Unknown(inner) = &e {
                    log::error!("/play failed: {:?}", inner);
                }
                EditInteractionResponse::new().content(e.to_string())
            }
        };
        if let Err(e) = cmd.edit_response(&ctx.http, edit).await {
            log::warn!("failed to answer /play: {}", e);
        }
    }

    async fn play(&self, ctx: &Context, cmd: &CommandInteraction) -> Result<CreateEmbed, PlayError> {
        let guild_id = cmd.guild_id.ok_or(PlayError::NoGuildId)?;
        let query = str_option(cmd, "query").ok_or(PlayError::NoQuery)?;
        let voice_channel = user_channel(ctx, guild_id, cmd.user.id).ok_or(PlayError::NoChannel)?;

        let enqueued = self
            .service
            .play(guild_id, voice_channel, cmd.channel_id, cmd.user.id, query)
            .await?;
        Ok(embeds::added(&enqueued, &cmd.user))
    }

    async fn handle_now_playing(&self, ctx: &Context, cmd: &CommandInteraction, guild_id: GuildId) {
        let view = self.service.queue(guild_id).await;
        let track = match view.as_ref().and_then(|v| v.now_playing.as_ref()) {
            Some(track) => track,
            None => {
                interaction::reply(ctx, cmd, ControlError::NotPlaying.to_string(), true).await;
                return;
            }
        };
        let upcoming = view.as_ref().map_or(0, |v| v.total);

        let msg = CreateInteractionResponseMessage::new()
            .embed(embeds::now_playing(track, upcoming))
            .components(controls::buttons());
        if let Err(e) = cmd
            .create_response(&ctx.http, CreateInteractionResponse::Message(msg))
            .await
        {
            log::warn!("failed to answer /nowplaying: {}", e);
        }
    }

    async fn handle_button(&self, ctx: &Context, comp: &ComponentInteraction) {
        let control = match Control::from_custom_id(&comp.data.custom_id) {
            Some(control) => control,
            None => return,
        };
        let response = match comp.guild_id {
            Some(guild_id) => self.control(guild_id, comp.user.id, control).await,
            None => Err(ControlError::NoGuildId),
        };

        let content = match response {
            Ok(status) => status,
            Err(e) => {
                if let ControlError::Backend(inner) = &e {
                    log::error!("button {:?} failed: {}", control, inner);
                }
                e.to_string()
            }
        };
        interaction::reply_component(ctx, comp, content).await;
    }

    /// Runs a playback control and returns the status line to show.
    async fn control(&self, guild_id: GuildId, user: UserId, control: Control) -> Result<String, ControlError> {
        let service = &self.service;
        match control {
            Control::Pause => {
                let track = service.pause(guild_id, user).await?;
                Ok(format!("⏸ Paused **{}**.", track.title))
            }
            Control::Resume => {
                let track = service.resume(guild_id, user).await?;
                Ok(format!("▶ Resumed **{}**.", track.title))
            }
            Control::Skip => {
                let (skipped, next) = service.skip(guild_id, user).await?;
                Ok(match next {
                    Some(next) => format!("⏭ Skipped **{}**, now playing **{}**.", skipped.title, next.title),
                    None => format!("⏭ Skipped **{}**, the queue is empty.", skipped.title),
                })
            }
            Control::Shuffle => {
                let count = service.shuffle(guild_id, user).await?;
                Ok(format!("🔀 Shuffled {} songs.", count))
            }
            Control::Stop => {
                let cleared = service.stop(guild_id, user).await?;
                Ok(format!("⏹ Stopped playback and cleared {} songs.", cleared))
            }
        }
    }
}

fn require_manager(cmd: &CommandInteraction) -> Result<(), ControlError> {
    if can_manage_guild(cmd.member.as_deref()) {
        Ok(())
    } else {
        Err(ControlError::MissingPermission)
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

async fn respond_command(ctx: &Context, cmd: &CommandInteraction, response: Result<String, ControlError>) {
    match response {
        Ok(status) => interaction::reply(ctx, cmd, status, false).await,
        Err(e) => {
            if let ControlError::Backend(inner) = &e {
                log::error!("/{} failed: {}", cmd.data.name, inner);
            }
            interaction::reply(ctx, cmd, e.to_string(), true).await;
        }
    }
}
