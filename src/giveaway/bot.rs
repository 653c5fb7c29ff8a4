use std::{future::Future, sync::Arc};

use serenity::{
    async_trait,
    builder::{
        CreateCommand, CreateCommandOption, CreateEmbed, CreateEmbedFooter, CreateMessage,
        EditInteractionResponse, EditMessage,
    },
    client::{Context, EventHandler},
    http::Http,
    model::{
        application::{Command, CommandInteraction, CommandOptionType, Interaction},
        channel::{ChannelType, ReactionType},
        gateway::Ready,
        id::{ChannelId, GuildId, MessageId, UserId},
        permissions::Permissions,
        Timestamp,
    },
};

use super::{
    draw, duration,
    store::{Giveaway, Giveaways},
};
use crate::{
    error::GiveawayError,
    interaction::{can_manage_guild, channel_option, int_option, str_option},
};

const ENTRY_EMOJI: &str = "🎉";
const MAX_WINNERS: u64 = 20;
/// Keeps the embed title under Discord's 256 character limit.
const MAX_PRIZE_LEN: usize = 200;
const COLOUR: u32 = 0xf1c40f;

#[derive(Default)]
pub struct Handler {
    store: Arc<Giveaways>,
}

fn commands() -> Vec<CreateCommand> {
    let message_id = || {
        CreateCommandOption::new(
            CommandOptionType::String,
            "message_id",
            "ID or link of the giveaway message.",
        )
        .required(true)
    };

    vec![
        CreateCommand::new("start")
            .description("Starts a giveaway.")
            .add_option(
                CreateCommandOption::new(CommandOptionType::Channel, "channel", "Where to post the giveaway.")
                    .channel_types(vec![ChannelType::Text, ChannelType::News])
                    .required(true),
            )
            .add_option(
                CreateCommandOption::new(CommandOptionType::String, "duration", "How long it runs, e.g. 1h30m.")
                    .required(true),
            )
            .add_option(
                CreateCommandOption::new(CommandOptionType::String, "prize", "What the winners get.")
                    .max_length(MAX_PRIZE_LEN as u16)
                    .required(true),
            )
            .add_option(
                CreateCommandOption::new(CommandOptionType::Integer, "winners", "How many winners to draw.")
                    .min_int_value(1)
                    .max_int_value(MAX_WINNERS)
                    .required(true),
            ),
        CreateCommand::new("end")
            .description("Ends a giveaway now.")
            .add_option(message_id()),
        CreateCommand::new("reroll")
            .description("Draws new winners for an ended giveaway.")
            .add_option(message_id())
            .add_option(
                CreateCommandOption::new(CommandOptionType::Integer, "winners", "How many winners to draw.")
                    .min_int_value(1)
                    .max_int_value(MAX_WINNERS),
            ),
        CreateCommand::new("giveaways").description("Lists running giveaways."),
    ]
    .into_iter()
    .map(|cmd| {
        cmd.dm_permission(false)
            .default_member_permissions(Permissions::MANAGE_GUILD)
    })
    .collect()
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        log::info!("giveaway bot ready as {}", ready.user.name);

        if let Err(e) = Command::set_global_commands(&ctx.http, commands()).await {
            log::error!("failed to register giveaway commands: {}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let cmd = match interaction {
            Interaction::Command(cmd) => cmd,
            _ => return,
        };

        if let Err(e) = cmd.defer_ephemeral(&ctx.http).await {
            log::warn!("failed to defer /{}: {}", cmd.data.name, e);
            return;
        }

        let response = match cmd.data.name.as_str() {
            "start" => self.start(&ctx, &cmd).await,
            "end" => self.end(&ctx, &cmd).await,
            "reroll" => self.reroll(&ctx, &cmd).await,
            "giveaways" => self.list(&cmd),
            _ => return,
        };

        let edit = match response {
            Ok(edit) => edit,
            Err(e) => {
                if let GiveawayError::Discord(inner) = &e {
                    log::error!("/{} failed: {}", cmd.data.name, inner);
                }
                EditInteractionResponse::new().content(e.to_string())
            }
        };
        if let Err(e) = cmd.edit_response(&ctx.http, edit).await {
            log::warn!("failed to answer /{}: {}", cmd.data.name, e);
        }
    }
}

fn authorize(cmd: &CommandInteraction) -> Result<GuildId, GiveawayError> {
    let guild_id = cmd.guild_id.ok_or(GiveawayError::NoGuildId)?;
    if !can_manage_guild(cmd.member.as_deref()) {
        return Err(GiveawayError::MissingPermission);
    }
    Ok(guild_id)
}

fn winner_count(raw: i64) -> Result<u64, GiveawayError> {
    match u64::try_from(raw) {
        Ok(n) if (1..=MAX_WINNERS).contains(&n) => Ok(n),
        _ => Err(GiveawayError::InvalidWinners(MAX_WINNERS)),
    }
}

/// Accepts a raw message ID or a message link.
fn parse_message_id(raw: &str) -> Result<MessageId, GiveawayError> {
    let invalid = || GiveawayError::InvalidMessageId(raw.to_string());
    let last = raw.trim().trim_end_matches('/').rsplit('/').next().ok_or_else(invalid)?;
    match last.parse::<u64>() {
        Ok(id) if id != 0 => Ok(MessageId::new(id)),
        _ => Err(invalid()),
    }
}

fn running_embed(g: &Giveaway) -> CreateEmbed {
    CreateEmbed::new()
        .title(format!("{} {}", ENTRY_EMOJI, g.prize))
        .colour(COLOUR)
        .description(format!(
            "React with {} to enter!\nEnds <t:{}:R> (<t:{}:f>)\nHosted by <@{}>",
            ENTRY_EMOJI, g.ends_at, g.ends_at, g.host
        ))
        .footer(CreateEmbedFooter::new(winners_label(g.winners)))
}

fn ended_embed(g: &Giveaway, winners: &[UserId]) -> CreateEmbed {
    let result = if winners.is_empty() {
        "No valid entrants.".to_string()
    } else {
        format!("Winners: {}", draw::mentions(winners))
    };
    CreateEmbed::new()
        .title(format!("{} {}", ENTRY_EMOJI, g.prize))
        .description(format!(
            "Ended <t:{}:R>\n{}\nHosted by <@{}>",
            g.ends_at, result, g.host
        ))
        .footer(CreateEmbedFooter::new(format!("{} · ended", winners_label(g.winners))))
}

fn winners_label(n: u64) -> String {
    if n == 1 {
        "1 winner".to_string()
    } else {
        format!("{} winners", n)
    }
}

/// Every human who reacted with the entry emoji, fetched page by page.
async fn fetch_entrants(http: &Http, channel_id: ChannelId, message_id: MessageId) -> Result<Vec<UserId>, GiveawayError> {
    const PAGE: u8 = 100;
    let mut reactors = Vec::new();
    let mut after: Option<UserId> = None;

    loop {
        let page = channel_id
            .reaction_users(
                http,
                message_id,
                ReactionType::Unicode(ENTRY_EMOJI.to_string()),
                Some(PAGE),
                after,
            )
            .await?;
        let full = page.len() == PAGE as usize;
        after = page.last().map(|u| u.id);
        reactors.extend(page.into_iter().map(|u| (u.id, u.bot)));
        if !full {
            break;
        }
    }

    Ok(draw::eligible(reactors))
}

/// Draws winners for a giveaway that was just taken out of the active set,
/// updates its message and announces the result.
async fn conclude(http: &Http, store: &Giveaways, message_id: MessageId, mut giveaway: Giveaway) -> Result<Vec<UserId>, GiveawayError> {
    giveaway.ends_at = giveaway.ends_at.min(Timestamp::now().unix_timestamp());
    store.finish(message_id, giveaway.clone());

    let entrants = fetch_entrants(http, giveaway.channel_id, message_id).await?;
    let winners = draw::winners(&entrants, giveaway.winners as usize);
    log::info!(
        "giveaway {} for `{}` ended with {} entrants, {} winners",
        message_id,
        giveaway.prize,
        entrants.len(),
        winners.len()
    );

    giveaway
        .channel_id
        .edit_message(http, message_id, EditMessage::new().embed(ended_embed(&giveaway, &winners)))
        .await?;

    let announcement = if winners.is_empty() {
        format!("Nobody entered the giveaway for **{}**.", giveaway.prize)
    } else {
        format!(
            "Congratulations {}! You won **{}**!",
            draw::mentions(&winners),
            giveaway.prize
        )
    };
    giveaway
        .channel_id
        .send_message(
            http,
            CreateMessage::new()
                .content(announcement)
                .reference_message((giveaway.channel_id, message_id)),
        )
        .await?;

    Ok(winners)
}

impl Handler {
    async fn start(&self, ctx: &Context, cmd: &CommandInteraction) -> Result<EditInteractionResponse, GiveawayError> {
        let guild_id = authorize(cmd)?;
        let channel_id = channel_option(cmd, "channel").ok_or(GiveawayError::MissingOption("channel"))?;
        let length = duration::parse(str_option(cmd, "duration").ok_or(GiveawayError::MissingOption("duration"))?)?;
        let prize = prize(str_option(cmd, "prize"))?;
        let winners = winner_count(int_option(cmd, "winners").unwrap_or(1))?;

        let giveaway = Giveaway {
            guild_id,
            channel_id,
            prize: prize.to_string(),
            winners,
            host: cmd.user.id,
            ends_at: Timestamp::now().unix_timestamp() + length.as_secs() as i64,
        };

        let message = channel_id
            .send_message(&ctx.http, CreateMessage::new().embed(running_embed(&giveaway)))
            .await?;
        let reacted = message
            .react(&ctx.http, ReactionType::Unicode(ENTRY_EMOJI.to_string()))
            .await
            .map(|_| ());
        // a giveaway nobody can enter must not stay posted
        undo_on_err(reacted, async {
            if let Err(e) = message.delete(&ctx.http).await {
                log::warn!("failed to remove giveaway message {}: {}", message.id, e);
            }
        })
        .await?;

        self.store.start(message.id, giveaway);
        let http = ctx.http.clone();
        let store = self.store.clone();
        let message_id = message.id;
        self.store.timers.schedule(message_id, length, async move {
            if let Some(giveaway) = store.take_active(message_id) {
                if let Err(e) = conclude(&http, &store, message_id, giveaway).await {
                    log::error!("failed to end giveaway {}: {}", message_id, e);
                }
            }
        });

        log::info!("giveaway {} for `{}` started in {}", message_id, prize, channel_id);
        Ok(EditInteractionResponse::new().content(format!(
            "Giveaway for **{}** started in <#{}>.",
            prize, channel_id
        )))
    }

    async fn end(&self, ctx: &Context, cmd: &CommandInteraction) -> Result<EditInteractionResponse, GiveawayError> {
        let guild_id = authorize(cmd)?;
        let message_id = parse_message_id(str_option(cmd, "message_id").ok_or(GiveawayError::MissingOption("message_id"))?)?;

        let giveaway = self
            .store
            .take_active_in(guild_id, message_id)
            .ok_or(GiveawayError::NotRunning)?;
        let prize = giveaway.prize.clone();
        let winners = conclude(&ctx.http, &self.store, message_id, giveaway).await?;

        Ok(EditInteractionResponse::new().content(format!(
            "Ended the giveaway for **{}** with {} winner(s).",
            prize,
            winners.len()
        )))
    }

    async fn reroll(&self, ctx: &Context, cmd: &CommandInteraction) -> Result<EditInteractionResponse, GiveawayError> {
        let guild_id = authorize(cmd)?;
        let message_id = parse_message_id(str_option(cmd, "message_id").ok_or(GiveawayError::MissingOption("message_id"))?)?;
        let giveaway = self
            .store
            .ended_in(guild_id, message_id)
            .ok_or(GiveawayError::NotEnded)?;
        let count = match int_option(cmd, "winners") {
            Some(raw) => winner_count(raw)?,
            None => giveaway.winners,
        };

        let entrants = fetch_entrants(&ctx.http, giveaway.channel_id, message_id).await?;
        let winners = draw::winners(&entrants, count as usize);
        if winners.is_empty() {
            return Ok(EditInteractionResponse::new().content("There are no valid entrants to reroll."));
        }

        giveaway
            .channel_id
            .send_message(
                &ctx.http,
                CreateMessage::new()
                    .content(format!(
                        "{} New winner(s) for **{}**: {}!",
                        ENTRY_EMOJI,
                        giveaway.prize,
                        draw::mentions(&winners)
                    ))
                    .reference_message((giveaway.channel_id, message_id)),
            )
            .await?;

        Ok(EditInteractionResponse::new().content(format!("Rerolled: {}", draw::mentions(&winners))))
    }

    fn list(&self, cmd: &CommandInteraction) -> Result<EditInteractionResponse, GiveawayError> {
        let guild_id = cmd.guild_id.ok_or(GiveawayError::NoGuildId)?;
        let running = self.store.active_in(guild_id);
        if running.is_empty() {
            return Ok(EditInteractionResponse::new().content("No giveaways are running."));
        }

        let lines: Vec<String> = running
            .iter()
            .map(|(id, g)| {
                format!(
                    "**{}** in <#{}>, ends <t:{}:R>, {} (`{}`)",
                    g.prize,
                    g.channel_id,
                    g.ends_at,
                    winners_label(g.winners),
                    id
                )
            })
            .collect();
        let embed = CreateEmbed::new()
            .title("Running giveaways")
            .colour(COLOUR)
            .description(lines.join("\n"));
        Ok(EditInteractionResponse::new().embed(embed))
    }
}

fn prize(raw: Option<&str>) -> Result<&str, GiveawayError> {
    let prize = raw
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or(GiveawayError::MissingOption("prize"))?;
    if prize.chars().count() > MAX_PRIZE_LEN {
        return Err(GiveawayError::PrizeTooLong(MAX_PRIZE_LEN));
    }
    Ok(prize)
}

/// Awaits `undo` if `result` failed, then hands `result` back.
async fn undo_on_err<T, E>(result: Result<T, E>, undo: impl Future<Output = ()>) -> Result<T, E> {
    if result.is_err() {
        undo.await;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prize_is_trimmed_and_bounded() {
        assert_eq!(prize(Some("  nitro ")).unwrap(), "nitro");
        assert!(matches!(prize(Some("   ")), Err(GiveawayError::MissingOption("prize"))));
        assert!(matches!(prize(None), Err(GiveawayError::MissingOption(_))));

        let long = "x".repeat(MAX_PRIZE_LEN + 1);
        assert!(matches!(prize(Some(&long)), Err(GiveawayError::PrizeTooLong(200))));
        let exact = "é".repeat(MAX_PRIZE_LEN);
        assert!(prize(Some(&exact)).is_ok());
    }

    #[tokio::test]
    async fn failed_setup_is_rolled_back() {
        let mut undone = false;
        let result: Result<(), &str> = undo_on_err(Err("react failed"), async { undone = true }).await;
        assert!(result.is_err());
        assert!(undone);

        let mut undone = false;
        let result: Result<u8, &str> = undo_on_err(Ok(3), async { undone = true }).await;
        assert_eq!(result, Ok(3));
        assert!(!undone);
    }

    #[test]
    fn message_ids_and_links() {
        assert_eq!(parse_message_id("123").unwrap(), MessageId::new(123));
        assert_eq!(
            parse_message_id("https://discord.com/channels/1/2/456").unwrap(),
            MessageId::new(456)
        );
        assert_eq!(parse_message_id(" 789/ ").unwrap(), MessageId::new(789));
        assert!(matches!(parse_message_id("0"), Err(GiveawayError::InvalidMessageId(_))));
        assert!(matches!(parse_message_id("abc"), Err(GiveawayError::InvalidMessageId(_))));
    }

    #[test]
    fn winner_count_bounds() {
        assert_eq!(winner_count(1).unwrap(), 1);
        assert_eq!(winner_count(20).unwrap(), 20);
        assert!(matches!(winner_count(0), Err(GiveawayError::InvalidWinners(20))));
        assert!(matches!(winner_count(21), Err(GiveawayError::InvalidWinners(_))));
        assert!(matches!(winner_count(-3), Err(GiveawayError::InvalidWinners(_))));
    }

    #[test]
    fn labels() {
        assert_eq!(winners_label(1), "1 winner");
        assert_eq!(winners_label(3), "3 winners");
    }
}
