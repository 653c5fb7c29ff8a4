//! The poll bot: one question, up to twenty choices, answered with
//! regional-indicator reactions.

use serenity::{
    async_trait,
    builder::{
        CreateCommand, CreateCommandOption, CreateEmbed, CreateEmbedFooter, CreateInteractionResponse,
        CreateInteractionResponseMessage,
    },
    client::{Context, EventHandler},
    model::{
        application::{Command, CommandInteraction, CommandOptionType, Interaction},
        channel::ReactionType,
        gateway::Ready,
    },
};

use crate::{
    error::PollError,
    interaction::{self, str_option},
};

pub const MAX_CHOICES: usize = 20;
/// Keeps the embed title under Discord's 256 character limit.
pub const MAX_QUESTION_LEN: usize = 200;
const MAX_CHOICE_LEN: u16 = 100;
const COLOUR: u32 = 0x5865f2;

/// `choice_a` through `choice_t`.
pub fn choice_option_name(index: usize) -> String {
    format!("choice_{}", (b'a' + index as u8) as char)
}

/// 🇦 for 0, 🇧 for 1 and so on.
pub fn choice_emoji(index: usize) -> String {
    char::from_u32(0x1F1E6 + index as u32)
        .map(String::from)
        .unwrap_or_default()
}

#[derive(Debug, PartialEq, Eq)]
pub struct Poll {
    pub question: String,
    /// `(emoji, text)` in display order.
    pub choices: Vec<(String, String)>,
}

impl Poll {
    /// Builds a poll from raw option values. Blank choices are dropped and
    /// the rest are lettered in order, so a gap in the options leaves no
    /// gap in the letters.
    pub fn new<'a>(question: &str, options: impl IntoIterator<Item = Option<&'a str>>) -> Result<Self, PollError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PollError::NoQuestion);
        }
        if question.chars().count() > MAX_QUESTION_LEN {
            return Err(PollError::QuestionTooLong(MAX_QUESTION_LEN));
        }

        let choices: Vec<(String, String)> = options
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .take(MAX_CHOICES)
            .enumerate()
            .map(|(i, c)| (choice_emoji(i), c.to_string()))
            .collect();
        if choices.len() < 2 {
            return Err(PollError::NotEnoughChoices);
        }

        Ok(Self {
            question: question.to_string(),
            choices,
        })
    }

    fn embed(&self, author: &str) -> CreateEmbed {
        let body = self
            .choices
            .iter()
            .map(|(emoji, text)| format!("{} {}", emoji, text))
            .collect::<Vec<_>>()
            .join("\n");
        CreateEmbed::new()
            .title(format!("📊 {}", self.question))
            .colour(COLOUR)
            .description(body)
            .footer(CreateEmbedFooter::new(format!("Poll by {}", author)))
    }
}

fn commands() -> Vec<CreateCommand> {
    let mut poll = CreateCommand::new("poll")
        .description("Starts a poll.")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "question", "What to ask.")
                .max_length(MAX_QUESTION_LEN as u16)
                .required(true),
        );
    for i in 0..MAX_CHOICES {
        let letter = (b'A' + i as u8) as char;
        poll = poll.add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                choice_option_name(i),
                format!("Choice {}", letter),
            )
            .max_length(MAX_CHOICE_LEN)
            .required(i < 2),
        );
    }
    vec![poll.dm_permission(false)]
}

pub struct Handler;

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        log::info!("poll bot ready as {}", ready.user.name);

        if let Err(e) = Command::set_global_commands(&ctx.http, commands()).await {
            log::error!("failed to register poll commands: {}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let cmd = match interaction {
            Interaction::Command(cmd) if cmd.data.name == "poll" => cmd,
            _ => return,
        };

        if let Err(e) = post_poll(&ctx, &cmd).await {
            if let PollError::Discord(inner) = &e {
                log::error!("/poll failed: {}", inner);
            }
            interaction::reply(&ctx, &cmd, e.to_string(), true).await;
        }
    }
}

async fn post_poll(ctx: &Context, cmd: &CommandInteraction) -> Result<(), PollError> {
    let question = str_option(cmd, "question").ok_or(PollError::NoQuestion)?;
    let poll = Poll::new(
        question,
        (0..MAX_CHOICES).map(|i| str_option(cmd, &choice_option_name(i))),
    )?;

    let msg = CreateInteractionResponseMessage::new().embed(poll.embed(&cmd.user.name));
    cmd.create_response(&ctx.http, CreateInteractionResponse::Message(msg))
        .await?;

    // react on the message we just posted, in choice order
    let message = cmd.get_response(&ctx.http).await?;
    for (emoji, _) in &poll.choices {
        message
            .react(&ctx.http, ReactionType::Unicode(emoji.clone()))
            .await?;
    }

    log::debug!(
        "poll `{}` with {} choices posted in {}",
        poll.question,
        poll.choices.len(),
        cmd.channel_id
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_names_run_a_to_t() {
        assert_eq!(choice_option_name(0), "choice_a");
        assert_eq!(choice_option_name(19), "choice_t");
    }

    #[test]
    fn emoji_are_regional_indicators() {
        assert_eq!(choice_emoji(0), "🇦");
        assert_eq!(choice_emoji(1), "🇧");
        assert_eq!(choice_emoji(19), "🇹");
    }

    #[test]
    fn gaps_and_blanks_are_compacted() {
        let poll = Poll::new(
            " Lunch? ",
            vec![Some("pizza"), None, Some("  "), Some(" tacos ")],
        )
        .unwrap();

        assert_eq!(poll.question, "Lunch?");
        assert_eq!(
            poll.choices,
            vec![
                ("🇦".to_string(), "pizza".to_string()),
                ("🇧".to_string(), "tacos".to_string()),
            ]
        );
    }

    #[test]
    fn twenty_choices_fit() {
        let texts: Vec<String> = (0..MAX_CHOICES).map(|i| i.to_string()).collect();
        let poll = Poll::new("q", texts.iter().map(|t| Some(t.as_str()))).unwrap();
        assert_eq!(poll.choices.len(), MAX_CHOICES);
        assert_eq!(poll.choices[19].0, "🇹");
    }

    #[test]
    fn needs_a_question_and_two_choices() {
        assert!(matches!(
            Poll::new("  ", vec![Some("a"), Some("b")]),
            Err(PollError::NoQuestion)
        ));
        assert!(matches!(
            Poll::new("q", vec![Some("a"), Some(" ")]),
            Err(PollError::NotEnoughChoices)
        ));
    }

    #[test]
    fn overlong_question_is_refused() {
        let question = "?".repeat(MAX_QUESTION_LEN + 1);
        assert!(matches!(
            Poll::new(&question, vec![Some("a"), Some("b")]),
            Err(PollError::QuestionTooLong(MAX_QUESTION_LEN))
        ));
        assert!(Poll::new(&question[1..], vec![Some("a"), Some("b")]).is_ok());
    }
}
