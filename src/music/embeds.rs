use std::time::Duration;

use serenity::{
    builder::{CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter},
    model::user::User,
};

use super::{
    service::{Enqueued, QueueView},
    session::Track,
};

const COLOUR: u32 = 0x1db954;

fn length(track: &Track) -> String {
    if track.is_stream {
        return "live".to_string();
    }
    format_hms(track.length)
}

fn format_hms(d: Duration) -> String {
    let secs = d.as_secs();
    let (h, m, s) = (secs / 3600, secs / 60 % 60, secs % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

fn linked_title(track: &Track) -> String {
    match &track.uri {
        Some(uri) => format!("[{}]({})", track.title, uri),
        None => track.title.clone(),
    }
}

fn requester(track: &Track) -> String {
    match track.requester {
        Some(user) => format!("<@{}>", user),
        None => "autoplay".to_string(),
    }
}

pub fn added(enqueued: &Enqueued, user: &User) -> CreateEmbed {
    let mut author = CreateEmbedAuthor::new("Added to queue");
    if let Some(avatar) = user.avatar_url() {
        author = author.icon_url(avatar);
    }

    let track = &enqueued.first;
    let mut embed = CreateEmbed::new()
        .author(author)
        .colour(COLOUR)
        .title(track.title.as_str());

    if let Some(url) = track.uri.as_ref() {
        embed = embed.url(url);
    }
    if let Some(thumb) = track.artwork.as_ref() {
        embed = embed.thumbnail(thumb);
    }
    if let Some(playlist) = enqueued.playlist.as_ref() {
        embed = embed.description(format!(
            "Playlist **{}** with {} tracks",
            playlist, enqueued.count
        ));
    }

    let position = match enqueued.position {
        Some(pos) => pos.to_string(),
        None => "Playing now".to_string(),
    };
    embed
        .field("Position", position, true)
        .field("Length", length(track), true)
}

pub fn now_playing(track: &Track, upcoming: usize) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .author(CreateEmbedAuthor::new("Now playing"))
        .colour(COLOUR)
        .description(linked_title(track))
        .field("Artist", track.author.as_str(), true)
        .field("Length", length(track), true)
        .field("Requested by", requester(track), true)
        .footer(CreateEmbedFooter::new(format!("{} in queue", upcoming)));
    if let Some(thumb) = track.artwork.as_ref() {
        embed = embed.thumbnail(thumb);
    }
    embed
}

pub fn finished() -> CreateEmbed {
    CreateEmbed::new()
        .colour(COLOUR)
        .description("Queue finished. Use `/play` to add more songs.")
}

pub fn ended() -> CreateEmbed {
    CreateEmbed::new()
        .colour(COLOUR)
        .description("Session ended. See you next time!")
}

pub fn queue(view: &QueueView) -> CreateEmbed {
    let mut description = match &view.now_playing {
        Some(track) => format!(
            "**Now playing{}:** {} ({})\n\n",
            if view.paused { " (paused)" } else { "" },
            linked_title(track),
            requester(track)
        ),
        None => "Nothing is playing.\n\n".to_string(),
    };

    if view.upcoming.is_empty() {
        description.push_str("The queue is empty.");
    }
    for (i, track) in view.upcoming.iter().enumerate() {
        description.push_str(&format!(
            "`{}.` {} `{}`\n",
            i + 1,
            linked_title(track),
            length(track)
        ));
    }
    if view.total > view.upcoming.len() {
        description.push_str(&format!("…and {} more", view.total - view.upcoming.len()));
    }

    let flag = |on: bool| if on { "on" } else { "off" };
    CreateEmbed::new()
        .title("Queue")
        .colour(COLOUR)
        .description(description)
        .footer(CreateEmbedFooter::new(format!(
            "autoplay {} · 24/7 {}",
            flag(view.autoplay),
            flag(view.twenty_four_seven)
        )))
}
