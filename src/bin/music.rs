use std::sync::Arc;

use anyhow::Result;
use guildbots::{
    config::Config,
    keepalive,
    music::{announce::DiscordAnnouncer, lavalink::LavalinkBackend, service::MusicService, Handler},
};
use serenity::{http::Http, model::id::ApplicationId, prelude::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let path = Config::path_from_args("music.toml");
    let config = Config::from_path(&path)?;
    let lavalink = config.lavalink(&path)?;

    if let Some(keepalive) = &config.keepalive {
        keepalive::spawn(keepalive).await?;
    }

    let http = Arc::new(Http::new(&config.token));
    let bot_id = http.get_current_user().await?.id;
    let songbird = Songbird::serenity();

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let backend = LavalinkBackend::connect(lavalink, bot_id, songbird.clone(), events_tx).await;
    let service = MusicService::new(backend, DiscordAnnouncer::new(http), config.music.clone());

    let events_service = service.clone();
    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            events_service.handle_event(event).await;
        }
    });

    Client::builder(&config.token, GatewayIntents::non_privileged())
        .event_handler(Handler::new(service))
        .application_id(ApplicationId::new(config.app_id))
        .register_songbird_with(songbird)
        .await?
        .start()
        .await?;

    Ok(())
}
