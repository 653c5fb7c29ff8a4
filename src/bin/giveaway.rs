use anyhow::Result;
use guildbots::{config::Config, giveaway::Handler, keepalive};
use serenity::{model::id::ApplicationId, prelude::GatewayIntents, Client};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = Config::from_path(&Config::path_from_args("giveaway.toml"))?;
    if let Some(keepalive) = &config.keepalive {
        keepalive::spawn(keepalive).await?;
    }

    Client::builder(&config.token, GatewayIntents::non_privileged())
        .event_handler(Handler::default())
        .application_id(ApplicationId::new(config.app_id))
        .await?
        .start()
        .await?;

    Ok(())
}
