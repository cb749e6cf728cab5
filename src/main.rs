use guppi::commands::{self, automod};
use guppi::config::{parse_snowflake, Config, Credentials};
use guppi::db::Database;
use guppi::locale::Locales;
use guppi::services::settings::{SettingsStore, StdinPrompt, BOT_TOKEN, STATUS_CHANNEL};
use guppi::services::word_filter::WordFilterStore;
use guppi::status::{self, watcher::VersionWatcher, ReporterHandle};
use guppi::{logging, Data, Error};
use poise::serenity_prelude as serenity;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let started = Instant::now();

    let config = Config::from_env()?;
    logging::init(&config.log_file)?;

    let db = Database::open(&config.database_url)?;
    db.execute_init()?;

    let credentials = bootstrap_credentials(&db)?;
    let locales = Arc::new(Locales::load(&config.locale_dir, &config.default_locale)?);
    let filters = WordFilterStore::new(config.filter_dir.clone());

    let mut owners = HashSet::new();
    if let Some(owner_id) = config.owner_id {
        owners.insert(serenity::UserId::new(owner_id.get()));
    }

    let token = credentials.bot_token.clone();
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::list(),
            owners,
            on_error: |error| Box::pin(commands::on_error(error)),
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {} ({})", ready.user.name, ready.user.id);
                match config.dev_guild_id {
                    Some(guild_id) => {
                        poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            serenity::GuildId::new(guild_id.get()),
                        )
                        .await?
                    }
                    None => {
                        poise::builtins::register_globally(ctx, &framework.options().commands)
                            .await?
                    }
                }

                ctx.set_activity(Some(serenity::ActivityData::watching(
                    &config.status_activity,
                )));

                let watcher =
                    VersionWatcher::capture(config.version_file.clone(), config.version_poll_interval);
                let version = watcher.baseline().map(str::to_string);
                println!("Version: {}", version.as_deref().unwrap_or("unknown"));

                let data = Data {
                    config,
                    credentials,
                    db,
                    locales,
                    filters,
                    started,
                    version,
                    bot_id: ready.user.id.get(),
                    reporter: ReporterHandle::default(),
                };

                if let Err(e) = status::launch(ctx.http.clone(), &data).await {
                    error!("Status dashboard unavailable: {}", e);
                }
                tokio::spawn(watcher.run());

                info!("Bot is ready!");
                Ok(data)
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_MESSAGES;

    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create client: {}", e))?;

    info!("Starting bot...");
    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    Ok(())
}

/// Reads the token and status channel from the settings table, asking on the
/// terminal for anything missing.
fn bootstrap_credentials(db: &Database) -> anyhow::Result<Credentials> {
    let settings = SettingsStore::new(db.clone());
    let mut prompt = StdinPrompt;
    let bot_token = settings.ensure(BOT_TOKEN, None, &mut prompt)?;
    let status_channel_id =
        settings.ensure_with(STATUS_CHANNEL, None, &mut prompt, parse_snowflake)?;
    Ok(Credentials {
        bot_token,
        status_channel_id,
    })
}

async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            if let Err(e) = automod::censor_message(ctx, new_message, data).await {
                error!("Word filter failed on message {}: {}", new_message.id, e);
            }
        }
        serenity::FullEvent::InteractionCreate { interaction } => {
            if let Some(component) = interaction.as_message_component() {
                status::handle_component(ctx, component, framework, data).await?;
            }
        }
        serenity::FullEvent::GuildCreate { guild, is_new } => {
            if *is_new == Some(true) {
                info!("Joined guild {} ({})", guild.name, guild.id);
                if let Err(e) = data.filters.ensure_file(guild.id.get()) {
                    error!("Failed to prepare filter list for guild {}: {}", guild.id, e);
                }
            }
        }
        _ => {}
    }
    Ok(())
}
