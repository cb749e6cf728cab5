use crate::commands::{say_ephemeral, text};
use crate::locale::MessageKey;
use crate::{status, Context, Error};
use tracing::info;

/// Shut down the bot (Owner only)
#[poise::command(slash_command, owners_only, hide_in_help)]
pub async fn shutdown(ctx: Context<'_>) -> Result<(), Error> {
    info!("Shutdown command received from owner: {}", ctx.author().name);
    say_ephemeral(ctx, text(ctx, MessageKey::ShuttingDown)).await?;
    ctx.data().reporter.stop();
    println!("Bot Closed");
    ctx.framework().shard_manager().shutdown_all().await;
    Ok(())
}

/// Restart the bot from scratch (Owner only)
#[poise::command(slash_command, owners_only, hide_in_help)]
pub async fn restart(ctx: Context<'_>) -> Result<(), Error> {
    info!("Restart command received from owner: {}", ctx.author().name);
    say_ephemeral(ctx, text(ctx, MessageKey::Restarting)).await?;
    ctx.data().reporter.stop();
    status::restart(ctx.serenity_context()).await
}
