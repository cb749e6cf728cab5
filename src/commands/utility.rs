use crate::commands::{render, say_ephemeral, text};
use crate::locale::MessageKey;
use crate::{Context, Error};
use poise::serenity_prelude as serenity;
use tracing::{info, warn};

/// Discord refuses bulk deletion of messages older than two weeks.
const BULK_DELETE_MAX_AGE_SECS: i64 = 14 * 24 * 60 * 60;
const BULK_DELETE_CHUNK: usize = 100;
const HISTORY_PAGE: u8 = 100;

/// Small server tools
#[poise::command(
    slash_command,
    subcommands("servericon", "useravatar", "clear"),
    guild_only
)]
pub async fn utility(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Posts the icon of this server
#[poise::command(slash_command, guild_only)]
pub async fn servericon(ctx: Context<'_>) -> Result<(), Error> {
    let icon = ctx.guild().and_then(|guild| guild.icon_url());
    match icon {
        Some(url) => {
            ctx.say(url).await?;
        }
        None => say_ephemeral(ctx, text(ctx, MessageKey::NoServerIcon)).await?,
    }
    Ok(())
}

/// Posts the avatar of a member
#[poise::command(slash_command, guild_only)]
pub async fn useravatar(
    ctx: Context<'_>,
    #[description = "Whose avatar to show"] member: serenity::Member,
) -> Result<(), Error> {
    ctx.say(member.face()).await?;
    Ok(())
}

/// Deletes recent messages in this channel
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn clear(
    ctx: Context<'_>,
    #[description = "How many messages to delete"]
    #[min = 1]
    #[max = 1000]
    amount: u32,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    let http = &ctx.serenity_context().http;
    let channel = ctx.channel_id();

    let messages = recent_messages(ctx, amount as usize).await?;
    let count = messages.len();
    let key = if count == 1 {
        MessageKey::ClearOne
    } else {
        MessageKey::ClearMany
    };
    say_ephemeral(ctx, render(ctx, key, &[("count", count.to_string().as_str())])).await?;

    let now = chrono::Utc::now().timestamp();
    let plan = plan_deletion(messages, |m| m.timestamp.unix_timestamp(), now);
    for chunk in &plan.bulk {
        if let [single] = chunk.as_slice() {
            channel.delete_message(http, single.id).await?;
        } else {
            channel.delete_messages(http, chunk).await?;
        }
    }
    for message in &plan.single {
        if let Err(e) = channel.delete_message(http, message.id).await {
            warn!("Failed to delete message {}: {}", message.id, e);
        }
    }
    info!(
        "Cleared {} messages in channel {} for {}",
        count,
        channel,
        ctx.author().name
    );
    Ok(())
}

/// Newest-first history of the invoking channel, at most `limit` messages.
async fn recent_messages(ctx: Context<'_>, limit: usize) -> Result<Vec<serenity::Message>, Error> {
    let http = &ctx.serenity_context().http;
    let mut collected: Vec<serenity::Message> = Vec::with_capacity(limit);
    while collected.len() < limit {
        let remaining = (limit - collected.len()).min(HISTORY_PAGE as usize) as u8;
        let mut request = serenity::GetMessages::new().limit(remaining);
        if let Some(oldest) = collected.last() {
            request = request.before(oldest.id);
        }
        let page = ctx.channel_id().messages(http, request).await?;
        let exhausted = page.len() < remaining as usize;
        collected.extend(page);
        if exhausted {
            break;
        }
    }
    Ok(collected)
}

#[derive(Debug, PartialEq, Eq)]
struct DeletionPlan<T> {
    /// Chunks eligible for bulk deletion, at most 100 each
    bulk: Vec<Vec<T>>,
    /// Messages too old for bulk deletion
    single: Vec<T>,
}

fn plan_deletion<T>(items: Vec<T>, created_at: impl Fn(&T) -> i64, now: i64) -> DeletionPlan<T> {
    // A minute of slack so nothing crosses the limit while we work.
    let cutoff = now - BULK_DELETE_MAX_AGE_SECS + 60;
    let (recent, single): (Vec<T>, Vec<T>) = items.into_iter().partition(|m| created_at(m) > cutoff);

    let mut bulk = Vec::new();
    let mut iter = recent.into_iter().peekable();
    while iter.peek().is_some() {
        bulk.push(iter.by_ref().take(BULK_DELETE_CHUNK).collect());
    }
    DeletionPlan { bulk, single }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn test_plan_chunks_recent_messages() {
        let items: Vec<(u64, i64)> = (0..250).map(|i| (i, NOW - i as i64)).collect();
        let plan = plan_deletion(items, |m| m.1, NOW);
        assert!(plan.single.is_empty());
        let sizes: Vec<_> = plan.bulk.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
        assert_eq!(plan.bulk[0][0].0, 0);
        assert_eq!(plan.bulk[2][49].0, 249);
    }

    #[test]
    fn test_plan_separates_old_messages() {
        let items = vec![
            (1u64, NOW - 10),
            (2, NOW - BULK_DELETE_MAX_AGE_SECS - 5),
            (3, NOW - 20),
        ];
        let plan = plan_deletion(items, |m| m.1, NOW);
        assert_eq!(plan.bulk, vec![vec![(1, NOW - 10), (3, NOW - 20)]]);
        assert_eq!(plan.single, vec![(2, NOW - BULK_DELETE_MAX_AGE_SECS - 5)]);
    }

    #[test]
    fn test_plan_empty() {
        let plan = plan_deletion(Vec::<(u64, i64)>::new(), |m| m.1, NOW);
        assert!(plan.bulk.is_empty());
        assert!(plan.single.is_empty());
    }
}
