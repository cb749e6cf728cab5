use crate::commands::{render, say_ephemeral, text, truncate_chars};
use crate::locale::MessageKey;
use crate::services::word_filter::{is_valid_entry, normalize_term, FilterList};
use crate::{Context, Data, Error};
use poise::serenity_prelude as serenity;
use tracing::{debug, info};

pub const CENSOR_COLOR: u32 = 0xe74c3c;
const EMBED_FIELD_MAX: usize = 1024;

/// Manage the word filter of this server
#[poise::command(
    slash_command,
    subcommands("list_filterwords", "add_filterword", "remove_filterword"),
    guild_only
)]
pub async fn automod(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Lists all filtered words and their replacements
#[poise::command(slash_command, guild_only)]
pub async fn list_filterwords(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("not in a guild")?;
    let list = ctx.data().filters.load(guild_id.get())?;
    let content = if list.is_empty() {
        text(ctx, MessageKey::FilterListEmpty)
    } else {
        format!("{}\n{}", text(ctx, MessageKey::FilterListHeader), format_list(&list))
    };
    say_ephemeral(ctx, truncate_chars(&content, 2000)).await
}

/// Adds a word to the filter
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn add_filterword(
    ctx: Context<'_>,
    #[description = "The word to filter"] word: String,
    #[description = "What the word is replaced with"] filtered: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("not in a guild")?;
    let word = normalize_term(&word);
    let replacement = normalize_term(&filtered);
    if !is_valid_entry(&word, &replacement) {
        return say_ephemeral(ctx, text(ctx, MessageKey::FilterInvalid)).await;
    }

    let added = ctx.data().filters.add(guild_id.get(), &word, &replacement)?;
    let reply = if added {
        info!("Guild {}: filtering '{}' as '{}'", guild_id, word, replacement);
        render(
            ctx,
            MessageKey::FilterAdded,
            &[("word", word.as_str()), ("replacement", replacement.as_str())],
        )
    } else {
        render(ctx, MessageKey::FilterExists, &[("word", word.as_str())])
    };
    say_ephemeral(ctx, reply).await
}

/// Removes a word from the filter
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn remove_filterword(
    ctx: Context<'_>,
    #[description = "The word to stop filtering"] word: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("not in a guild")?;
    let word = normalize_term(&word);
    let reply = if ctx.data().filters.remove(guild_id.get(), &word)? {
        info!("Guild {}: no longer filtering '{}'", guild_id, word);
        render(ctx, MessageKey::FilterRemoved, &[("word", word.as_str())])
    } else {
        render(ctx, MessageKey::FilterMissing, &[("word", word.as_str())])
    };
    say_ephemeral(ctx, reply).await
}

fn format_list(list: &FilterList) -> String {
    list.entries()
        .iter()
        .map(|entry| format!("{} - {}", entry.word, entry.replacement))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Replaces a guild message containing filtered words with a censored copy.
/// Returns `true` if the message was censored.
pub async fn censor_message(
    ctx: &serenity::Context,
    message: &serenity::Message,
    data: &Data,
) -> anyhow::Result<bool> {
    if message.author.bot || message.author.id.get() == data.bot_id {
        return Ok(false);
    }
    let Some(guild_id) = message.guild_id else {
        return Ok(false);
    };
    let list = data.filters.load(guild_id.get())?;
    let Some(censored) = list.censor(&message.content) else {
        return Ok(false);
    };

    debug!("Censoring message {} in guild {}", message.id, guild_id);
    let author = serenity::CreateEmbedAuthor::new(author_name(message)).icon_url(message.author.face());
    let embed = serenity::CreateEmbed::new()
        .color(CENSOR_COLOR)
        .author(author)
        .field(
            data.locales.text(None, MessageKey::CensoredField),
            censored_field_value(&censored, data.locales.text(None, MessageKey::CensoredEmpty)),
            false,
        );
    // The original is only deleted once its copy is posted.
    message
        .channel_id
        .send_message(&ctx.http, serenity::CreateMessage::new().embed(embed))
        .await?;
    message
        .channel_id
        .delete_message(&ctx.http, message.id)
        .await?;
    Ok(true)
}

/// Embed field values must be non-empty and at most 1024 characters.
fn censored_field_value(censored: &str, placeholder: &str) -> String {
    if censored.trim().is_empty() {
        placeholder.to_string()
    } else {
        truncate_chars(censored, EMBED_FIELD_MAX)
    }
}

fn author_name(message: &serenity::Message) -> String {
    message
        .member
        .as_ref()
        .and_then(|m| m.nick.clone())
        .or_else(|| message.author.global_name.clone())
        .unwrap_or_else(|| message.author.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_list() {
        let list = FilterList::parse("# header\nheck-h*ck\ndarn-d**n\n");
        assert_eq!(format_list(&list), "heck - h*ck\ndarn - d**n");
    }

    #[test]
    fn test_censored_field_value() {
        let list = FilterList::parse("heck-");
        let censored = list.censor("HECK").unwrap();
        assert_eq!(censored, "");
        assert_eq!(censored_field_value(&censored, "(nothing left)"), "(nothing left)");
        assert_eq!(censored_field_value("  ", "-"), "-");
        assert_eq!(censored_field_value("well h*ck", "-"), "well h*ck");

        let long = "a".repeat(EMBED_FIELD_MAX + 10);
        assert_eq!(censored_field_value(&long, "-").chars().count(), EMBED_FIELD_MAX);
    }
}
