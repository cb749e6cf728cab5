use crate::commands::{say_ephemeral, text};
use crate::locale::{Locales, MessageKey};
use crate::services::profile::{self, ProfileEntry, ProfileService, BIRTHDAY};
use crate::{Context, Data, Error};
use poise::serenity_prelude as serenity;
use std::time::Duration;
use tracing::{debug, info};

const ADD_SELECT_ID: &str = "aboutme_add";
const REMOVE_SELECT_ID: &str = "aboutme_remove";
const PROFILE_COLOR: u32 = 0x5865F2;
const CONFIGURE_TIMEOUT: Duration = Duration::from_secs(30);
const PROFILE_LIFETIME: Duration = Duration::from_secs(30);
const MODAL_TIMEOUT: Duration = Duration::from_secs(600);

/// Your personal profile card
#[poise::command(
    slash_command,
    subcommands("configure", "write", "other_user", "about_self"),
    guild_only
)]
pub async fn aboutme(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Choose which fields your profile shows
#[poise::command(slash_command, guild_only)]
pub async fn configure(ctx: Context<'_>) -> Result<(), Error> {
    let service = ProfileService::new(ctx.data().db.clone());
    let user_id = ctx.author().id.get();
    let locales = &ctx.data().locales;
    let locale = ctx.locale();

    let entries = service.entries(user_id).await?;
    let reply = ctx
        .send(
            poise::CreateReply::default()
                .components(configure_rows(locales, locale, &entries))
                .ephemeral(true),
        )
        .await?;
    let message = reply.message().await?.into_owned();

    while let Some(interaction) = message
        .await_component_interaction(ctx.serenity_context())
        .author_id(ctx.author().id)
        .timeout(CONFIGURE_TIMEOUT)
        .await
    {
        let serenity::ComponentInteractionDataKind::StringSelect { values } = &interaction.data.kind
        else {
            continue;
        };
        let shown = interaction.data.custom_id == ADD_SELECT_ID;
        if let Some(field) = values.first() {
            service.set_shown(user_id, field, shown).await?;
            debug!("User {} set field {} shown={}", user_id, field, shown);
        }

        let entries = service.entries(user_id).await?;
        interaction
            .create_response(
                ctx.serenity_context(),
                serenity::CreateInteractionResponse::UpdateMessage(
                    serenity::CreateInteractionResponseMessage::new()
                        .components(configure_rows(locales, locale, &entries)),
                ),
            )
            .await?;
    }

    if let Err(e) = reply.delete(ctx).await {
        debug!("Failed to expire aboutme configuration: {}", e);
    }
    Ok(())
}

/// Fill in the fields your profile shows
#[poise::command(slash_command, guild_only)]
pub async fn write(ctx: Context<'_>) -> Result<(), Error> {
    let poise::Context::Application(app_ctx) = ctx else {
        return Ok(());
    };
    let service = ProfileService::new(ctx.data().db.clone());
    let user_id = ctx.author().id.get();

    let entries = service.shown_entries(user_id).await?;
    if entries.is_empty() {
        return say_ephemeral(ctx, text(ctx, MessageKey::AboutmeNoOptions)).await;
    }

    let modal_id = format!("aboutme_write_{}", ctx.id());
    let modal = serenity::CreateModal::new(&modal_id, text(ctx, MessageKey::AboutmeModalTitle))
        .components(modal_rows(&entries));
    app_ctx
        .interaction
        .create_response(
            ctx.serenity_context(),
            serenity::CreateInteractionResponse::Modal(modal),
        )
        .await?;
    app_ctx
        .has_sent_initial_response
        .store(true, std::sync::atomic::Ordering::SeqCst);

    let Some(submission) = serenity::ModalInteractionCollector::new(ctx.serenity_context())
        .author_id(ctx.author().id)
        .custom_ids(vec![modal_id])
        .timeout(MODAL_TIMEOUT)
        .await
    else {
        return Ok(());
    };

    let values = submitted_values(&submission.data.components);
    info!("User {} updated {} profile fields", user_id, values.len());
    service.update_values(user_id, values).await?;

    let embed = profile_embed(ctx.data(), ctx.locale(), ctx.author()).await?;
    submission
        .create_response(
            ctx.serenity_context(),
            serenity::CreateInteractionResponse::Message(
                serenity::CreateInteractionResponseMessage::new()
                    .embed(embed)
                    .ephemeral(true),
            ),
        )
        .await?;
    Ok(())
}

/// Shows the profile of another member
#[poise::command(slash_command, guild_only, rename = "user")]
pub async fn other_user(
    ctx: Context<'_>,
    #[description = "Whose profile to show"] user: serenity::User,
) -> Result<(), Error> {
    show_profile(ctx, &user).await
}

/// Shows your own profile
#[poise::command(slash_command, guild_only, rename = "self")]
pub async fn about_self(ctx: Context<'_>) -> Result<(), Error> {
    let author = ctx.author().clone();
    show_profile(ctx, &author).await
}

#[poise::command(context_menu_command = "Aboutme", guild_only)]
pub async fn aboutme_user(ctx: Context<'_>, user: serenity::User) -> Result<(), Error> {
    show_profile(ctx, &user).await
}

/// Posts the profile card and removes it again after a while.
async fn show_profile(ctx: Context<'_>, user: &serenity::User) -> Result<(), Error> {
    let embed = profile_embed(ctx.data(), ctx.locale(), user).await?;
    let reply = ctx.send(poise::CreateReply::default().embed(embed)).await?;
    tokio::time::sleep(PROFILE_LIFETIME).await;
    if let Err(e) = reply.delete(ctx).await {
        debug!("Failed to remove aboutme card: {}", e);
    }
    Ok(())
}

/// Profile card with the fields `user` has chosen to show. An age field is
/// derived from a parseable birthday.
pub async fn profile_embed(
    data: &Data,
    locale: Option<&str>,
    user: &serenity::User,
) -> anyhow::Result<serenity::CreateEmbed> {
    let entries = ProfileService::new(data.db.clone())
        .shown_entries(user.id.get())
        .await?;
    let today = chrono::Local::now().date_naive();
    let display_name = user.global_name.as_deref().unwrap_or(&user.name);

    let mut author = serenity::CreateEmbedAuthor::new(data.locales.render(
        locale,
        MessageKey::AboutmeTitle,
        &[("user", display_name)],
    ));
    if let Some(avatar) = user.avatar_url() {
        author = author.icon_url(avatar);
    }

    let fields = profile_fields(&data.locales, locale, &entries, today);
    Ok(serenity::CreateEmbed::new()
        .color(PROFILE_COLOR)
        .author(author)
        .fields(fields.into_iter().map(|(name, value)| (name, value, false))))
}

/// Field name and value pairs in display order.
fn profile_fields(
    locales: &Locales,
    locale: Option<&str>,
    entries: &[ProfileEntry],
    today: chrono::NaiveDate,
) -> Vec<(String, String)> {
    let empty = locales.text(locale, MessageKey::AboutmeEmpty);
    let mut fields = Vec::with_capacity(entries.len() + 1);
    for entry in entries {
        let value = entry
            .value
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(empty);
        if entry.field == BIRTHDAY {
            if let Some(age) = profile::age_from_string(value, today) {
                fields.push((
                    locales.text(locale, MessageKey::AboutmeAge).to_string(),
                    age.to_string(),
                ));
            }
        }
        fields.push((entry.field.to_string(), value.to_string()));
    }
    fields
}

fn configure_rows(
    locales: &Locales,
    locale: Option<&str>,
    entries: &[ProfileEntry],
) -> Vec<serenity::CreateActionRow> {
    let hidden: Vec<&str> = entries.iter().filter(|e| !e.shown).map(|e| e.field).collect();
    let shown: Vec<&str> = entries.iter().filter(|e| e.shown).map(|e| e.field).collect();
    let no_options = locales.text(locale, MessageKey::AboutmeNoOptions);
    vec![
        select_row(
            ADD_SELECT_ID,
            locales.text(locale, MessageKey::AboutmeAddPlaceholder),
            &hidden,
            no_options,
        ),
        select_row(
            REMOVE_SELECT_ID,
            locales.text(locale, MessageKey::AboutmeRemovePlaceholder),
            &shown,
            no_options,
        ),
    ]
}

/// A select menu over `fields`; disabled with a single inert option when empty.
fn select_row(
    custom_id: &str,
    placeholder: &str,
    fields: &[&str],
    no_options: &str,
) -> serenity::CreateActionRow {
    let disabled = fields.is_empty();
    let options = if disabled {
        vec![serenity::CreateSelectMenuOption::new(no_options, "none")]
    } else {
        fields
            .iter()
            .map(|f| serenity::CreateSelectMenuOption::new(*f, *f))
            .collect()
    };
    serenity::CreateActionRow::SelectMenu(
        serenity::CreateSelectMenu::new(custom_id, serenity::CreateSelectMenuKind::String { options })
            .placeholder(placeholder)
            .disabled(disabled),
    )
}

fn modal_rows(entries: &[ProfileEntry]) -> Vec<serenity::CreateActionRow> {
    entries
        .iter()
        .map(|entry| {
            let mut input = serenity::CreateInputText::new(
                serenity::InputTextStyle::Short,
                entry.input_label(),
                entry.field,
            )
            .required(false);
            if let Some(value) = entry.value.as_deref().filter(|v| !v.is_empty()) {
                input = input.value(value);
            }
            serenity::CreateActionRow::InputText(input)
        })
        .collect()
}

fn submitted_values(rows: &[serenity::ActionRow]) -> Vec<(&'static str, String)> {
    rows.iter()
        .flat_map(|row| row.components.iter())
        .filter_map(|component| match component {
            serenity::ActionRowComponent::InputText(input) => {
                let field = profile::field_from_label(&input.custom_id)?;
                Some((field, input.value.clone().unwrap_or_default()))
            }
            _ => None,
        })
        .collect()
}
