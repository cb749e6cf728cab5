pub mod aboutme;
pub mod admin;
pub mod automod;
pub mod utility;

use crate::locale::MessageKey;
use crate::{Context, Data, Error};
use tracing::error;

/// Every command registered with the framework.
pub fn list() -> Vec<poise::Command<Data, Error>> {
    vec![
        aboutme::aboutme(),
        aboutme::aboutme_user(),
        automod::automod(),
        utility::utility(),
        admin::shutdown(),
        admin::restart(),
    ]
}

/// Localized text for the invoking user.
pub fn text(ctx: Context<'_>, key: MessageKey) -> String {
    ctx.data().locales.text(ctx.locale(), key).to_string()
}

pub fn render(ctx: Context<'_>, key: MessageKey, args: &[(&str, &str)]) -> String {
    ctx.data().locales.render(ctx.locale(), key, args)
}

pub async fn say_ephemeral(ctx: Context<'_>, content: impl Into<String>) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .content(content)
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Answers permission and ownership failures with a fixed message; every
/// other failure only reaches the log.
pub async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::MissingUserPermissions { ctx, .. } => {
            notify(ctx, MessageKey::MissingPermissions).await
        }
        poise::FrameworkError::NotAnOwner { ctx, .. } => notify(ctx, MessageKey::NotOwner).await,
        poise::FrameworkError::GuildOnly { ctx, .. } => notify(ctx, MessageKey::GuildOnly).await,
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!(
                "Command `{}` failed for user {}: {}",
                ctx.command().qualified_name,
                ctx.author().id,
                error
            );
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

async fn notify(ctx: Context<'_>, key: MessageKey) {
    if let Err(e) = say_ephemeral(ctx, text(ctx, key)).await {
        error!("Failed to send error notice: {}", e);
    }
}

/// Cuts `input` to at most `max_chars` characters, marking the cut.
pub fn truncate_chars(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }
    let mut out: String = input.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdef", 4), "abc…");
        assert_eq!(truncate_chars("äöüß", 4), "äöüß");
    }

    #[test]
    fn test_command_tree() {
        let commands = list();
        let names: Vec<_> = commands.iter().map(|c| c.name.as_str()).collect();
        assert!(names.contains(&"aboutme"));
        assert!(names.contains(&"automod"));
        assert!(names.contains(&"utility"));

        let automod = commands.iter().find(|c| c.name == "automod").unwrap();
        let subs: Vec<_> = automod.subcommands.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(subs, vec!["list_filterwords", "add_filterword", "remove_filterword"]);

        let aboutme = commands.iter().find(|c| c.name == "aboutme").unwrap();
        let subs: Vec<_> = aboutme.subcommands.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(subs, vec!["configure", "write", "user", "self"]);

        let menu = commands
            .iter()
            .find(|c| c.context_menu_name.as_deref() == Some("Aboutme"))
            .unwrap();
        assert!(menu.context_menu_action.is_some());
    }
}
