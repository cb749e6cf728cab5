//! Typed message catalogue.
//!
//! Every user-visible string is a [`MessageKey`]. The `en-US` table is built
//! in; further locales are loaded from `<dir>/<tag>.json` files holding a flat
//! `{ "key": "text" }` object, and each file must define exactly the full key
//! set. Placeholders are written as `{name}` and filled in by [`Locales::render`].

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const BUILTIN_LOCALE: &str = "en-US";

#[derive(Debug, Error)]
pub enum LocaleError {
    #[error("failed to read locale file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("locale `{tag}` is not valid JSON: {source}")]
    Parse {
        tag: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("locale `{tag}` is missing keys: {keys:?}")]
    MissingKeys { tag: String, keys: Vec<&'static str> },
    #[error("locale `{tag}` has unknown keys: {keys:?}")]
    UnknownKeys { tag: String, keys: Vec<String> },
    #[error("default locale `{0}` is not available")]
    UnknownDefault(String),
}

macro_rules! message_keys {
    ($($variant:ident => $key:literal, $text:literal;)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum MessageKey {
            $($variant,)*
        }

        impl MessageKey {
            pub const ALL: &'static [MessageKey] = &[$(MessageKey::$variant,)*];

            pub fn key(self) -> &'static str {
                match self {
                    $(MessageKey::$variant => $key,)*
                }
            }

            pub fn default_text(self) -> &'static str {
                match self {
                    $(MessageKey::$variant => $text,)*
                }
            }

            pub fn from_key(key: &str) -> Option<Self> {
                match key {
                    $($key => Some(MessageKey::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

message_keys! {
    NotOwner => "not_owner", "You are not my Owner.";
    MissingPermissions => "missing_permissions", "You don't have permission to use this command.";
    GuildOnly => "guild_only", "This command can only be used in a server.";
    PerformanceHeading => "performance_heading", "Performance Information:";
    PerformanceBody => "performance_body", "Bot was ready in: {load}s\nAvg. time until ready: {average}s";
    UptimeFooter => "uptime_footer", "Uptime: {uptime}";
    StopButton => "stop_button", "Killbot";
    RestartButton => "restart_button", "Restart";
    ShuttingDown => "shutting_down", "Shutting down...";
    Restarting => "restarting", "Restarting...";
    VersionField => "version_field", "Version:";
    AboutmeTitle => "aboutme_title", "About me of {user}";
    AboutmeAge => "aboutme_age", "age";
    AboutmeEmpty => "aboutme_empty", "-";
    AboutmeModalTitle => "aboutme_modal_title", "About you:";
    AboutmeAddPlaceholder => "aboutme_add_placeholder", "Add a field to your Aboutme";
    AboutmeRemovePlaceholder => "aboutme_remove_placeholder", "Remove a field from your Aboutme";
    AboutmeNoOptions => "aboutme_no_options", "Nothing to select";
    FilterListHeader => "filter_list_header", "List of filtered words:";
    FilterListEmpty => "filter_list_empty", "No words are filtered yet.";
    FilterAdded => "filter_added", "Added word '{word}' to the filterlist, will be replaced with '{replacement}'.";
    FilterExists => "filter_exists", "'{word}' is already on the filterlist.";
    FilterRemoved => "filter_removed", "Removed word '{word}' from the filterlist.";
    FilterMissing => "filter_missing", "'{word}' is not on the filterlist.";
    FilterInvalid => "filter_invalid", "The word and its replacement must not be empty, and the word must not contain '-'.";
    CensoredField => "censored_field", "Censored message:";
    CensoredEmpty => "censored_empty", "(nothing left)";
    NoServerIcon => "no_server_icon", "This server has no icon.";
    ClearOne => "clear_one", "Deleting {count} message.";
    ClearMany => "clear_many", "Deleting {count} messages.";
}

type Table = HashMap<MessageKey, String>;

pub struct Locales {
    default_tag: String,
    tables: HashMap<String, Table>,
}

impl Locales {
    /// Only the built-in `en-US` table.
    pub fn builtin() -> Self {
        let mut tables = HashMap::new();
        tables.insert(BUILTIN_LOCALE.to_string(), builtin_table());
        Self {
            default_tag: BUILTIN_LOCALE.to_string(),
            tables,
        }
    }

    /// Loads every `*.json` file in `dir` on top of the built-in table.
    /// A missing directory is not an error.
    pub fn load(dir: &Path, default_tag: &str) -> Result<Self, LocaleError> {
        let mut locales = Self::builtin();

        if dir.is_dir() {
            let entries = fs::read_dir(dir).map_err(|source| LocaleError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            for entry in entries {
                let path = entry
                    .map_err(|source| LocaleError::Io {
                        path: dir.to_path_buf(),
                        source,
                    })?
                    .path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let Some(tag) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string)
                else {
                    continue;
                };
                let content = fs::read_to_string(&path).map_err(|source| LocaleError::Io {
                    path: path.clone(),
                    source,
                })?;
                let table = parse_table(&tag, &content)?;
                debug!("Loaded locale `{}` from {:?}", tag, path);
                locales.tables.insert(tag, table);
            }
        } else {
            debug!("Locale directory {:?} not found, using built-in messages", dir);
        }

        if !locales.tables.contains_key(default_tag) {
            return Err(LocaleError::UnknownDefault(default_tag.to_string()));
        }
        locales.default_tag = default_tag.to_string();
        info!(
            "Localization ready: {} locale(s), default `{}`",
            locales.tables.len(),
            locales.default_tag
        );
        Ok(locales)
    }

    pub fn default_tag(&self) -> &str {
        &self.default_tag
    }

    fn table_for(&self, locale: Option<&str>) -> Option<&Table> {
        if let Some(tag) = locale {
            if let Some(table) = self.tables.get(tag) {
                return Some(table);
            }
            let language = tag.split('-').next().unwrap_or(tag);
            if let Some(table) = self.tables.get(language) {
                return Some(table);
            }
            let prefix = format!("{}-", language);
            let mut related: Vec<_> = self
                .tables
                .iter()
                .filter(|(t, _)| t.starts_with(&prefix))
                .collect();
            related.sort_by(|a, b| a.0.cmp(b.0));
            if let Some((_, table)) = related.first() {
                return Some(*table);
            }
        }
        self.tables
            .get(&self.default_tag)
            .or_else(|| self.tables.get(BUILTIN_LOCALE))
    }

    pub fn text(&self, locale: Option<&str>, key: MessageKey) -> &str {
        self.table_for(locale)
            .and_then(|table| table.get(&key))
            .map(String::as_str)
            .unwrap_or_else(|| key.default_text())
    }

    /// Looks up `key` and substitutes each `{name}` placeholder.
    pub fn render(&self, locale: Option<&str>, key: MessageKey, args: &[(&str, &str)]) -> String {
        fill(self.text(locale, key), args)
    }
}

/// Substitutes `{name}` placeholders in one pass; substituted values are
/// never scanned again. Unknown placeholders are kept as written.
pub fn fill(template: &str, args: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            rest = &rest[open..];
            break;
        };
        let name = &after[..close];
        match args.iter().find(|(arg, _)| *arg == name) {
            Some((_, value)) => out.push_str(value),
            None => {
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}

fn builtin_table() -> Table {
    MessageKey::ALL
        .iter()
        .map(|k| (*k, k.default_text().to_string()))
        .collect()
}

pub fn parse_table(tag: &str, content: &str) -> Result<Table, LocaleError> {
    let raw: HashMap<String, String> =
        serde_json::from_str(content).map_err(|source| LocaleError::Parse {
            tag: tag.to_string(),
            source,
        })?;

    let mut unknown: Vec<String> = raw
        .keys()
        .filter(|k| MessageKey::from_key(k).is_none())
        .cloned()
        .collect();
    if !unknown.is_empty() {
        unknown.sort();
        return Err(LocaleError::UnknownKeys {
            tag: tag.to_string(),
            keys: unknown,
        });
    }

    let missing: Vec<&'static str> = MessageKey::ALL
        .iter()
        .filter(|k| !raw.contains_key(k.key()))
        .map(|k| k.key())
        .collect();
    if !missing.is_empty() {
        return Err(LocaleError::MissingKeys {
            tag: tag.to_string(),
            keys: missing,
        });
    }

    Ok(raw
        .into_iter()
        .filter_map(|(k, v)| MessageKey::from_key(&k).map(|key| (key, v)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_json(prefix: &str) -> String {
        let map: HashMap<&str, String> = MessageKey::ALL
            .iter()
            .map(|k| (k.key(), format!("{}{}", prefix, k.default_text())))
            .collect();
        serde_json::to_string(&map).unwrap()
    }

    #[test]
    fn test_keys_are_unique() {
        let mut keys: Vec<_> = MessageKey::ALL.iter().map(|k| k.key()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), MessageKey::ALL.len());
        for key in MessageKey::ALL {
            assert_eq!(MessageKey::from_key(key.key()), Some(*key));
        }
    }

    #[test]
    fn test_parse_table_validates_key_set() {
        assert!(parse_table("de", &full_json("DE: ")).is_ok());

        let err = parse_table("de", r#"{"not_owner": "Du bist nicht mein Besitzer."}"#).unwrap_err();
        assert!(matches!(err, LocaleError::MissingKeys { .. }));

        let mut map: HashMap<String, String> = serde_json::from_str(&full_json("")).unwrap();
        map.insert("bogus".into(), "x".into());
        let err = parse_table("de", &serde_json::to_string(&map).unwrap()).unwrap_err();
        assert!(matches!(err, LocaleError::UnknownKeys { ref keys, .. } if keys == &vec!["bogus".to_string()]));

        assert!(matches!(parse_table("de", "[1, 2]"), Err(LocaleError::Parse { .. })));
    }

    #[test]
    fn test_lookup_fallbacks() {
        let mut locales = Locales::builtin();
        locales
            .tables
            .insert("de".into(), parse_table("de", &full_json("DE: ")).unwrap());

        assert_eq!(locales.text(None, MessageKey::NotOwner), "You are not my Owner.");
        assert_eq!(locales.text(Some("de"), MessageKey::NotOwner), "DE: You are not my Owner.");
        assert_eq!(locales.text(Some("de-AT"), MessageKey::NotOwner), "DE: You are not my Owner.");
        assert_eq!(locales.text(Some("fr"), MessageKey::NotOwner), "You are not my Owner.");
        assert_eq!(locales.text(Some("en-GB"), MessageKey::NotOwner), "You are not my Owner.");
    }

    #[test]
    fn test_render_placeholders() {
        let locales = Locales::builtin();
        let text = locales.render(
            None,
            MessageKey::FilterAdded,
            &[("word", "heck"), ("replacement", "h*ck")],
        );
        assert_eq!(
            text,
            "Added word 'heck' to the filterlist, will be replaced with 'h*ck'."
        );
    }

    #[test]
    fn test_load_directory() {
        let dir = std::env::temp_dir().join(format!("guppi-locales-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("de.json"), full_json("DE: ")).unwrap();
        fs::write(dir.join("README.txt"), "ignored").unwrap();

        let locales = Locales::load(&dir, "de").unwrap();
        assert_eq!(locales.default_tag(), "de");
        assert_eq!(locales.text(None, MessageKey::Restarting), "DE: Restarting...");
        assert_eq!(locales.text(Some("en-US"), MessageKey::Restarting), "Restarting...");

        assert!(matches!(
            Locales::load(&dir, "fr"),
            Err(LocaleError::UnknownDefault(_))
        ));

        fs::write(dir.join("broken.json"), "{").unwrap();
        assert!(Locales::load(&dir, "de").is_err());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_directory_uses_builtin() {
        let locales = Locales::load(Path::new("/nonexistent/guppi/locales"), "en-US").unwrap();
        assert_eq!(locales.text(Some("de"), MessageKey::GuildOnly), MessageKey::GuildOnly.default_text());
    }

    #[test]
    fn test_bundled_german_table_is_complete() {
        let table = parse_table("de", include_str!("../locales/de.json")).unwrap();
        assert_eq!(table.len(), MessageKey::ALL.len());
        assert_eq!(table[&MessageKey::StopButton], "Beenden");
    }

    #[test]
    fn test_fill_does_not_rescan_values() {
        let filled = fill(
            "Added '{word}', replaced with '{replacement}'.",
            &[("word", "{replacement}"), ("replacement", "x")],
        );
        assert_eq!(filled, "Added '{replacement}', replaced with 'x'.");
        assert_eq!(fill("{unknown} and {", &[("word", "w")]), "{unknown} and {");
        assert_eq!(fill("{a}{b}", &[("a", "1"), ("b", "2")]), "12");
    }
}
