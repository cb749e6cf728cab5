//! Per-guild word filter stored as a flat `word-replacement` list.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const FILTER_FILE: &str = "filters.txt";
const FORMATTING_CHARS: [char; 9] = ['*', '_', '`', '~', '#', '@', '\'', '"', '\\'];

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("filter file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid filter entry `{word}-{replacement}`")]
    InvalidEntry { word: String, replacement: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterEntry {
    pub word: String,
    pub replacement: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterList {
    entries: Vec<FilterEntry>,
}

impl FilterList {
    /// Lines starting with `#` and lines without `-` are ignored; each entry
    /// is split at its first `-`.
    pub fn parse(content: &str) -> Self {
        let entries = content
            .lines()
            .filter_map(parse_line)
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[FilterEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.entries.iter().any(|e| e.word == word)
    }

    /// Lowercases `text` and applies every filter. `None` when nothing matched.
    pub fn censor(&self, text: &str) -> Option<String> {
        let mut censored = text.to_lowercase();
        let mut matched = false;
        for entry in &self.entries {
            let needle = unescape(&entry.word);
            if needle.is_empty() || !censored.contains(&needle) {
                continue;
            }
            censored = censored.replace(&needle, &entry.replacement);
            matched = true;
        }
        matched.then_some(censored)
    }
}

fn parse_line(line: &str) -> Option<FilterEntry> {
    if line.starts_with('#') {
        return None;
    }
    let line = line.trim();
    let (word, replacement) = line.split_once('-')?;
    Some(FilterEntry {
        word: word.to_string(),
        replacement: replacement.to_string(),
    })
}

/// True if `text` contains a custom emoji reference like `<:name:id>`.
pub fn is_custom_emoji(text: &str) -> bool {
    let mut rest = text;
    while let Some(start) = rest.find('<') {
        let candidate = &rest[start + 1..];
        let Some(end) = candidate.find('>') else {
            return false;
        };
        let inner = &candidate[..end];
        let inner = inner.strip_prefix('a').unwrap_or(inner);
        if let Some(inner) = inner.strip_prefix(':') {
            if let Some((name, id)) = inner.split_once(':') {
                let name_ok = !name.is_empty()
                    && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
                let id_ok = !id.is_empty() && id.chars().all(|c| c.is_ascii_digit());
                if name_ok && id_ok {
                    return true;
                }
            }
        }
        rest = candidate;
    }
    false
}

pub fn escape_formatting_chars(word: &str) -> String {
    let mut escaped = String::with_capacity(word.len());
    for c in word.chars() {
        if FORMATTING_CHARS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn unescape(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut chars = word.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.peek().copied() {
                if FORMATTING_CHARS.contains(&next) {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// An entry must survive a round trip through the `word-replacement` line
/// format and censor to something visible.
pub fn is_valid_entry(word: &str, replacement: &str) -> bool {
    !word.is_empty() && !word.contains('-') && !replacement.trim().is_empty()
}

/// Lowercases a filter term and escapes formatting characters unless it
/// references a custom emoji.
pub fn normalize_term(input: &str) -> String {
    let lowered = input.trim().to_lowercase();
    if is_custom_emoji(&lowered) {
        lowered
    } else {
        escape_formatting_chars(&lowered)
    }
}

#[derive(Clone)]
pub struct WordFilterStore {
    dir: PathBuf,
}

impl WordFilterStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, guild_id: u64) -> PathBuf {
        self.dir.join(guild_id.to_string()).join(FILTER_FILE)
    }

    /// Creates the guild's filter file if it does not exist yet.
    pub fn ensure_file(&self, guild_id: u64) -> Result<PathBuf, FilterError> {
        let path = self.path(guild_id);
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|source| io_err(parent, source))?;
            }
            fs::write(&path, "").map_err(|source| io_err(&path, source))?;
            debug!("Created filter file {:?}", path);
        }
        Ok(path)
    }

    pub fn load(&self, guild_id: u64) -> Result<FilterList, FilterError> {
        let path = self.ensure_file(guild_id)?;
        let content = fs::read_to_string(&path).map_err(|source| io_err(&path, source))?;
        Ok(FilterList::parse(&content))
    }

    /// Appends a normalized entry. Returns `false` if the word was already filtered.
    pub fn add(&self, guild_id: u64, word: &str, replacement: &str) -> Result<bool, FilterError> {
        if !is_valid_entry(word, replacement) {
            return Err(FilterError::InvalidEntry {
                word: word.to_string(),
                replacement: replacement.to_string(),
            });
        }
        if self.load(guild_id)?.contains(word) {
            return Ok(false);
        }
        let path = self.path(guild_id);
        let mut file = fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|source| io_err(&path, source))?;
        write!(file, "\n{}-{}", word, replacement).map_err(|source| io_err(&path, source))?;
        Ok(true)
    }

    /// Removes the entry for `word`. Returns `false` if it was not filtered.
    pub fn remove(&self, guild_id: u64, word: &str) -> Result<bool, FilterError> {
        let path = self.ensure_file(guild_id)?;
        let content = fs::read_to_string(&path).map_err(|source| io_err(&path, source))?;

        let mut removed = false;
        let kept: Vec<&str> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter(|line| match parse_line(line) {
                Some(entry) if entry.word == word => {
                    removed = true;
                    false
                }
                _ => true,
            })
            .collect();

        if removed {
            fs::write(&path, kept.join("\n")).map_err(|source| io_err(&path, source))?;
        }
        Ok(removed)
    }
}

fn io_err(path: &Path, source: std::io::Error) -> FilterError {
    FilterError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(name: &str) -> WordFilterStore {
        let dir = std::env::temp_dir().join(format!(
            "guppi-filter-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        WordFilterStore::new(dir)
    }

    #[test]
    fn test_parse_skips_comments_and_plain_lines() {
        let list = FilterList::parse("# header\nheck-h*ck\n\nnot an entry\nfoo-bar-baz\n");
        assert_eq!(
            list.entries(),
            &[
                FilterEntry {
                    word: "heck".into(),
                    replacement: "h*ck".into()
                },
                FilterEntry {
                    word: "foo".into(),
                    replacement: "bar-baz".into()
                },
            ]
        );
    }

    #[test]
    fn test_censor_replaces_lowercased_text() {
        let list = FilterList::parse("darn-d***\nheck-h\\*ck");
        assert_eq!(
            list.censor("Well DARN it, heck"),
            Some("well d*** it, h\\*ck".to_string())
        );
        assert_eq!(list.censor("all good here"), None);
    }

    #[test]
    fn test_censor_matches_escaped_words_literally() {
        let list = FilterList::parse(&format!("{}-[redacted]", escape_formatting_chars("a*b")));
        assert_eq!(list.censor("x A*B y"), Some("x [redacted] y".to_string()));
    }

    #[test]
    fn test_custom_emoji_detection() {
        assert!(is_custom_emoji("<:blob:123456>"));
        assert!(is_custom_emoji("text <a:party:42> text"));
        assert!(!is_custom_emoji("<:blob:>"));
        assert!(!is_custom_emoji("a < b > c"));
        assert!(!is_custom_emoji("plain"));
    }

    #[test]
    fn test_normalize_term() {
        assert_eq!(normalize_term("  Hello_World "), "hello\\_world");
        assert_eq!(normalize_term("<:Blob:123>"), "<:blob:123>");
        assert_eq!(escape_formatting_chars("@everyone"), "\\@everyone");
    }

    #[test]
    fn test_store_add_remove_roundtrip() {
        let store = temp_store("crud");
        let guild = 77;

        assert!(store.load(guild).unwrap().is_empty());
        assert!(store.path(guild).exists());

        assert!(store.add(guild, "heck", "h*ck").unwrap());
        assert!(!store.add(guild, "heck", "other").unwrap());
        assert!(store.add(guild, "darn", "d***").unwrap());

        let list = store.load(guild).unwrap();
        assert_eq!(list.entries().len(), 2);
        assert_eq!(list.entries()[0].replacement, "h*ck");

        assert!(store.remove(guild, "heck").unwrap());
        assert!(!store.remove(guild, "heck").unwrap());
        let list = store.load(guild).unwrap();
        assert_eq!(list.entries().len(), 1);
        assert_eq!(list.entries()[0].word, "darn");

        let _ = fs::remove_dir_all(&store.dir);
    }

    #[test]
    fn test_remove_matches_whole_word_only() {
        let store = temp_store("prefix");
        let guild = 5;
        store.add(guild, "he", "x").unwrap();
        store.add(guild, "heck", "y").unwrap();

        assert!(store.remove(guild, "he").unwrap());
        let list = store.load(guild).unwrap();
        assert!(list.contains("heck"));
        assert!(!list.contains("he"));

        let _ = fs::remove_dir_all(&store.dir);
    }

    #[test]
    fn test_entry_validation() {
        assert!(is_valid_entry("heck", "h*ck"));
        assert!(!is_valid_entry("", "x"));
        assert!(!is_valid_entry("heck", ""));
        assert!(!is_valid_entry(&normalize_term("heck"), &normalize_term("   ")));
        assert!(!is_valid_entry("foo-bar", "x"));
    }

    #[test]
    fn test_store_rejects_blank_replacement() {
        let store = temp_store("blank");
        let guild = 9;
        assert!(matches!(
            store.add(guild, "heck", ""),
            Err(FilterError::InvalidEntry { .. })
        ));
        assert!(store.load(guild).unwrap().is_empty());
        let _ = fs::remove_dir_all(&store.dir);
    }
}
