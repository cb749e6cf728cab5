use crate::db::Database;
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::{info, warn};

pub const BOT_TOKEN: &str = "bottoken";
pub const STATUS_CHANNEL: &str = "statuschannel_id";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("setting `{0}` is not set")]
    NotFound(String),
    #[error("failed to read a value for `{name}`: {source}")]
    Prompt {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

/// Source of interactive answers for missing settings.
pub trait SettingPrompt {
    fn ask(&mut self, name: &str) -> io::Result<String>;
}

/// Reads answers from the controlling terminal.
pub struct StdinPrompt;

impl SettingPrompt for StdinPrompt {
    fn ask(&mut self, name: &str) -> io::Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "{}:", name)?;
        stdout.flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stdin closed while waiting for input",
            ));
        }
        Ok(line.trim().to_string())
    }
}

pub struct SettingsStore {
    db: Database,
}

impl SettingsStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn get(&self, name: &str) -> Result<String, SettingsError> {
        match self.db.get_setting(name)? {
            Some(Some(value)) => Ok(value),
            _ => Err(SettingsError::NotFound(name.to_string())),
        }
    }

    pub fn set(&self, name: &str, value: &str) -> Result<(), SettingsError> {
        self.db.set_setting(name, value)?;
        Ok(())
    }

    /// Returns the stored value, prompting until one is supplied if the row is
    /// missing or null. An empty answer falls back to `default` when given.
    ///
    /// Blocks the calling thread; only call during bootstrap.
    pub fn ensure(
        &self,
        name: &str,
        default: Option<&str>,
        prompt: &mut dyn SettingPrompt,
    ) -> Result<String, SettingsError> {
        self.db.insert_setting_placeholder(name)?;
        if let Some(Some(value)) = self.db.get_setting(name)? {
            return Ok(value);
        }

        let value = loop {
            let answer = prompt.ask(name).map_err(|source| SettingsError::Prompt {
                name: name.to_string(),
                source,
            })?;
            if !answer.is_empty() {
                break answer;
            }
            if let Some(default) = default {
                break default.to_string();
            }
        };

        self.set(name, &value)?;
        info!("Settings: stored value for `{}`", name);
        println!("Added {}\n", name);
        Ok(value)
    }

    /// Like [`SettingsStore::ensure`], but the value must pass `parse`. A
    /// stored value that does not parse is cleared and asked for again.
    pub fn ensure_with<T>(
        &self,
        name: &str,
        default: Option<&str>,
        prompt: &mut dyn SettingPrompt,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<T, SettingsError> {
        loop {
            let value = self.ensure(name, default, prompt)?;
            if let Some(parsed) = parse(&value) {
                return Ok(parsed);
            }
            warn!("Settings: `{}` holds an invalid value, asking again", name);
            println!("Invalid value for {}: {}", name, value);
            self.db.clear_setting(name)?;
        }
    }
}
