pub mod commands;
pub mod config;
pub mod db;
pub mod locale;
pub mod logging;
pub mod process;
pub mod services;
pub mod status;

use std::sync::Arc;
use std::time::Instant;

/// Custom data passed to all commands
pub struct Data {
    pub config: config::Config,
    pub credentials: config::Credentials,
    pub db: db::Database,
    pub locales: Arc<locale::Locales>,
    pub filters: services::word_filter::WordFilterStore,
    /// Captured before anything else runs; the startup time is measured from here
    pub started: Instant,
    /// Version marker seen at startup, shown on the dashboard
    pub version: Option<String>,
    /// Bot's own user ID, used to recognise its dashboard messages
    pub bot_id: u64,
    /// Background dashboard refresher, stopped before shutdown or restart
    pub reporter: status::ReporterHandle,
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
