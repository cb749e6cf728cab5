use crate::locale::{Locales, MessageKey};
use serenity::all::{
    ButtonStyle, ChannelId, CreateActionRow, CreateButton, CreateEmbed, CreateEmbedFooter,
    CreateMessage, EditMessage, GetMessages, MessageId, UserId,
};
use serenity::http::Http;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const STOP_ID: &str = "dashboard_stop";
pub const RESTART_ID: &str = "dashboard_restart";
const DASHBOARD_COLOUR: u32 = 0x2ecc71;
const HISTORY_PAGE: u8 = 100;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("dashboard message no longer exists")]
    NotFound,
    #[error(transparent)]
    Discord(#[from] serenity::Error),
}

impl DashboardError {
    /// Maps a 404 from Discord to [`DashboardError::NotFound`].
    pub fn classify(err: serenity::Error) -> Self {
        if let serenity::Error::Http(http) = &err {
            if http.status_code().map(|s| s.as_u16()) == Some(404) {
                return DashboardError::NotFound;
            }
        }
        DashboardError::Discord(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardAction {
    Stop,
    Restart,
}

impl DashboardAction {
    pub fn from_custom_id(id: &str) -> Option<Self> {
        match id {
            STOP_ID => Some(DashboardAction::Stop),
            RESTART_ID => Some(DashboardAction::Restart),
            _ => None,
        }
    }
}

/// Everything shown on the dashboard at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub load_time: f64,
    pub average: f64,
    pub uptime: Duration,
    pub version: Option<String>,
}

pub fn format_uptime(uptime: Duration) -> String {
    let whole = Duration::from_secs(uptime.as_secs());
    if whole.is_zero() {
        return "0s".to_string();
    }
    humantime::format_duration(whole).to_string()
}

pub fn performance_text(view: &DashboardView, locales: &Locales) -> String {
    let load = format!("{:.2}", view.load_time);
    let average = format!("{:.2}", view.average);
    locales.render(
        None,
        MessageKey::PerformanceBody,
        &[("load", load.as_str()), ("average", average.as_str())],
    )
}

pub fn render_embed(view: &DashboardView, locales: &Locales) -> CreateEmbed {
    let uptime = format_uptime(view.uptime);
    let footer = locales.render(None, MessageKey::UptimeFooter, &[("uptime", uptime.as_str())]);
    let mut embed = CreateEmbed::new()
        .color(DASHBOARD_COLOUR)
        .field(
            locales.text(None, MessageKey::PerformanceHeading),
            performance_text(view, locales),
            false,
        );
    if let Some(version) = &view.version {
        embed = embed.field(locales.text(None, MessageKey::VersionField), version, false);
    }
    embed.footer(CreateEmbedFooter::new(footer))
}

pub fn action_buttons(locales: &Locales) -> Vec<CreateActionRow> {
    vec![CreateActionRow::Buttons(vec![
        CreateButton::new(STOP_ID)
            .label(locales.text(None, MessageKey::StopButton))
            .style(ButtonStyle::Danger),
        CreateButton::new(RESTART_ID)
            .label(locales.text(None, MessageKey::RestartButton))
            .style(ButtonStyle::Danger),
    ])]
}

/// Where the status reporter publishes its dashboard.
#[async_trait::async_trait]
pub trait DashboardSink: Send + Sync {
    /// Deletes every earlier message the bot authored in the target channel.
    async fn purge_own_messages(&self) -> Result<usize, DashboardError>;
    async fn send(&self, view: &DashboardView) -> Result<MessageId, DashboardError>;
    async fn edit(&self, message: MessageId, view: &DashboardView) -> Result<(), DashboardError>;
}

/// Dashboard living in a Discord text channel.
pub struct ChannelDashboard {
    http: Arc<Http>,
    channel_id: ChannelId,
    bot_id: UserId,
    locales: Arc<Locales>,
}

impl ChannelDashboard {
    pub fn new(http: Arc<Http>, channel_id: ChannelId, bot_id: UserId, locales: Arc<Locales>) -> Self {
        Self {
            http,
            channel_id,
            bot_id,
            locales,
        }
    }
}

#[async_trait::async_trait]
impl DashboardSink for ChannelDashboard {
    async fn purge_own_messages(&self) -> Result<usize, DashboardError> {
        let mut before: Option<MessageId> = None;
        let mut deleted = 0usize;

        loop {
            let mut request = GetMessages::new().limit(HISTORY_PAGE);
            if let Some(id) = before {
                request = request.before(id);
            }
            let page = self
                .channel_id
                .messages(&self.http, request)
                .await
                .map_err(DashboardError::classify)?;

            let Some(oldest) = page.last() else {
                break;
            };
            before = Some(oldest.id);

            for message in page.iter().filter(|m| m.author.id == self.bot_id) {
                match self.channel_id.delete_message(&self.http, message.id).await {
                    Ok(()) => deleted += 1,
                    Err(e) => warn!("Failed to delete old status message {}: {}", message.id, e),
                }
            }

            if page.len() < HISTORY_PAGE as usize {
                break;
            }
        }

        debug!("Removed {} earlier status messages from {}", deleted, self.channel_id);
        Ok(deleted)
    }

    async fn send(&self, view: &DashboardView) -> Result<MessageId, DashboardError> {
        let builder = CreateMessage::new()
            .embed(render_embed(view, &self.locales))
            .components(action_buttons(&self.locales));
        let message = self
            .channel_id
            .send_message(&self.http, builder)
            .await
            .map_err(DashboardError::classify)?;
        Ok(message.id)
    }

    async fn edit(&self, message: MessageId, view: &DashboardView) -> Result<(), DashboardError> {
        let builder = EditMessage::new()
            .embed(render_embed(view, &self.locales))
            .components(action_buttons(&self.locales));
        self.channel_id
            .edit_message(&self.http, message, builder)
            .await
            .map_err(DashboardError::classify)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(Duration::from_millis(400)), "0s");
        assert_eq!(format_uptime(Duration::from_secs(65)), "1m 5s");
        assert_eq!(format_uptime(Duration::from_secs(3 * 3600 + 7)), "3h 7s");
        assert_eq!(format_uptime(Duration::from_millis(61_900)), "1m 1s");
    }

    #[test]
    fn test_performance_text() {
        let locales = Locales::builtin();
        let view = DashboardView {
            load_time: 3.456,
            average: 2.5,
            uptime: Duration::from_secs(1),
            version: None,
        };
        assert_eq!(
            performance_text(&view, &locales),
            "Bot was ready in: 3.46s\nAvg. time until ready: 2.50s"
        );
    }

    #[test]
    fn test_render_embed_contents() {
        let locales = Locales::builtin();
        let view = DashboardView {
            load_time: 1.0,
            average: 1.0,
            uptime: Duration::from_secs(90),
            version: Some("0.4.2".to_string()),
        };
        let json = serde_json::to_string(&render_embed(&view, &locales)).unwrap();
        assert!(json.contains("Performance Information:"));
        assert!(json.contains("Uptime: 1m 30s"));
        assert!(json.contains("Version:"));
        assert!(json.contains("0.4.2"));

        let unversioned = DashboardView { version: None, ..view };
        let json = serde_json::to_string(&render_embed(&unversioned, &locales)).unwrap();
        assert!(!json.contains("Version:"));
    }

    #[test]
    fn test_action_buttons() {
        let locales = Locales::builtin();
        let rows = action_buttons(&locales);
        assert_eq!(rows.len(), 1);
        let json = serde_json::to_string(&rows).unwrap();
        assert!(json.contains(STOP_ID));
        assert!(json.contains(RESTART_ID));
        assert!(json.contains("Killbot"));
    }

    #[test]
    fn test_action_from_custom_id() {
        assert_eq!(DashboardAction::from_custom_id(STOP_ID), Some(DashboardAction::Stop));
        assert_eq!(DashboardAction::from_custom_id(RESTART_ID), Some(DashboardAction::Restart));
        assert_eq!(DashboardAction::from_custom_id("confirm_tool"), None);
    }

    #[test]
    fn test_classify_non_http_error() {
        let err = DashboardError::classify(serenity::Error::Other("gateway hiccup"));
        assert!(matches!(err, DashboardError::Discord(_)));
    }
}
