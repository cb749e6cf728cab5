//! Self-reporting: the live status dashboard, its owner-only controls, and
//! the version watcher that cold-restarts the bot when the deployed version
//! marker changes.

pub mod dashboard;
pub mod reporter;
pub mod watcher;

use crate::locale::MessageKey;
use crate::services::ledger::StartupLedger;
use crate::{process, Data, Error};
use dashboard::{ChannelDashboard, DashboardAction};
use poise::serenity_prelude as serenity;
use reporter::StatusReporter;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

/// Gives the gateway a moment to publish the "Restarting" presence before exec.
const PRESENCE_GRACE: Duration = Duration::from_secs(1);

/// Handle to the background dashboard refresher, set once it is running.
#[derive(Default)]
pub struct ReporterHandle(OnceLock<AbortHandle>);

impl ReporterHandle {
    pub fn install<T>(&self, task: &JoinHandle<T>) {
        if self.0.set(task.abort_handle()).is_err() {
            warn!("Status: reporter already running, keeping the first one");
        }
    }

    /// Stops refreshing so the dashboard is not reposted while shutting down.
    pub fn stop(&self) {
        if let Some(handle) = self.0.get() {
            handle.abort();
            debug!("Status: reporter stopped");
        }
    }
}

/// Clears the status channel, records this startup in the ledger, posts the
/// dashboard and keeps it refreshed in the background.
pub async fn launch(http: Arc<::serenity::http::Http>, data: &Data) -> anyhow::Result<()> {
    let sink = ChannelDashboard::new(
        http,
        serenity::ChannelId::new(data.credentials.status_channel_id.get()),
        serenity::UserId::new(data.bot_id),
        data.locales.clone(),
    );
    let mut reporter = StatusReporter::new(sink, data.started, data.version.clone());

    let db = data.db.clone();
    reporter
        .bootstrap(|load_time| async move {
            let (window, average) = db
                .run_blocking(move |db| {
                    let ledger = StartupLedger::new(db.clone());
                    let window = ledger.record(load_time)?;
                    let average = ledger.average()?;
                    Ok((window, average))
                })
                .await?;
            info!(
                "Ready in {:.2}s, rolling average {:.2}s over {} startups",
                load_time,
                average,
                window.len()
            );
            Ok::<f64, anyhow::Error>(average)
        })
        .await?;

    let task = tokio::spawn(reporter.run());
    data.reporter.install(&task);
    Ok(())
}

/// What a component click on the dashboard amounts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentDecision {
    /// Not a dashboard button.
    NotOurs,
    /// A dashboard button pressed by someone who is not an owner.
    Reject(DashboardAction),
    Run(DashboardAction),
}

pub fn decide(
    owners: &HashSet<serenity::UserId>,
    user: serenity::UserId,
    custom_id: &str,
) -> ComponentDecision {
    match DashboardAction::from_custom_id(custom_id) {
        None => ComponentDecision::NotOurs,
        Some(action) if owners.contains(&user) => ComponentDecision::Run(action),
        Some(action) => ComponentDecision::Reject(action),
    }
}

/// Handles clicks on the dashboard buttons. Returns `false` for components
/// that belong to something else.
pub async fn handle_component(
    ctx: &serenity::Context,
    interaction: &serenity::ComponentInteraction,
    framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<bool, Error> {
    let action = match decide(
        &framework.options.owners,
        interaction.user.id,
        &interaction.data.custom_id,
    ) {
        ComponentDecision::NotOurs => return Ok(false),
        ComponentDecision::Reject(action) => {
            warn!(
                "Rejected dashboard {:?} from non-owner {}",
                action, interaction.user.id
            );
            let text = data
                .locales
                .text(Some(interaction.locale.as_str()), MessageKey::NotOwner);
            interaction
                .create_response(
                    &ctx.http,
                    serenity::CreateInteractionResponse::Message(
                        serenity::CreateInteractionResponseMessage::new()
                            .content(text)
                            .ephemeral(true),
                    ),
                )
                .await?;
            return Ok(true);
        }
        ComponentDecision::Run(action) => action,
    };

    interaction
        .create_response(&ctx.http, serenity::CreateInteractionResponse::Acknowledge)
        .await?;
    data.reporter.stop();
    if let Err(e) = interaction
        .channel_id
        .delete_message(&ctx.http, interaction.message.id)
        .await
    {
        warn!("Failed to delete dashboard message: {}", e);
    }

    match action {
        DashboardAction::Stop => {
            println!("Bot Closed");
            info!("Bot Closed");
            framework.shard_manager().shutdown_all().await;
        }
        DashboardAction::Restart => {
            info!("Restarting");
            restart(ctx).await?;
        }
    }
    Ok(true)
}

/// Shows the restarting presence, then cold-restarts the process.
pub async fn restart(ctx: &serenity::Context) -> Result<(), Error> {
    ctx.set_presence(
        Some(serenity::ActivityData::playing("Restarting")),
        serenity::OnlineStatus::Idle,
    );
    tokio::time::sleep(PRESENCE_GRACE).await;
    process::cold_restart()?;
    Ok(())
}
