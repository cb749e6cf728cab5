use super::dashboard::{DashboardError, DashboardSink, DashboardView};
use crate::services::ledger::round2;
use serenity::all::MessageId;
use std::collections::VecDeque;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Cadence the dashboard refresh aims for.
pub const TARGET_INTERVAL: Duration = Duration::from_secs(5);
/// Number of recent refresh costs averaged when adapting the delay.
pub const COST_WINDOW: usize = 10;

/// Sleep length between refreshes, adapted to how long refreshes take.
///
/// While the average cost stays within the target the delay shrinks to
/// `target - cost`, keeping a steady cadence; once refreshes get slower than
/// the target the delay grows to the average cost itself.
pub struct AdaptiveDelay {
    costs: VecDeque<f64>,
    window: usize,
    target: f64,
}

impl AdaptiveDelay {
    pub fn new(target: Duration, window: usize) -> Self {
        Self {
            costs: VecDeque::with_capacity(window + 1),
            window: window.max(1),
            target: target.as_secs_f64(),
        }
    }

    pub fn initial(&self) -> Duration {
        Duration::from_secs_f64(self.target)
    }

    pub fn record(&mut self, cost: Duration) -> Duration {
        self.costs.push_back(cost.as_secs_f64());
        while self.costs.len() > self.window {
            self.costs.pop_front();
        }
        let average = self.costs.iter().sum::<f64>() / self.costs.len() as f64;
        let next = if average <= self.target {
            self.target - average
        } else {
            average
        };
        Duration::from_secs_f64(next.max(0.0))
    }
}

impl Default for AdaptiveDelay {
    fn default() -> Self {
        Self::new(TARGET_INTERVAL, COST_WINDOW)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Edited,
    Replaced(MessageId),
    Failed,
}

/// Keeps a single live dashboard message up to date.
///
/// Load time and rolling average describe this process's startup and are
/// fixed once the dashboard is first posted; only the uptime changes between
/// refreshes.
pub struct StatusReporter<S> {
    sink: S,
    started: Instant,
    version: Option<String>,
    load_time: f64,
    average: f64,
    message: Option<MessageId>,
    delay: AdaptiveDelay,
}

impl<S: DashboardSink> StatusReporter<S> {
    pub fn new(sink: S, started: Instant, version: Option<String>) -> Self {
        Self {
            sink,
            started,
            version,
            load_time: 0.0,
            average: 0.0,
            message: None,
            delay: AdaptiveDelay::default(),
        }
    }

    pub fn message(&self) -> Option<MessageId> {
        self.message
    }

    pub fn load_time(&self) -> f64 {
        self.load_time
    }

    fn view(&self) -> DashboardView {
        DashboardView {
            load_time: self.load_time,
            average: self.average,
            uptime: self.started.elapsed(),
            version: self.version.clone(),
        }
    }

    /// Clears earlier dashboards, measures the load time, hands it to
    /// `record` (which returns the rolling average) and posts the dashboard.
    ///
    /// The load time includes the purge; the dashboard, and with it the
    /// restart button, only appears after `record` has completed.
    pub async fn bootstrap<F, Fut>(&mut self, record: F) -> anyhow::Result<MessageId>
    where
        F: FnOnce(f64) -> Fut,
        Fut: Future<Output = anyhow::Result<f64>>,
    {
        self.purge().await;
        self.load_time = round2(self.started.elapsed().as_secs_f64());
        self.average = round2(record(self.load_time).await?);
        Ok(self.post().await?)
    }

    async fn purge(&self) {
        match self.sink.purge_own_messages().await {
            Ok(n) => debug!("Status: purged {} previous messages", n),
            Err(e) => warn!("Status: could not purge previous messages: {}", e),
        }
    }

    async fn post(&mut self) -> Result<MessageId, DashboardError> {
        let id = self.sink.send(&self.view()).await?;
        self.message = Some(id);
        info!(
            "Status: dashboard posted (ready in {:.2}s, average {:.2}s)",
            self.load_time, self.average
        );
        Ok(id)
    }

    /// Edits the dashboard, replacing it if it was deleted. Other failures
    /// are logged and the current message is kept.
    pub async fn refresh(&mut self) -> RefreshOutcome {
        let view = self.view();

        let edited = match self.message {
            Some(id) => self.sink.edit(id, &view).await,
            None => Err(DashboardError::NotFound),
        };

        match edited {
            Ok(()) => RefreshOutcome::Edited,
            Err(DashboardError::NotFound) => match self.sink.send(&view).await {
                Ok(id) => {
                    info!("Status: dashboard message missing, posted replacement {}", id);
                    self.message = Some(id);
                    RefreshOutcome::Replaced(id)
                }
                Err(e) => {
                    error!("Status: failed to post replacement dashboard: {}", e);
                    RefreshOutcome::Failed
                }
            },
            Err(e) => {
                error!("Status: failed to update dashboard: {}", e);
                RefreshOutcome::Failed
            }
        }
    }

    /// Refreshes until the task is aborted.
    pub async fn run(mut self) {
        let mut delay = self.delay.initial();
        loop {
            tokio::time::sleep(delay).await;
            let started = Instant::now();
            self.refresh().await;
            delay = self.delay.record(started.elapsed());
        }
    }
}
