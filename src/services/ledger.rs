use crate::db::Database;
use thiserror::Error;

/// Number of startup durations kept for the rolling average.
pub const LEDGER_CAPACITY: usize = 3;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("no startup times have been recorded")]
    EmptyLedger,
    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

/// Persistent record of the most recent startup durations, in seconds.
pub struct StartupLedger {
    db: Database,
    capacity: usize,
}

impl StartupLedger {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            capacity: LEDGER_CAPACITY,
        }
    }

    /// Appends `duration` and evicts the oldest entries past capacity.
    /// Returns the retained window, oldest first.
    pub fn record(&self, duration: f64) -> Result<Vec<f64>, LedgerError> {
        let mut times = self.db.startup_times()?;
        push_capped(&mut times, duration, self.capacity);
        self.db.replace_startup_times(&times)?;
        Ok(times)
    }

    pub fn average(&self) -> Result<f64, LedgerError> {
        mean(&self.db.startup_times()?).ok_or(LedgerError::EmptyLedger)
    }
}

pub fn push_capped(values: &mut Vec<f64>, value: f64, capacity: usize) {
    values.push(value);
    if values.len() > capacity {
        let excess = values.len() - capacity;
        values.drain(..excess);
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Rounds to two decimals, the precision shown on the dashboard.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
