use crate::process;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub const VERSION_PREFIX: &str = "#Version:";

#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("failed to read version marker from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0:?} does not start with a `#Version:` marker")]
    MissingMarker(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionChange {
    pub before: String,
    pub after: String,
}

/// Extracts the token from a `#Version: <token>` line.
pub fn parse_marker(line: &str) -> Option<String> {
    let token = line.trim().strip_prefix(VERSION_PREFIX)?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

pub fn read_version(path: &Path) -> Result<String, WatcherError> {
    let file = File::open(path).map_err(|source| WatcherError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut first = String::new();
    BufReader::new(file)
        .read_line(&mut first)
        .map_err(|source| WatcherError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    parse_marker(&first).ok_or_else(|| WatcherError::MissingMarker(path.to_path_buf()))
}

/// Polls the version marker and cold-restarts the process when it changes.
pub struct VersionWatcher {
    path: PathBuf,
    baseline: Option<String>,
    interval: Duration,
    failing: bool,
}

impl VersionWatcher {
    /// Captures the current marker as baseline. If it cannot be read yet, the
    /// first successful read becomes the baseline.
    pub fn capture(path: impl Into<PathBuf>, interval: Duration) -> Self {
        let path = path.into();
        let baseline = match read_version(&path) {
            Ok(version) => Some(version),
            Err(e) => {
                warn!("Version watcher: no baseline yet: {}", e);
                None
            }
        };
        Self {
            path,
            baseline,
            interval,
            failing: false,
        }
    }

    pub fn baseline(&self) -> Option<&str> {
        self.baseline.as_deref()
    }

    /// Reads the marker once. A detected change is reported a single time;
    /// the new value becomes the baseline.
    pub fn check(&mut self) -> Result<Option<VersionChange>, WatcherError> {
        let current = read_version(&self.path)?;
        match self.baseline.replace(current.clone()) {
            None => {
                info!("Version watcher: baseline set to {}", current);
                Ok(None)
            }
            Some(before) if before == current => Ok(None),
            Some(before) => Ok(Some(VersionChange {
                before,
                after: current,
            })),
        }
    }

    /// True while the marker cannot be read.
    pub fn is_failing(&self) -> bool {
        self.failing
    }

    /// One watcher tick. Read failures are skipped; the first one of a run
    /// and the recovery are logged at warn level.
    pub fn poll(&mut self) -> Option<VersionChange> {
        match self.check() {
            Ok(change) => {
                if self.failing {
                    warn!("Version watcher: {:?} is readable again", self.path);
                    self.failing = false;
                }
                change
            }
            Err(e) => {
                if self.failing {
                    debug!("Version watcher: still failing: {}", e);
                } else {
                    warn!("Version watcher: skipping ticks until the marker is readable: {}", e);
                    self.failing = true;
                }
                None
            }
        }
    }

    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(change) = self.poll() else {
                continue;
            };
            process::clear_terminal();
            let notice = format!("Updated:\nbefore: {}\nafter: {}\n", change.before, change.after);
            println!("{}", notice);
            info!(
                "Version changed from {} to {}, restarting",
                change.before, change.after
            );
            if let Err(e) = process::cold_restart() {
                error!("Version watcher: restart failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn marker_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "guppi-version-{}-{}",
            name,
            std::process::id()
        ));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_parse_marker() {
        assert_eq!(parse_marker("#Version: Alpha 0.0.1\n"), Some("Alpha 0.0.1".to_string()));
        assert_eq!(parse_marker("  #Version:0.2  "), Some("0.2".to_string()));
        assert_eq!(parse_marker("#Version:   "), None);
        assert_eq!(parse_marker("import discord"), None);
    }

    #[test]
    fn test_read_version_uses_first_line_only() {
        let path = marker_file("first-line", "#Version: 1.0\n#Version: 2.0\n");
        assert_eq!(read_version(&path).unwrap(), "1.0");
        let _ = fs::remove_file(&path);

        let path = marker_file("no-marker", "fn main() {}\n");
        assert!(matches!(read_version(&path), Err(WatcherError::MissingMarker(_))));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_change_detected_once() {
        let path = marker_file("change", "#Version: 0.0.1\n");
        let mut watcher = VersionWatcher::capture(&path, Duration::from_secs(10));
        assert_eq!(watcher.baseline(), Some("0.0.1"));
        assert_eq!(watcher.check().unwrap(), None);

        fs::write(&path, "#Version: 0.0.2\n").unwrap();
        assert_eq!(
            watcher.check().unwrap(),
            Some(VersionChange {
                before: "0.0.1".to_string(),
                after: "0.0.2".to_string(),
            })
        );
        assert_eq!(watcher.check().unwrap(), None);
        assert_eq!(watcher.check().unwrap(), None);
        assert_eq!(watcher.baseline(), Some("0.0.2"));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_read_failure_skips_tick() {
        let path = marker_file("vanish", "#Version: 0.0.1\n");
        let mut watcher = VersionWatcher::capture(&path, Duration::from_secs(10));
        fs::remove_file(&path).unwrap();

        assert!(matches!(watcher.check(), Err(WatcherError::Read { .. })));
        assert_eq!(watcher.baseline(), Some("0.0.1"));

        fs::write(&path, "#Version: 0.0.1\n").unwrap();
        assert_eq!(watcher.check().unwrap(), None);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_poll_tracks_failure_and_recovery() {
        let path = marker_file("recover", "#Version: 1\n");
        let mut watcher = VersionWatcher::capture(&path, Duration::from_secs(10));
        assert!(!watcher.is_failing());

        fs::remove_file(&path).unwrap();
        assert_eq!(watcher.poll(), None);
        assert!(watcher.is_failing());
        assert_eq!(watcher.poll(), None);
        assert!(watcher.is_failing());

        fs::write(&path, "#Version: 2\n").unwrap();
        assert_eq!(
            watcher.poll(),
            Some(VersionChange {
                before: "1".to_string(),
                after: "2".to_string(),
            })
        );
        assert!(!watcher.is_failing());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_at_start_adopts_first_read() {
        let path = std::env::temp_dir().join(format!("guppi-version-late-{}", std::process::id()));
        let _ = fs::remove_file(&path);
        let mut watcher = VersionWatcher::capture(&path, Duration::from_secs(10));
        assert_eq!(watcher.baseline(), None);

        fs::write(&path, "#Version: 3\n").unwrap();
        assert_eq!(watcher.check().unwrap(), None);
        assert_eq!(watcher.baseline(), Some("3"));
        let _ = fs::remove_file(&path);
    }
}
