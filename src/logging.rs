use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Line written to the log file once per process start.
pub fn run_separator(now: chrono::DateTime<chrono::Local>) -> String {
    format!("\n\n-----{}-----\n", now.format("%Y-%m-%d %H:%M:%S"))
}

fn open_log_file(path: &Path) -> anyhow::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Writes the run separator and installs console and file logging.
pub fn init(log_file: &Path) -> anyhow::Result<()> {
    let mut file = open_log_file(log_file)?;
    file.write_all(run_separator(chrono::Local::now()).as_bytes())?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_run_separator_format() {
        let now = chrono::Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(run_separator(now), "\n\n-----2024-01-02 03:04:05-----\n");
    }

    #[test]
    fn test_log_file_is_appended() {
        let path = std::env::temp_dir()
            .join(format!("guppi-log-{}", std::process::id()))
            .join("bot.log");
        let _ = fs::remove_file(&path);

        open_log_file(&path).unwrap().write_all(b"first\n").unwrap();
        open_log_file(&path).unwrap().write_all(b"second\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
