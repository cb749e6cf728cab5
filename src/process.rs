//! Process-level restart helpers.
//!
//! A restart is always cold: the current process image is replaced and only
//! what is already in the database survives.

use std::convert::Infallible;
use std::env;
use std::io::Write;
use std::process::Command;

pub fn clear_terminal() {
    let mut stdout = std::io::stdout();
    let _ = write!(stdout, "\x1B[2J\x1B[1;1H");
    let _ = stdout.flush();
}

/// Replaces the running process with a fresh invocation of the same
/// executable and arguments. Only returns on failure.
pub fn cold_restart() -> anyhow::Result<Infallible> {
    let exe = env::current_exe()?;
    let mut command = Command::new(exe);
    command.args(env::args_os().skip(1));
    exec(command)
}

#[cfg(unix)]
fn exec(mut command: Command) -> anyhow::Result<Infallible> {
    use std::os::unix::process::CommandExt;
    Err(command.exec().into())
}

#[cfg(not(unix))]
fn exec(mut command: Command) -> anyhow::Result<Infallible> {
    command.spawn()?;
    std::process::exit(0)
}
