// src/infra/daemon/process.rs

use std::path::PathBuf;

use crate::infra::paths;

/// Write a PID file for the daemon.
pub fn write_pid_file() -> anyhow::Result<PathBuf> {
    let pid_path = paths::pid_path();
    if let Some(parent) = pid_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&pid_path, std::process::id().to_string())?;
    Ok(pid_path)
}

/// Remove the PID file.
pub fn remove_pid_file() {
    let _ = std::fs::remove_file(paths::pid_path());
}

/// PID recorded by a running or crashed daemon.
pub fn read_pid() -> Option<u32> {
    std::fs::read_to_string(paths::pid_path())
        .ok()
        .and_then(|content| content.trim().parse().ok())
}

/// Check if a daemon is already running.
pub fn is_daemon_running() -> bool {
    let Some(pid) = read_pid() else {
        return false;
    };

    #[cfg(unix)]
    {
        std::process::Command::new("kill")
            .args(["-0", &pid.to_string()])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        true
    }
}

/// Ask a running daemon to stop. Returns the PID signalled.
pub fn stop_daemon() -> anyhow::Result<Option<u32>> {
    let Some(pid) = read_pid() else {
        return Ok(None);
    };

    if !is_daemon_running() {
        tracing::info!(pid, "Removing stale PID file");
        remove_pid_file();
        return Ok(None);
    }

    #[cfg(unix)]
    {
        let status = std::process::Command::new("kill")
            .arg(pid.to_string())
            .status()?;
        if !status.success() {
            anyhow::bail!("Failed to stop daemon (PID {pid})");
        }
        remove_pid_file();
        Ok(Some(pid))
    }
    #[cfg(not(unix))]
    {
        anyhow::bail!("Daemon stop is only supported on Unix systems (PID {pid})")
    }
}
