// src/cli/status.rs — System status display

use crate::infra::{daemon, paths};

/// Display config and database location, row counts and recent job logs.
pub fn show_status() -> anyhow::Result<()> {
    let db_path = paths::db_path();
    let config_path = paths::config_file_path();

    println!("eveapi v{}", env!("CARGO_PKG_VERSION"));
    println!();

    if config_path.exists() {
        println!("  Config:     {} (loaded)", config_path.display());
    } else {
        println!("  Config:     (using defaults)");
    }

    if !db_path.exists() {
        println!("  Database:   (not initialized)");
        return Ok(());
    }

    let db_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);
    println!(
        "  Database:   {} ({})",
        db_path.display(),
        format_bytes(db_size)
    );

    let daemon_state = match daemon::read_pid().filter(|_| daemon::is_daemon_running()) {
        Some(pid) => format!("running (PID {pid})"),
        None => "stopped".to_string(),
    };
    println!("  Daemon:     {daemon_state}");

    let store = crate::db::open(&db_path)?;

    println!();
    println!("  Rows:");
    for (table, count) in store.table_counts()? {
        println!("    {:<30} {}", table, count);
    }

    let logs = store.recent_job_logs(10)?;
    if !logs.is_empty() {
        println!();
        println!("  Recent jobs:");
        for log in logs {
            let mark = if log.failed { "FAIL" } else { "ok" };
            println!(
                "    {} {:<4} {:<14} {:<28} {}",
                log.created_at, mark, log.owner, log.job, log.message
            );
        }
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
