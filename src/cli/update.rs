// src/cli/update.rs — `update` and `daemon` commands

use super::DaemonAction;
use crate::infra::config::Config;
use crate::infra::{daemon, paths};
use crate::updater::{self, UpdateContext};

/// Run a single pass and print its summary.
pub async fn run_update(config: Config) -> anyhow::Result<()> {
    let ctx = open_context(config).await?;
    let summary = updater::run_once(&ctx).await?;
    println!("{summary}");
    if summary.has_failures() {
        println!("Some jobs failed; see `eveapi status` for recent errors.");
    }
    Ok(())
}

pub async fn run_daemon_command(
    action: Option<DaemonAction>,
    config: Config,
) -> anyhow::Result<()> {
    match action.unwrap_or(DaemonAction::Start) {
        DaemonAction::Start => {
            if daemon::is_daemon_running() {
                println!("Daemon is already running.");
                return Ok(());
            }
            let interval = config.updater.interval();
            let ctx = open_context(config).await?;
            updater::run_daemon(&ctx, interval).await
        }
        DaemonAction::Stop => {
            match daemon::stop_daemon()? {
                Some(pid) => println!("Sent stop signal to daemon (PID {pid})."),
                None => println!("Daemon is not running."),
            }
            Ok(())
        }
        DaemonAction::Status => {
            match daemon::read_pid().filter(|_| daemon::is_daemon_running()) {
                Some(pid) => println!("Daemon is running (PID {pid})."),
                None => println!("Daemon is not running."),
            }
            Ok(())
        }
    }
}

async fn open_context(config: Config) -> anyhow::Result<UpdateContext> {
    paths::ensure_dirs().await?;
    let store = crate::db::open(&paths::db_path())?;
    UpdateContext::new(config, store)
}
