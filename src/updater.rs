// src/updater.rs — One sequential update pass, and the loop that repeats it
//
// XML keys first, then SSO tokens. A failing job is recorded and the pass
// moves on to the next job or credential.

use std::time::Duration;

use crate::api::cache::XmlCache;
use crate::api::{account, corporation, KeyPair, XmlClient};
use crate::db::models::{ApiKey, RefreshToken};
use crate::db::Store;
use crate::esi::cache::EsiCache;
use crate::esi::job::{JobContext, JobOutcome};
use crate::esi::{sso, EsiClient};
use crate::infra::config::Config;
use crate::infra::{daemon, paths};
use crate::jobs;

/// Clients and storage shared by every job in a pass.
pub struct UpdateContext {
    pub config: Config,
    pub store: Store,
    pub xml: XmlClient,
    pub esi: EsiClient,
}

impl UpdateContext {
    /// Build the clients from configuration. Response caches live under
    /// the cache directory unless disabled.
    pub fn new(config: Config, store: Store) -> anyhow::Result<Self> {
        let (xml_cache, esi_cache) = if config.cache.enabled {
            (
                Some(XmlCache::new(paths::xml_cache_dir())),
                Some(EsiCache::new(paths::esi_cache_dir())),
            )
        } else {
            (None, None)
        };

        let xml = XmlClient::new(&config, xml_cache)?;
        let esi = EsiClient::new(&config, esi_cache)?;
        Ok(Self {
            config,
            store,
            xml,
            esi,
        })
    }
}

/// What a pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub keys: usize,
    pub tokens: usize,
    pub jobs_run: usize,
    pub jobs_skipped: usize,
    pub jobs_failed: usize,
    pub journal_entries: usize,
}

impl UpdateSummary {
    pub fn has_failures(&self) -> bool {
        self.jobs_failed > 0
    }
}

impl std::fmt::Display for UpdateSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} key(s), {} token(s): {} job(s) run, {} skipped, {} failed; {} new journal entries",
            self.keys,
            self.tokens,
            self.jobs_run,
            self.jobs_skipped,
            self.jobs_failed,
            self.journal_entries
        )
    }
}

/// Run every job once for every stored credential.
pub async fn run_once(ctx: &UpdateContext) -> anyhow::Result<UpdateSummary> {
    let mut summary = UpdateSummary::default();

    for key in ctx.store.enabled_api_keys()? {
        summary.keys += 1;
        update_key(ctx, &key, &mut summary).await?;
    }

    for token in ctx.store.refresh_tokens()? {
        summary.tokens += 1;
        update_token(ctx, token, &mut summary).await?;
    }

    tracing::info!("Update pass finished: {}", summary);
    Ok(summary)
}

async fn update_key(
    ctx: &UpdateContext,
    key: &ApiKey,
    summary: &mut UpdateSummary,
) -> anyhow::Result<()> {
    let owner = format!("key:{}", key.key_id);

    let pair = match KeyPair::try_from(key) {
        Ok(pair) => pair,
        Err(e) => {
            tracing::warn!(key_id = key.key_id, "Disabling key: {}", e);
            ctx.store.disable_api_key(key.key_id, &e.to_string())?;
            ctx.store.insert_job_log(&owner, "apikeyinfo", &e.to_string(), true)?;
            summary.jobs_failed += 1;
            return Ok(());
        }
    };

    summary.jobs_run += 1;
    let info = match account::update_key_info(&ctx.xml, &ctx.store, &pair).await {
        Ok(info) => info,
        Err(e) => {
            record_key_failure(ctx, key.key_id, &owner, "apikeyinfo", &e)?;
            summary.jobs_failed += 1;
            return Ok(());
        }
    };

    if info.is_corporation() {
        summary.jobs_run += 1;
        match corporation::update_industry_jobs(&ctx.xml, &ctx.store, &pair).await {
            Ok(written) => {
                tracing::debug!(key_id = key.key_id, written, "Industry jobs stored");
            }
            Err(e) => {
                record_key_failure(ctx, key.key_id, &owner, "industryjobs", &e)?;
                summary.jobs_failed += 1;
                return Ok(());
            }
        }
    }

    ctx.store.set_api_key_error(key.key_id, None)?;
    Ok(())
}

fn record_key_failure(
    ctx: &UpdateContext,
    key_id: i64,
    owner: &str,
    job: &str,
    error: &anyhow::Error,
) -> anyhow::Result<()> {
    tracing::warn!(key_id, job, "XML API job failed: {:#}", error);
    let message = format!("{error:#}");
    ctx.store.set_api_key_error(key_id, Some(&message))?;
    ctx.store.insert_job_log(owner, job, &message, true)
}

async fn update_token(
    ctx: &UpdateContext,
    token: RefreshToken,
    summary: &mut UpdateSummary,
) -> anyhow::Result<()> {
    let character_id = token.character_id;
    let owner = format!("character:{character_id}");

    let token = match sso::ensure_fresh(ctx.esi.http(), &ctx.config.sso, &ctx.store, token).await
    {
        Ok(token) => token,
        Err(e) => {
            tracing::warn!(character_id, "Token refresh failed: {:#}", e);
            ctx.store
                .insert_job_log(&owner, "sso", &format!("{e:#}"), true)?;
            summary.jobs_failed += 1;
            return Ok(());
        }
    };

    let job_ctx = JobContext::new(&ctx.esi, &ctx.store, &token);
    for mut job in jobs::token_jobs() {
        let name = job.name();
        match job.handle(&job_ctx).await {
            Ok(JobOutcome::Skipped(reason)) => {
                tracing::debug!(character_id, job = name, "Skipped: {}", reason);
                summary.jobs_skipped += 1;
            }
            Ok(JobOutcome::Unchanged) => {
                summary.jobs_run += 1;
            }
            Ok(JobOutcome::Completed { records }) => {
                summary.jobs_run += 1;
                if job.tags().contains(&"journals") {
                    summary.journal_entries += records;
                }
                ctx.store.insert_job_log(
                    &owner,
                    name,
                    &format!("{records} record(s) written"),
                    false,
                )?;
            }
            Err(e) => {
                tracing::warn!(character_id, job = name, "ESI job failed: {:#}", e);
                ctx.store
                    .insert_job_log(&owner, name, &format!("{e:#}"), true)?;
                summary.jobs_failed += 1;
            }
        }
    }

    Ok(())
}

/// Repeat `run_once` every `interval` until Ctrl-C.
pub async fn run_daemon(ctx: &UpdateContext, interval: Duration) -> anyhow::Result<()> {
    let pid_path = daemon::write_pid_file()?;
    tracing::info!("Daemon started, PID file {}", pid_path.display());

    let result = daemon_loop(ctx, interval).await;

    daemon::remove_pid_file();
    tracing::info!("Daemon stopped.");
    result
}

async fn daemon_loop(ctx: &UpdateContext, interval: Duration) -> anyhow::Result<()> {
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    println!(
        "Daemon running, updating every {} minute(s). Press Ctrl+C to stop.",
        interval.as_secs() / 60
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = run_once(ctx).await {
                    tracing::error!("Update pass aborted: {:#}", e);
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received");
                println!("\nShutting down daemon...");
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_display() {
        let summary = UpdateSummary {
            keys: 1,
            tokens: 2,
            jobs_run: 7,
            jobs_skipped: 1,
            jobs_failed: 0,
            journal_entries: 42,
        };
        assert_eq!(
            summary.to_string(),
            "1 key(s), 2 token(s): 7 job(s) run, 1 skipped, 0 failed; 42 new journal entries"
        );
        assert!(!summary.has_failures());
    }
}
