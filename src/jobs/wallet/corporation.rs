// src/jobs/wallet/corporation.rs — Corporation wallet journal walker
//
// ESI serves the journal newest-first, one page at a time, below a
// `from_id` cursor. Starting from i64::MAX, each page moves the cursor to
// one below the smallest id it contained, until a page comes back empty.
// Every wallet division is walked separately with its own cursor.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::db::models::{RefreshToken, WalletJournalEntry};
use crate::db::Store;
use crate::esi::job::{authenticated, EsiJob, JobContext, JobOutcome};
use crate::esi::{EsiClient, EsiRequest};
use crate::infra::errors::EveApiError;

const ENDPOINT: &str = "/corporations/{corporation_id}/wallets/{division}/journal/";
const VERSION: &str = "v4";

/// A journal line as ESI returns it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JournalEntry {
    pub id: i64,
    pub date: DateTime<Utc>,
    pub ref_type: String,
    #[serde(default)]
    pub first_party_id: Option<i64>,
    #[serde(default)]
    pub second_party_id: Option<i64>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub balance: Option<f64>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub tax_receiver_id: Option<i64>,
    #[serde(default)]
    pub tax: Option<f64>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub context_id: Option<i64>,
    #[serde(default, alias = "context_type_id")]
    pub context_id_type: Option<String>,
}

impl JournalEntry {
    pub fn into_row(self, corporation_id: i64, division: i64) -> WalletJournalEntry {
        WalletJournalEntry {
            corporation_id,
            division,
            id: self.id,
            date: self.date,
            ref_type: self.ref_type,
            first_party_id: self.first_party_id,
            second_party_id: self.second_party_id,
            amount: self.amount,
            balance: self.balance,
            reason: self.reason,
            tax_receiver_id: self.tax_receiver_id,
            tax: self.tax,
            description: self.description,
            context_id: self.context_id,
            context_type_id: self.context_id_type,
        }
    }
}

/// One page of journal entries below a cursor.
#[derive(Debug, Clone, Default)]
pub struct JournalPage {
    /// Served from the local cache: nothing new since the last walk.
    pub cached: bool,
    pub entries: Vec<JournalEntry>,
}

/// Source of journal pages.
#[async_trait(?Send)]
pub trait JournalPages {
    async fn page(
        &self,
        corporation_id: i64,
        division: i64,
        from_id: i64,
    ) -> Result<JournalPage, EveApiError>;
}

/// Journal pages fetched from ESI with a character's token.
pub struct EsiJournalPages<'a> {
    esi: &'a EsiClient,
    token: &'a RefreshToken,
}

impl<'a> EsiJournalPages<'a> {
    pub fn new(esi: &'a EsiClient, token: &'a RefreshToken) -> Self {
        Self { esi, token }
    }
}

#[async_trait(?Send)]
impl JournalPages for EsiJournalPages<'_> {
    async fn page(
        &self,
        corporation_id: i64,
        division: i64,
        from_id: i64,
    ) -> Result<JournalPage, EveApiError> {
        let request = EsiRequest::new(reqwest::Method::GET, VERSION, ENDPOINT)
            .path_value("corporation_id", corporation_id)
            .path_value("division", division)
            .query("from_id", from_id);
        let resp = self.esi.retrieve(&request, Some(self.token)).await?;
        Ok(JournalPage {
            cached: resp.is_cached_load(),
            entries: resp.json()?,
        })
    }
}

/// Totals for one walk over all divisions of a corporation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JournalWalkReport {
    pub divisions: usize,
    pub pages: usize,
    pub inserted: usize,
    pub skipped: usize,
}

/// Walk every wallet division of `corporation_id` back to its oldest entry.
pub async fn walk<P>(
    pages: &P,
    store: &Store,
    corporation_id: i64,
) -> anyhow::Result<JournalWalkReport>
where
    P: JournalPages + ?Sized,
{
    let mut report = JournalWalkReport::default();

    for division in store.wallet_divisions(corporation_id)? {
        report.divisions += 1;
        walk_division(pages, store, corporation_id, division.division, &mut report).await?;
    }

    Ok(report)
}

async fn walk_division<P>(
    pages: &P,
    store: &Store,
    corporation_id: i64,
    division: i64,
    report: &mut JournalWalkReport,
) -> anyhow::Result<()>
where
    P: JournalPages + ?Sized,
{
    let mut from_id = i64::MAX;

    loop {
        let page = pages.page(corporation_id, division, from_id).await?;
        report.pages += 1;

        if page.cached {
            tracing::debug!(corporation_id, division, "Journal unchanged since last walk");
            break;
        }

        let Some(lowest) = page.entries.iter().map(|e| e.id).min() else {
            break;
        };

        for entry in page.entries {
            if store.journal_entry_exists(corporation_id, division, entry.id)? {
                report.skipped += 1;
                continue;
            }
            store.insert_journal_entry(&entry.into_row(corporation_id, division))?;
            report.inserted += 1;
        }

        // A page that doesn't move the cursor would be fetched forever.
        let next = lowest.saturating_sub(1);
        if next >= from_id {
            tracing::warn!(
                corporation_id,
                division,
                from_id,
                "Journal page did not advance the cursor; stopping"
            );
            break;
        }
        from_id = next;
    }

    Ok(())
}

/// The corporation wallet journal job.
pub struct Journals;

#[async_trait(?Send)]
impl EsiJob for Journals {
    fn name(&self) -> &'static str {
        "wallet.corporation.journals"
    }

    fn endpoint(&self) -> &'static str {
        ENDPOINT
    }

    fn version(&self) -> &'static str {
        VERSION
    }

    fn scope(&self) -> Option<&'static str> {
        Some("esi-wallet.read_corporation_wallets.v1")
    }

    fn roles(&self) -> &'static [&'static str] {
        &["Accountant", "Junior_Accountant"]
    }

    fn tags(&self) -> &'static [&'static str] {
        &["corporation", "wallet", "journals"]
    }

    async fn handle(&mut self, ctx: &JobContext<'_>) -> anyhow::Result<JobOutcome> {
        if !authenticated(self, ctx)? {
            return Ok(JobOutcome::Skipped("not authorised".into()));
        }

        let corporation_id = ctx.corporation_id()?;
        let pages = EsiJournalPages::new(ctx.esi, ctx.token);
        let report = walk(&pages, ctx.store, corporation_id).await?;

        tracing::info!(
            corporation_id,
            divisions = report.divisions,
            pages = report.pages,
            inserted = report.inserted,
            skipped = report.skipped,
            "Wallet journal walk finished"
        );

        Ok(JobOutcome::Completed {
            records: report.inserted,
        })
    }
}
