// src/jobs/corporation.rs — Corporation hangar and wallet divisions

use async_trait::async_trait;
use serde::Deserialize;

use crate::db::models::{CorporationDivision, DivisionType};
use crate::esi::job::{authenticated, EsiJob, JobContext, JobOutcome};

#[derive(Debug, Deserialize)]
struct DivisionEntry {
    division: i64,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DivisionsResponse {
    #[serde(default)]
    hangar: Vec<DivisionEntry>,
    #[serde(default)]
    wallet: Vec<DivisionEntry>,
}

impl DivisionsResponse {
    pub fn into_divisions(self, corporation_id: i64) -> Vec<CorporationDivision> {
        let hangar = self.hangar.into_iter().map(|d| (DivisionType::Hangar, d));
        let wallet = self.wallet.into_iter().map(|d| (DivisionType::Wallet, d));
        hangar
            .chain(wallet)
            .map(|(division_type, d)| CorporationDivision {
                corporation_id,
                division_type,
                division: d.division,
                name: d.name,
            })
            .collect()
    }
}

pub struct Divisions;

#[async_trait(?Send)]
impl EsiJob for Divisions {
    fn name(&self) -> &'static str {
        "corporation.divisions"
    }

    fn endpoint(&self) -> &'static str {
        "/corporations/{corporation_id}/divisions/"
    }

    fn version(&self) -> &'static str {
        "v1"
    }

    fn scope(&self) -> Option<&'static str> {
        Some("esi-corporations.read_divisions.v1")
    }

    fn roles(&self) -> &'static [&'static str] {
        &["Director"]
    }

    fn tags(&self) -> &'static [&'static str] {
        &["corporation", "divisions"]
    }

    async fn handle(&mut self, ctx: &JobContext<'_>) -> anyhow::Result<JobOutcome> {
        if !authenticated(self, ctx)? {
            return Ok(JobOutcome::Skipped("not authorised".into()));
        }

        let corporation_id = ctx.corporation_id()?;
        let request = self.request().path_value("corporation_id", corporation_id);
        let resp = ctx.retrieve(&request).await?;
        if resp.is_cached_load() {
            return Ok(JobOutcome::Unchanged);
        }

        let divisions = resp
            .json::<DivisionsResponse>()?
            .into_divisions(corporation_id);
        ctx.store
            .replace_corporation_divisions(corporation_id, &divisions)?;

        Ok(JobOutcome::Completed {
            records: divisions.len(),
        })
    }
}
