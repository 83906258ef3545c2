// src/api/corporation.rs — corp/IndustryJobs

use super::xml::{Row, XmlResult};
use super::{KeyPair, Scope, XmlClient};
use crate::db::models::IndustryJob;
use crate::db::Store;
use crate::infra::errors::EveApiError;

/// Pull the corporation's industry jobs and upsert each one.
/// Returns the number of jobs written.
pub async fn update_industry_jobs(
    client: &XmlClient,
    store: &Store,
    key: &KeyPair,
) -> anyhow::Result<usize> {
    let info = store
        .api_key_info(key.key_id())?
        .filter(|info| info.is_corporation())
        .ok_or_else(|| anyhow::anyhow!("Key {} is not a corporation key", key.key_id()))?;
    let corporation_id = info
        .corporation_id
        .ok_or_else(|| anyhow::anyhow!("Key {} has no corporation id", key.key_id()))?;

    let result = client.call(Some(key), Scope::Corp, "IndustryJobs", &[]).await?;

    store.insert_job_log(
        &format!("key:{}", key.key_id()),
        "industryjobs",
        &format!("API responded with {} jobs", result.rowset("jobs").len()),
        false,
    )?;

    store_industry_jobs(store, corporation_id, &result)
}

/// Write every row of the `jobs` rowset, overwriting earlier snapshots.
pub fn store_industry_jobs(
    store: &Store,
    corporation_id: i64,
    result: &XmlResult,
) -> anyhow::Result<usize> {
    let rows = result.rowset("jobs");
    for row in &rows {
        let job = industry_job_from_row(corporation_id, row)?;
        store.upsert_industry_job(&job)?;
    }
    Ok(rows.len())
}

fn industry_job_from_row(corporation_id: i64, row: &Row<'_>) -> Result<IndustryJob, EveApiError> {
    Ok(IndustryJob {
        corporation_id,
        job_id: row.i64("jobID")?,
        installer_id: row.i64("installerID")?,
        installer_name: row.str("installerName")?.to_string(),
        facility_id: row.i64("facilityID")?,
        solar_system_id: row.i64("solarSystemID")?,
        solar_system_name: row.str("solarSystemName")?.to_string(),
        station_id: row.i64("stationID")?,
        activity_id: row.i64("activityID")?,
        blueprint_id: row.i64("blueprintID")?,
        blueprint_type_id: row.i64("blueprintTypeID")?,
        blueprint_type_name: row.str("blueprintTypeName")?.to_string(),
        blueprint_location_id: row.i64("blueprintLocationID")?,
        output_location_id: row.i64("outputLocationID")?,
        runs: row.i64("runs")?,
        cost: row.f64("cost")?,
        team_id: row.i64("teamID")?,
        licensed_runs: row.i64("licensedRuns")?,
        probability: row.f64("probability")?,
        product_type_id: row.i64("productTypeID")?,
        product_type_name: row.str("productTypeName")?.to_string(),
        status: row.i64("status")?,
        time_in_seconds: row.i64("timeInSeconds")?,
        start_date: row.datetime("startDate")?,
        end_date: row.datetime("endDate")?,
        pause_date: row.datetime("pauseDate")?,
        completed_date: row.datetime("completedDate")?,
        completed_character_id: row.i64("completedCharacterID")?,
        successful_runs: row.i64("successfulRuns")?,
    })
}
