// src/db/store.rs — SQLite operations

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::models::{
    ApiKey, ApiKeyInfo, CharacterAffiliation, CharacterRole, CorporationDivision, DivisionType,
    IndustryJob, JobLogRow, RefreshToken, WalletJournalEntry,
};

/// Tables reported by `eveapi status`.
const COUNTED_TABLES: &[&str] = &[
    "api_keys",
    "refresh_tokens",
    "corporation_divisions",
    "corporation_wallet_journals",
    "corporation_industry_jobs",
    "job_logs",
];

/// Low-level SQLite operations for all data types.
pub struct Store {
    conn: Connection,
}

fn ts(value: Option<DateTime<Utc>>) -> Option<String> {
    value.map(|d| d.to_rfc3339())
}

fn ts_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
    })
    .transpose()
}

impl Store {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    // -- API keys --

    pub fn add_api_key(&self, key_id: i64, v_code: &str) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO api_keys (key_id, v_code, enabled, created_at, updated_at)
             VALUES (?1, ?2, 1, ?3, ?3)
             ON CONFLICT(key_id) DO UPDATE SET v_code = excluded.v_code, enabled = 1,
             last_error = NULL, updated_at = excluded.updated_at",
            params![key_id, v_code, now],
        )?;
        Ok(())
    }

    pub fn remove_api_key(&self, key_id: i64) -> anyhow::Result<bool> {
        self.conn
            .execute("DELETE FROM api_key_info WHERE key_id = ?1", params![key_id])?;
        let removed = self
            .conn
            .execute("DELETE FROM api_keys WHERE key_id = ?1", params![key_id])?;
        Ok(removed > 0)
    }

    pub fn list_api_keys(&self) -> anyhow::Result<Vec<ApiKey>> {
        self.query_api_keys(
            "SELECT key_id, v_code, enabled, last_error FROM api_keys ORDER BY key_id",
        )
    }

    pub fn enabled_api_keys(&self) -> anyhow::Result<Vec<ApiKey>> {
        self.query_api_keys(
            "SELECT key_id, v_code, enabled, last_error FROM api_keys
             WHERE enabled = 1 ORDER BY key_id",
        )
    }

    fn query_api_keys(&self, sql: &str) -> anyhow::Result<Vec<ApiKey>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(ApiKey {
                key_id: row.get(0)?,
                v_code: row.get(1)?,
                enabled: row.get::<_, i64>(2)? != 0,
                last_error: row.get(3)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Record (or clear) the last update error for a key.
    pub fn set_api_key_error(&self, key_id: i64, error: Option<&str>) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE api_keys SET last_error = ?1, updated_at = ?2 WHERE key_id = ?3",
            params![error, now, key_id],
        )?;
        Ok(())
    }

    pub fn disable_api_key(&self, key_id: i64, reason: &str) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE api_keys SET enabled = 0, last_error = ?1, updated_at = ?2 WHERE key_id = ?3",
            params![reason, now, key_id],
        )?;
        Ok(())
    }

    pub fn upsert_api_key_info(&self, info: &ApiKeyInfo) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO api_key_info (key_id, access_mask, type, expires, corporation_id, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(key_id) DO UPDATE SET access_mask = excluded.access_mask,
             type = excluded.type, expires = excluded.expires,
             corporation_id = excluded.corporation_id, updated_at = excluded.updated_at",
            params![
                info.key_id,
                info.access_mask,
                info.key_type,
                ts(info.expires),
                info.corporation_id,
                now
            ],
        )?;
        Ok(())
    }

    pub fn api_key_info(&self, key_id: i64) -> anyhow::Result<Option<ApiKeyInfo>> {
        let info = self
            .conn
            .query_row(
                "SELECT key_id, access_mask, type, expires, corporation_id
                 FROM api_key_info WHERE key_id = ?1",
                params![key_id],
                |row| {
                    Ok(ApiKeyInfo {
                        key_id: row.get(0)?,
                        access_mask: row.get(1)?,
                        key_type: row.get(2)?,
                        expires: ts_column(row, 3)?,
                        corporation_id: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(info)
    }

    // -- Refresh tokens --

    pub fn upsert_refresh_token(&self, token: &RefreshToken) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO refresh_tokens (character_id, version, scopes, access_token,
             refresh_token, expires_on, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
             ON CONFLICT(character_id) DO UPDATE SET version = excluded.version,
             scopes = excluded.scopes, access_token = excluded.access_token,
             refresh_token = excluded.refresh_token, expires_on = excluded.expires_on,
             updated_at = excluded.updated_at",
            params![
                token.character_id,
                token.version,
                token.scopes_string(),
                token.access_token,
                token.refresh_token,
                ts(token.expires_on),
                now
            ],
        )?;
        Ok(())
    }

    pub fn refresh_tokens(&self) -> anyhow::Result<Vec<RefreshToken>> {
        let mut stmt = self.conn.prepare(
            "SELECT character_id, version, scopes, access_token, refresh_token, expires_on
             FROM refresh_tokens ORDER BY character_id",
        )?;
        let rows = stmt.query_map([], Self::map_token)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn refresh_token(&self, character_id: i64) -> anyhow::Result<Option<RefreshToken>> {
        let token = self
            .conn
            .query_row(
                "SELECT character_id, version, scopes, access_token, refresh_token, expires_on
                 FROM refresh_tokens WHERE character_id = ?1",
                params![character_id],
                Self::map_token,
            )
            .optional()?;
        Ok(token)
    }

    fn map_token(row: &Row<'_>) -> rusqlite::Result<RefreshToken> {
        let scopes: String = row.get(2)?;
        Ok(RefreshToken {
            character_id: row.get(0)?,
            version: row.get(1)?,
            scopes: RefreshToken::parse_scopes(&scopes),
            access_token: row.get(3)?,
            refresh_token: row.get(4)?,
            expires_on: ts_column(row, 5)?,
        })
    }

    pub fn remove_refresh_token(&self, character_id: i64) -> anyhow::Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM refresh_tokens WHERE character_id = ?1",
            params![character_id],
        )?;
        Ok(removed > 0)
    }

    // -- Character affiliation and roles --

    pub fn upsert_affiliation(&self, affiliation: &CharacterAffiliation) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO character_affiliations (character_id, corporation_id, alliance_id,
             faction_id, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(character_id) DO UPDATE SET corporation_id = excluded.corporation_id,
             alliance_id = excluded.alliance_id, faction_id = excluded.faction_id,
             updated_at = excluded.updated_at",
            params![
                affiliation.character_id,
                affiliation.corporation_id,
                affiliation.alliance_id,
                affiliation.faction_id,
                now
            ],
        )?;
        Ok(())
    }

    pub fn corporation_id_for(&self, character_id: i64) -> anyhow::Result<Option<i64>> {
        let corp = self
            .conn
            .query_row(
                "SELECT corporation_id FROM character_affiliations WHERE character_id = ?1",
                params![character_id],
                |r| r.get(0),
            )
            .optional()?;
        Ok(corp)
    }

    pub fn replace_character_roles(
        &self,
        character_id: i64,
        roles: &[CharacterRole],
    ) -> anyhow::Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM character_roles WHERE character_id = ?1",
            params![character_id],
        )?;
        for role in roles {
            tx.execute(
                "INSERT OR IGNORE INTO character_roles (character_id, role, scope)
                 VALUES (?1, ?2, ?3)",
                params![character_id, role.role, role.scope],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn character_roles(&self, character_id: i64) -> anyhow::Result<Vec<CharacterRole>> {
        let mut stmt = self.conn.prepare(
            "SELECT role, scope FROM character_roles WHERE character_id = ?1
             ORDER BY scope, role",
        )?;
        let rows = stmt.query_map(params![character_id], |row| {
            Ok(CharacterRole {
                role: row.get(0)?,
                scope: row.get(1)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    // -- Corporation divisions --

    pub fn replace_corporation_divisions(
        &self,
        corporation_id: i64,
        divisions: &[CorporationDivision],
    ) -> anyhow::Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM corporation_divisions WHERE corporation_id = ?1",
            params![corporation_id],
        )?;
        for d in divisions {
            tx.execute(
                "INSERT OR REPLACE INTO corporation_divisions (corporation_id, type, division, name)
                 VALUES (?1, ?2, ?3, ?4)",
                params![corporation_id, d.division_type.as_str(), d.division, d.name],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Wallet divisions of a corporation, lowest division first.
    pub fn wallet_divisions(
        &self,
        corporation_id: i64,
    ) -> anyhow::Result<Vec<CorporationDivision>> {
        let mut stmt = self.conn.prepare(
            "SELECT division, name FROM corporation_divisions
             WHERE corporation_id = ?1 AND type = 'wallet' ORDER BY division",
        )?;
        let rows = stmt.query_map(params![corporation_id], |row| {
            Ok(CorporationDivision {
                corporation_id,
                division_type: DivisionType::Wallet,
                division: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    // -- Wallet journal --

    pub fn journal_entry_exists(
        &self,
        corporation_id: i64,
        division: i64,
        id: i64,
    ) -> anyhow::Result<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT COUNT(*) > 0 FROM corporation_wallet_journals
             WHERE corporation_id = ?1 AND division = ?2 AND id = ?3",
            params![corporation_id, division, id],
            |r| r.get(0),
        )?;
        Ok(exists)
    }

    /// Insert a journal entry. Existing rows are left untouched; returns
    /// whether a row was written.
    pub fn insert_journal_entry(&self, entry: &WalletJournalEntry) -> anyhow::Result<bool> {
        let now = Utc::now().to_rfc3339();
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO corporation_wallet_journals (corporation_id, division, id,
             date, ref_type, first_party_id, second_party_id, amount, balance, reason,
             tax_receiver_id, tax, description, context_id, context_type_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                entry.corporation_id,
                entry.division,
                entry.id,
                entry.date.to_rfc3339(),
                entry.ref_type,
                entry.first_party_id,
                entry.second_party_id,
                entry.amount,
                entry.balance,
                entry.reason,
                entry.tax_receiver_id,
                entry.tax,
                entry.description,
                entry.context_id,
                entry.context_type_id,
                now
            ],
        )?;
        Ok(inserted > 0)
    }

    /// Journal entries of one division, newest first.
    pub fn journal_entries(
        &self,
        corporation_id: i64,
        division: i64,
    ) -> anyhow::Result<Vec<WalletJournalEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT corporation_id, division, id, date, ref_type, first_party_id,
             second_party_id, amount, balance, reason, tax_receiver_id, tax, description,
             context_id, context_type_id
             FROM corporation_wallet_journals
             WHERE corporation_id = ?1 AND division = ?2 ORDER BY id DESC",
        )?;
        let rows = stmt.query_map(params![corporation_id, division], |row| {
            let date = ts_column(row, 3)?.ok_or(rusqlite::Error::InvalidColumnType(
                3,
                "date".into(),
                rusqlite::types::Type::Null,
            ))?;
            Ok(WalletJournalEntry {
                corporation_id: row.get(0)?,
                division: row.get(1)?,
                id: row.get(2)?,
                date,
                ref_type: row.get(4)?,
                first_party_id: row.get(5)?,
                second_party_id: row.get(6)?,
                amount: row.get(7)?,
                balance: row.get(8)?,
                reason: row.get(9)?,
                tax_receiver_id: row.get(10)?,
                tax: row.get(11)?,
                description: row.get(12)?,
                context_id: row.get(13)?,
                context_type_id: row.get(14)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    // -- Industry jobs --

    /// Insert or overwrite an industry job keyed by (corporation, job id).
    pub fn upsert_industry_job(&self, job: &IndustryJob) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR REPLACE INTO corporation_industry_jobs (corporation_id, job_id,
             installer_id, installer_name, facility_id, solar_system_id, solar_system_name,
             station_id, activity_id, blueprint_id, blueprint_type_id, blueprint_type_name,
             blueprint_location_id, output_location_id, runs, cost, team_id, licensed_runs,
             probability, product_type_id, product_type_name, status, time_in_seconds,
             start_date, end_date, pause_date, completed_date, completed_character_id,
             successful_runs, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
             ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30)",
            params![
                job.corporation_id,
                job.job_id,
                job.installer_id,
                job.installer_name,
                job.facility_id,
                job.solar_system_id,
                job.solar_system_name,
                job.station_id,
                job.activity_id,
                job.blueprint_id,
                job.blueprint_type_id,
                job.blueprint_type_name,
                job.blueprint_location_id,
                job.output_location_id,
                job.runs,
                job.cost,
                job.team_id,
                job.licensed_runs,
                job.probability,
                job.product_type_id,
                job.product_type_name,
                job.status,
                job.time_in_seconds,
                ts(job.start_date),
                ts(job.end_date),
                ts(job.pause_date),
                ts(job.completed_date),
                job.completed_character_id,
                job.successful_runs,
                now
            ],
        )?;
        Ok(())
    }

    /// (job id, status, successful runs) for every job of a corporation.
    pub fn industry_job_statuses(
        &self,
        corporation_id: i64,
    ) -> anyhow::Result<Vec<(i64, i64, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT job_id, status, successful_runs FROM corporation_industry_jobs
             WHERE corporation_id = ?1 ORDER BY job_id",
        )?;
        let rows = stmt.query_map(params![corporation_id], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    // -- Job logs --

    pub fn insert_job_log(
        &self,
        owner: &str,
        job: &str,
        message: &str,
        failed: bool,
    ) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO job_logs (owner, job, message, failed, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![owner, job, message, failed as i64, now],
        )?;
        Ok(())
    }

    pub fn recent_job_logs(&self, limit: u32) -> anyhow::Result<Vec<JobLogRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, owner, job, message, failed, created_at FROM job_logs
             ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(JobLogRow {
                id: row.get(0)?,
                owner: row.get(1)?,
                job: row.get(2)?,
                message: row.get(3)?,
                failed: row.get::<_, i64>(4)? != 0,
                created_at: row.get(5)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    // -- Stats --

    pub fn table_counts(&self) -> anyhow::Result<Vec<(&'static str, i64)>> {
        let mut out = Vec::with_capacity(COUNTED_TABLES.len());
        for table in COUNTED_TABLES {
            let count: i64 =
                self.conn
                    .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?;
            out.push((*table, count));
        }
        Ok(out)
    }
}
