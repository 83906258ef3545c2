// src/db/models.rs — Row types persisted by the store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An XML API key pair registered for updates.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiKey {
    pub key_id: i64,
    pub v_code: String,
    pub enabled: bool,
    pub last_error: Option<String>,
}

/// What `account/APIKeyInfo` reported about a key.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiKeyInfo {
    pub key_id: i64,
    pub access_mask: i64,
    /// `Account`, `Character` or `Corporation`.
    pub key_type: String,
    pub expires: Option<DateTime<Utc>>,
    pub corporation_id: Option<i64>,
}

impl ApiKeyInfo {
    pub fn is_corporation(&self) -> bool {
        self.key_type.eq_ignore_ascii_case("corporation")
    }
}

/// An SSO refresh token for a character.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshToken {
    pub character_id: i64,
    /// SSO version the token was issued by (1 = legacy, 2 = JWT).
    pub version: u32,
    pub scopes: Vec<String>,
    pub access_token: Option<String>,
    pub refresh_token: String,
    pub expires_on: Option<DateTime<Utc>>,
}

impl RefreshToken {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    /// An access token is usable until shortly before it expires.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match (&self.access_token, self.expires_on) {
            (Some(_), Some(expires)) => expires - chrono::Duration::seconds(60) <= now,
            _ => true,
        }
    }

    pub fn scopes_string(&self) -> String {
        self.scopes.join(" ")
    }

    pub fn parse_scopes(raw: &str) -> Vec<String> {
        raw.split_whitespace().map(str::to_string).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterAffiliation {
    pub character_id: i64,
    pub corporation_id: i64,
    pub alliance_id: Option<i64>,
    pub faction_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CharacterRole {
    pub role: String,
    /// `corporation`, `base`, `hq` or `other`.
    pub scope: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DivisionType {
    Hangar,
    Wallet,
}

impl DivisionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DivisionType::Hangar => "hangar",
            DivisionType::Wallet => "wallet",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorporationDivision {
    pub corporation_id: i64,
    pub division_type: DivisionType,
    pub division: i64,
    pub name: Option<String>,
}

/// A single corporation wallet journal line.
#[derive(Debug, Clone, PartialEq)]
pub struct WalletJournalEntry {
    pub corporation_id: i64,
    pub division: i64,
    pub id: i64,
    pub date: DateTime<Utc>,
    pub ref_type: String,
    pub first_party_id: Option<i64>,
    pub second_party_id: Option<i64>,
    pub amount: Option<f64>,
    pub balance: Option<f64>,
    pub reason: Option<String>,
    pub tax_receiver_id: Option<i64>,
    pub tax: Option<f64>,
    pub description: String,
    pub context_id: Option<i64>,
    pub context_type_id: Option<String>,
}

/// A corporation industry job as reported by `corp/IndustryJobs`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndustryJob {
    pub corporation_id: i64,
    pub job_id: i64,
    pub installer_id: i64,
    pub installer_name: String,
    pub facility_id: i64,
    pub solar_system_id: i64,
    pub solar_system_name: String,
    pub station_id: i64,
    pub activity_id: i64,
    pub blueprint_id: i64,
    pub blueprint_type_id: i64,
    pub blueprint_type_name: String,
    pub blueprint_location_id: i64,
    pub output_location_id: i64,
    pub runs: i64,
    pub cost: f64,
    pub team_id: i64,
    pub licensed_runs: i64,
    pub probability: f64,
    pub product_type_id: i64,
    pub product_type_name: String,
    pub status: i64,
    pub time_in_seconds: i64,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub pause_date: Option<DateTime<Utc>>,
    pub completed_date: Option<DateTime<Utc>>,
    pub completed_character_id: i64,
    pub successful_runs: i64,
}

#[derive(Debug, Clone)]
pub struct JobLogRow {
    pub id: i64,
    pub owner: String,
    pub job: String,
    pub message: String,
    pub failed: bool,
    pub created_at: String,
}
