// src/esi/sso.rs — Access token refresh against the EVE SSO (v2)

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::db::models::RefreshToken;
use crate::db::Store;
use crate::infra::config::SsoConfig;
use crate::infra::errors::EveApiError;

/// Current SSO token version. Tokens stored before versioning are v1.
pub const CURRENT_TOKEN_VERSION: u32 = 2;

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Apply a token endpoint response. The SSO may rotate the refresh token;
/// a successful refresh always leaves a current-version token behind.
pub fn apply_refresh(
    token: &RefreshToken,
    resp: TokenResponse,
    now: DateTime<Utc>,
) -> RefreshToken {
    RefreshToken {
        character_id: token.character_id,
        version: CURRENT_TOKEN_VERSION,
        scopes: token.scopes.clone(),
        access_token: Some(resp.access_token),
        refresh_token: resp
            .refresh_token
            .unwrap_or_else(|| token.refresh_token.clone()),
        expires_on: Some(now + Duration::seconds(resp.expires_in)),
    }
}

/// Exchange the refresh token for a new access token.
pub async fn refresh(
    client: &Client,
    sso: &SsoConfig,
    token: &RefreshToken,
) -> Result<RefreshToken, EveApiError> {
    let (client_id, client_secret) = sso.client_credentials().ok_or_else(|| {
        EveApiError::Config("sso.client_id and sso.client_secret must be set".into())
    })?;

    let resp = client
        .post(&sso.token_url)
        .basic_auth(client_id, Some(client_secret))
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", token.refresh_token.as_str()),
        ])
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(EveApiError::TokenRefresh(format!(
            "character {} got HTTP {status}: {body}",
            token.character_id
        )));
    }

    let parsed: TokenResponse = resp.json().await?;
    Ok(apply_refresh(token, parsed, Utc::now()))
}

/// Refresh the token if its access token has expired, persisting the result.
pub async fn ensure_fresh(
    client: &Client,
    sso: &SsoConfig,
    store: &Store,
    token: RefreshToken,
) -> anyhow::Result<RefreshToken> {
    if !token.is_expired(Utc::now()) {
        return Ok(token);
    }

    tracing::info!(
        character_id = token.character_id,
        version = token.version,
        "Refreshing access token"
    );
    let refreshed = refresh(client, sso, &token).await?;
    store.upsert_refresh_token(&refreshed)?;
    Ok(refreshed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn legacy_token() -> RefreshToken {
        RefreshToken {
            character_id: 90000001,
            version: 1,
            scopes: vec!["publicData".into()],
            access_token: None,
            refresh_token: "old-refresh".into(),
            expires_on: None,
        }
    }

    #[test]
    fn test_apply_refresh_upgrades_version() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let resp: TokenResponse = serde_json::from_str(
            r#"{"access_token":"jwt","expires_in":1199,"token_type":"Bearer","refresh_token":"new-refresh"}"#,
        )
        .unwrap();

        let refreshed = apply_refresh(&legacy_token(), resp, now);
        assert_eq!(refreshed.version, CURRENT_TOKEN_VERSION);
        assert_eq!(refreshed.access_token.as_deref(), Some("jwt"));
        assert_eq!(refreshed.refresh_token, "new-refresh");
        assert_eq!(refreshed.expires_on, Some(now + Duration::seconds(1199)));
        assert_eq!(refreshed.scopes, vec!["publicData".to_string()]);
    }

    #[test]
    fn test_apply_refresh_keeps_refresh_token_when_not_rotated() {
        let resp = TokenResponse {
            access_token: "jwt".into(),
            expires_in: 60,
            refresh_token: None,
        };
        let refreshed = apply_refresh(&legacy_token(), resp, Utc::now());
        assert_eq!(refreshed.refresh_token, "old-refresh");
    }

    #[tokio::test]
    async fn test_refresh_requires_client_credentials() {
        let err = refresh(&Client::new(), &SsoConfig::default(), &legacy_token())
            .await
            .unwrap_err();
        assert!(matches!(err, EveApiError::Config(_)));
    }
}
