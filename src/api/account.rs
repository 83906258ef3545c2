// src/api/account.rs — account/APIKeyInfo

use super::xml::{parse_eve_time, XmlResult};
use super::{KeyPair, Scope, XmlClient};
use crate::db::models::ApiKeyInfo;
use crate::db::Store;
use crate::infra::errors::EveApiError;

/// Fetch the key's type and access mask and persist them.
pub async fn update_key_info(
    client: &XmlClient,
    store: &Store,
    key: &KeyPair,
) -> anyhow::Result<ApiKeyInfo> {
    let result = client.call(Some(key), Scope::Account, "APIKeyInfo", &[]).await?;
    let info = key_info_from_result(key.key_id(), &result)?;
    store.upsert_api_key_info(&info)?;

    store.insert_job_log(
        &format!("key:{}", key.key_id()),
        "apikeyinfo",
        &format!("Key type {} with access mask {}", info.key_type, info.access_mask),
        false,
    )?;

    Ok(info)
}

/// Map an `APIKeyInfo` result into a row. Corporation keys carry the
/// owning corporation on their single character row.
pub fn key_info_from_result(key_id: i64, result: &XmlResult) -> Result<ApiKeyInfo, EveApiError> {
    let key = result
        .element("key")
        .ok_or_else(|| EveApiError::Other(anyhow::anyhow!("APIKeyInfo has no <key> element")))?;

    let access_mask = key
        .attr("accessMask")
        .and_then(|m| m.trim().parse().ok())
        .unwrap_or(0);
    let key_type = key.attr("type").unwrap_or("Account").to_string();
    let expires = key.attr("expires").and_then(parse_eve_time);

    let corporation_id = if key_type.eq_ignore_ascii_case("corporation") {
        result
            .rowset("characters")
            .first()
            .map(|row| row.i64("corporationID"))
            .transpose()?
    } else {
        None
    };

    Ok(ApiKeyInfo {
        key_id,
        access_mask,
        key_type,
        expires,
        corporation_id,
    })
}
