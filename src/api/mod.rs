// src/api/mod.rs — XML API client
//
// Every update against the legacy XML API goes through `XmlClient`: it
// carries the identifying User-Agent, the request timeout and the
// hashed-name response cache, and validates key pairs and scopes before
// anything is sent.

pub mod account;
pub mod cache;
pub mod corporation;
pub mod validation;
pub mod xml;

use chrono::Utc;
use reqwest::Client;

use crate::db::models::ApiKey;
use crate::infra::config::Config;
use crate::infra::errors::EveApiError;
use cache::XmlCache;
pub use validation::{validate_key_pair, validate_scope, Scope};
pub use xml::XmlResult;

/// A validated key id / verification code pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    key_id: i64,
    v_code: String,
}

impl KeyPair {
    pub fn new(key_id: i64, v_code: impl Into<String>) -> Result<Self, EveApiError> {
        let v_code = v_code.into();
        validate_key_pair(key_id, &v_code)?;
        Ok(Self { key_id, v_code })
    }

    pub fn key_id(&self) -> i64 {
        self.key_id
    }

    pub fn v_code(&self) -> &str {
        &self.v_code
    }
}

impl TryFrom<&ApiKey> for KeyPair {
    type Error = EveApiError;

    fn try_from(key: &ApiKey) -> Result<Self, Self::Error> {
        KeyPair::new(key.key_id, key.v_code.clone())
    }
}

pub struct XmlClient {
    client: Client,
    base_url: String,
    cache: Option<XmlCache>,
}

impl XmlClient {
    pub fn new(config: &Config, cache: Option<XmlCache>) -> Result<Self, EveApiError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.xml.timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.xml.base_url.trim_end_matches('/').to_string(),
            cache,
        })
    }

    pub fn endpoint_url(&self, scope: Scope, name: &str) -> String {
        format!("{}/{}/{}.xml.aspx", self.base_url, scope, name)
    }

    /// Call `{scope}/{name}` with optional credentials and extra arguments.
    pub async fn call(
        &self,
        key: Option<&KeyPair>,
        scope: Scope,
        name: &str,
        args: &[(&str, String)],
    ) -> Result<XmlResult, EveApiError> {
        let cache_key = XmlCache::key_for(
            key.map(KeyPair::key_id),
            key.map(KeyPair::v_code),
            scope.as_str(),
            name,
            args,
        );

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.load(&cache_key, Utc::now()) {
                tracing::debug!(scope = %scope, name, "XML API served from cache");
                return Ok(hit);
            }
        }

        let mut form: Vec<(&str, String)> = Vec::with_capacity(args.len() + 2);
        if let Some(key) = key {
            form.push(("keyID", key.key_id.to_string()));
            form.push(("vCode", key.v_code.clone()));
        }
        form.extend(args.iter().cloned());

        let url = self.endpoint_url(scope, name);
        let resp = self.client.post(&url).form(&form).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        tracing::debug!(
            method = "POST",
            url = %url,
            status = status.as_u16(),
            "XML API request"
        );

        // Error documents are returned with non-2xx codes too, so parse first.
        let result = match XmlResult::parse(&body) {
            Ok(result) => result,
            Err(e @ EveApiError::XmlApi { .. }) => return Err(e),
            Err(e) if status.is_success() => return Err(e),
            Err(_) => {
                return Err(EveApiError::XmlApi {
                    code: u32::from(status.as_u16()),
                    message: format!("HTTP {status}"),
                })
            }
        };

        if let Some(cache) = &self.cache {
            cache.save(&cache_key, &body);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_pair_validates() {
        let ok = KeyPair::new(4431, "x".repeat(64)).unwrap();
        assert_eq!(ok.key_id(), 4431);
        assert!(KeyPair::new(0, "x".repeat(64)).is_err());
        assert!(KeyPair::new(4431, "x").is_err());
    }

    #[test]
    fn test_key_pair_from_row() {
        let row = ApiKey {
            key_id: 12,
            v_code: "A".repeat(64),
            enabled: true,
            last_error: None,
        };
        let pair = KeyPair::try_from(&row).unwrap();
        assert_eq!(pair.v_code(), row.v_code);
    }

    #[test]
    fn test_endpoint_url() {
        let mut config = Config::default();
        config.xml.base_url = "https://api.example.com/".into();
        let client = XmlClient::new(&config, None).unwrap();
        assert_eq!(
            client.endpoint_url(Scope::Corp, "IndustryJobs"),
            "https://api.example.com/corp/IndustryJobs.xml.aspx"
        );
    }
}
