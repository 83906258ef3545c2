// src/esi/mod.rs — ESI client
//
// Builds versioned endpoint URLs, attaches the character's bearer token,
// honours Expires/ETag caching and retries transient failures.

pub mod cache;
pub mod job;
pub mod retry;
pub mod sso;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, ETAG, EXPIRES, IF_NONE_MATCH};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::db::models::RefreshToken;
use crate::infra::config::Config;
use crate::infra::errors::EveApiError;
use cache::{CacheEntry, EsiCache};
use retry::RetryConfig;

const ERROR_LIMIT_RESET: &str = "x-esi-error-limit-reset";

/// A request against a single ESI route.
#[derive(Debug, Clone)]
pub struct EsiRequest {
    pub method: Method,
    pub version: &'static str,
    /// Route template such as `/corporations/{corporation_id}/divisions/`.
    pub endpoint: &'static str,
    pub path_values: Vec<(&'static str, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl EsiRequest {
    pub fn new(method: Method, version: &'static str, endpoint: &'static str) -> Self {
        Self {
            method,
            version,
            endpoint,
            path_values: Vec::new(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn path_value(mut self, name: &'static str, value: impl ToString) -> Self {
        self.path_values.push((name, value.to_string()));
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// `/{version}{endpoint}` with every `{placeholder}` substituted.
    pub fn path(&self) -> Result<String, EveApiError> {
        let mut path = format!("/{}{}", self.version, self.endpoint);
        for (name, value) in &self.path_values {
            path = path.replace(&format!("{{{name}}}"), value);
        }
        if let Some(start) = path.find('{') {
            let rest = &path[start..];
            let end = rest.find('}').map(|i| i + 1).unwrap_or(rest.len());
            return Err(EveApiError::Config(format!(
                "no value for path placeholder {} in {}",
                &rest[..end],
                self.endpoint
            )));
        }
        Ok(path)
    }
}

/// A successful (or cache-served) ESI response.
#[derive(Debug, Clone)]
pub struct EsiResponse {
    pub status: u16,
    pub body: String,
    pub expires: Option<DateTime<Utc>>,
    /// True when the body came from the local cache, either because it had
    /// not expired yet or because ESI answered 304 Not Modified.
    pub cached_load: bool,
}

impl EsiResponse {
    pub fn is_cached_load(&self) -> bool {
        self.cached_load
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, EveApiError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

pub struct EsiClient {
    client: Client,
    base_url: String,
    datasource: String,
    cache: Option<EsiCache>,
    retry: RetryConfig,
}

impl EsiClient {
    pub fn new(config: &Config, cache: Option<EsiCache>) -> Result<Self, EveApiError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.esi.timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.esi.base_url.trim_end_matches('/').to_string(),
            datasource: config.esi.datasource.clone(),
            cache,
            retry: RetryConfig::with_max_retries(config.esi.max_retries),
        })
    }

    /// The underlying HTTP client (shared with the SSO token refresh).
    pub fn http(&self) -> &Client {
        &self.client
    }

    pub fn url_for(&self, request: &EsiRequest) -> Result<Url, EveApiError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, request.path()?))
            .map_err(|e| EveApiError::Config(format!("invalid ESI url: {e}")))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("datasource", &self.datasource);
            for (k, v) in &request.query {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// Perform a request, retrying transient failures.
    pub async fn retrieve(
        &self,
        request: &EsiRequest,
        token: Option<&RefreshToken>,
    ) -> Result<EsiResponse, EveApiError> {
        let mut attempt = 0;
        loop {
            match self.retrieve_once(request, token).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if !retry::should_retry(&e) || attempt >= self.retry.max_retries {
                        return Err(e);
                    }

                    let delay = self
                        .retry
                        .delay_for_attempt(attempt, retry::server_delay(&e));
                    tracing::warn!(
                        endpoint = request.endpoint,
                        attempt = attempt + 1,
                        max_retries = self.retry.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying after error: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn retrieve_once(
        &self,
        request: &EsiRequest,
        token: Option<&RefreshToken>,
    ) -> Result<EsiResponse, EveApiError> {
        let url = self.url_for(request)?;
        let cacheable = request.method == Method::GET;
        let cache_key = EsiCache::key_for(
            request.method.as_str(),
            url.as_str(),
            token.map(|t| t.character_id),
        );
        let cached = match (&self.cache, cacheable) {
            (Some(cache), true) => cache.load(&cache_key),
            _ => None,
        };

        if let Some(entry) = &cached {
            if entry.is_fresh(Utc::now()) {
                tracing::debug!(method = %request.method, url = %url, cached = true, "ESI request");
                return Ok(EsiResponse {
                    status: 200,
                    body: entry.body.clone(),
                    expires: entry.expires,
                    cached_load: true,
                });
            }
        }

        let mut builder = self.client.request(request.method.clone(), url.clone());
        if let Some(access_token) = token.and_then(|t| t.access_token.as_deref()) {
            builder = builder.bearer_auth(access_token);
        }
        if let Some(etag) = cached.as_ref().and_then(|e| e.etag.as_deref()) {
            builder = builder.header(IF_NONE_MATCH, etag);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                EveApiError::Esi {
                    status: 504,
                    message: format!("request timed out: {e}"),
                    retriable: true,
                }
            } else {
                EveApiError::Http(e)
            }
        })?;
        let status = resp.status();
        let headers = resp.headers().clone();

        tracing::debug!(
            method = %request.method,
            url = %url,
            status = status.as_u16(),
            cached = status == StatusCode::NOT_MODIFIED,
            "ESI request"
        );

        if status == StatusCode::NOT_MODIFIED {
            if let (Some(cache), Some(mut entry)) = (&self.cache, cached) {
                entry.expires = expires_header(&headers).or(entry.expires);
                cache.save(&cache_key, &entry);
                return Ok(EsiResponse {
                    status: status.as_u16(),
                    body: entry.body,
                    expires: entry.expires,
                    cached_load: true,
                });
            }
            return Err(EveApiError::Esi {
                status: 304,
                message: "not modified, but nothing cached".into(),
                retriable: false,
            });
        }

        let body = resp.text().await?;

        if !status.is_success() {
            return Err(classify_error(status.as_u16(), &headers, &body));
        }

        let expires = expires_header(&headers);
        if let (Some(cache), true) = (&self.cache, cacheable) {
            cache.save(
                &cache_key,
                &CacheEntry {
                    etag: headers
                        .get(ETAG)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string),
                    expires,
                    body: body.clone(),
                },
            );
        }

        Ok(EsiResponse {
            status: status.as_u16(),
            body,
            expires,
            cached_load: false,
        })
    }
}

/// Map a non-success response onto an error.
pub fn classify_error(status: u16, headers: &HeaderMap, body: &str) -> EveApiError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect());

    if status == 420 {
        let retry_after_secs = headers
            .get(ERROR_LIMIT_RESET)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(60);
        return EveApiError::ErrorLimited { retry_after_secs };
    }

    EveApiError::Esi {
        status,
        message,
        retriable: status >= 500,
    }
}

fn expires_header(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    headers
        .get(EXPIRES)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
        .map(|d| d.with_timezone(&Utc))
}
