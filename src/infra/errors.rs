// src/infra/errors.rs — Error types for eveapi

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EveApiError {
    // Credential errors (not retriable)
    #[error("API key pair is missing a key id or verification code")]
    MissingKeyPair,

    #[error("Invalid API key pair: {reason}")]
    InvalidKeyPair { reason: String },

    #[error("Invalid XML API scope '{0}'")]
    InvalidScope(String),

    #[error("Token is missing scope '{scope}'")]
    MissingScope { scope: String },

    #[error("Character holds none of the roles: {}", roles.join(", "))]
    MissingRole { roles: Vec<String> },

    #[error("Token refresh failed: {0}")]
    TokenRefresh(String),

    // Remote API errors
    #[error("XML API error {code}: {message}")]
    XmlApi { code: u32, message: String },

    #[error("ESI returned {status}: {message}")]
    Esi {
        status: u16,
        message: String,
        retriable: bool,
    },

    #[error("ESI error limit reached, retry after {retry_after_secs}s")]
    ErrorLimited { retry_after_secs: u64 },

    // Infra
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EveApiError {
    pub fn is_retriable(&self) -> bool {
        match self {
            EveApiError::Esi { retriable, .. } => *retriable,
            EveApiError::ErrorLimited { .. } => true,
            EveApiError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
