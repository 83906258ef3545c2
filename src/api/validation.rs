// src/api/validation.rs — Key pair and scope validation for the XML API

use std::fmt;
use std::str::FromStr;

use crate::infra::errors::EveApiError;

/// Verification codes are always 64 alphanumeric characters.
pub const V_CODE_LEN: usize = 64;

/// XML API scopes (the first path segment of every call).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Account,
    Char,
    Corp,
    Eve,
    Map,
    Server,
    Api,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Account => "account",
            Scope::Char => "char",
            Scope::Corp => "corp",
            Scope::Eve => "eve",
            Scope::Map => "map",
            Scope::Server => "server",
            Scope::Api => "api",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = EveApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate_scope(s)
    }
}

/// Check that `scope` names a known XML API scope.
pub fn validate_scope(scope: &str) -> Result<Scope, EveApiError> {
    match scope {
        "account" => Ok(Scope::Account),
        "char" => Ok(Scope::Char),
        "corp" => Ok(Scope::Corp),
        "eve" => Ok(Scope::Eve),
        "map" => Ok(Scope::Map),
        "server" => Ok(Scope::Server),
        "api" => Ok(Scope::Api),
        other => Err(EveApiError::InvalidScope(other.to_string())),
    }
}

/// Check a key id / verification code pair before it is used or stored.
pub fn validate_key_pair(key_id: i64, v_code: &str) -> Result<(), EveApiError> {
    if key_id == 0 || v_code.is_empty() {
        return Err(EveApiError::MissingKeyPair);
    }

    if key_id < 0 {
        return Err(EveApiError::InvalidKeyPair {
            reason: format!("key id {key_id} is not a positive number"),
        });
    }

    if v_code.len() != V_CODE_LEN {
        return Err(EveApiError::InvalidKeyPair {
            reason: format!(
                "verification code must be {V_CODE_LEN} characters, got {}",
                v_code.len()
            ),
        });
    }

    if !v_code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(EveApiError::InvalidKeyPair {
            reason: "verification code must be alphanumeric".into(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v_code() -> String {
        "a1B2".repeat(16)
    }

    #[test]
    fn test_valid_pair() {
        assert!(validate_key_pair(4431, &v_code()).is_ok());
    }

    #[test]
    fn test_missing_pair() {
        assert!(matches!(
            validate_key_pair(0, &v_code()),
            Err(EveApiError::MissingKeyPair)
        ));
        assert!(matches!(
            validate_key_pair(4431, ""),
            Err(EveApiError::MissingKeyPair)
        ));
    }

    #[test]
    fn test_invalid_pair() {
        assert!(matches!(
            validate_key_pair(-3, &v_code()),
            Err(EveApiError::InvalidKeyPair { .. })
        ));
        assert!(matches!(
            validate_key_pair(4431, "short"),
            Err(EveApiError::InvalidKeyPair { .. })
        ));
        let mut bad = v_code();
        bad.replace_range(0..1, "-");
        assert!(matches!(
            validate_key_pair(4431, &bad),
            Err(EveApiError::InvalidKeyPair { .. })
        ));
    }

    #[test]
    fn test_scopes() {
        assert_eq!(validate_scope("corp").unwrap(), Scope::Corp);
        assert_eq!("account".parse::<Scope>().unwrap(), Scope::Account);
        assert_eq!(Scope::Char.to_string(), "char");
        assert!(matches!(
            validate_scope("corporation"),
            Err(EveApiError::InvalidScope(s)) if s == "corporation"
        ));
    }
}
