//! Region keys (postal / PIN codes) that scope prices and availability.

use std::fmt;

use serde::{Deserialize, Serialize};

const MIN_LEN: usize = 3;
const MAX_LEN: usize = 10;

/// Region key validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegionError {
    #[error("Region key '{0}' must be 3-10 characters long")]
    InvalidLength(String),
    #[error("Region key '{0}' may only hold letters and digits split by single spaces or hyphens")]
    InvalidCharacters(String),
}

/// A validated locality identifier, e.g. the Indian PIN code `560087`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegionKey(String);

impl RegionKey {
    /// Validate and normalize a raw region key.
    ///
    /// Accepted: 3-10 characters of ASCII letters and digits, optionally split
    /// by single inner spaces or hyphens (`"560087"`, `"SW1A 1AA"`, `"10115"`).
    pub fn parse(raw: &str) -> Result<Self, RegionError> {
        let key = raw.trim();
        let invalid = || RegionError::InvalidCharacters(raw.to_string());

        let len = key.chars().count();
        if !(MIN_LEN..=MAX_LEN).contains(&len) {
            return Err(RegionError::InvalidLength(raw.to_string()));
        }

        let mut previous_separator = true;
        for ch in key.chars() {
            if ch.is_ascii_alphanumeric() {
                previous_separator = false;
            } else if (ch == ' ' || ch == '-') && !previous_separator {
                previous_separator = true;
            } else {
                return Err(invalid());
            }
        }
        if previous_separator {
            return Err(invalid());
        }

        Ok(Self(key.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RegionKey {
    type Error = RegionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RegionKey> for String {
    fn from(key: RegionKey) -> Self {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_pin_and_postal_codes() {
        assert_eq!(RegionKey::parse("560087").unwrap().as_str(), "560087");
        assert_eq!(RegionKey::parse("  560034 ").unwrap().as_str(), "560034");
        assert_eq!(RegionKey::parse("sw1a 1aa").unwrap().as_str(), "SW1A 1AA");
        assert_eq!(RegionKey::parse("10115").unwrap().as_str(), "10115");
    }

    #[test]
    fn rejects_malformed_keys() {
        for raw in ["", "12", "56008712345"] {
            assert_eq!(RegionKey::parse(raw), Err(RegionError::InvalidLength(raw.to_string())));
        }
        for raw in ["5600;87", "560 -87", "-56008", "56008-", "५६००८७"] {
            assert_eq!(
                RegionKey::parse(raw),
                Err(RegionError::InvalidCharacters(raw.to_string())),
                "expected {raw:?} to be rejected"
            );
        }
    }

    #[test]
    fn deserializes_through_validation() {
        let key: RegionKey = serde_json::from_str("\"560034\"").unwrap();
        assert_eq!(key.as_str(), "560034");
        assert!(serde_json::from_str::<RegionKey>("\"!!\"").is_err());
    }
}
