//! Strongly-typed name for OAuth providers.
//!
//! Provider names appear in route paths (`/{provider}/login`) and as keys in
//! the session store, so they are restricted to a URL- and key-safe alphabet.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when parsing a provider name from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseProviderNameError {
    /// The rejected input.
    pub input: String,
    /// The reason for the parse failure.
    pub reason: &'static str,
}

impl fmt::Display for ParseProviderNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid provider name '{}': {}", self.input, self.reason)
    }
}

impl std::error::Error for ParseProviderNameError {}

/// Name of a registered OAuth provider, e.g. `google`.
///
/// Names are non-empty and consist of ASCII letters, digits, `-` and `_`.
/// Comparison is exact: `Google` and `google` are different providers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProviderName(String);

impl ProviderName {
    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The built-in Google provider.
    #[must_use]
    pub fn google() -> Self {
        Self("google".to_string())
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ProviderName {
    type Err = ParseProviderNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseProviderNameError {
                input: s.to_string(),
                reason: "name is empty",
            });
        }

        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ParseProviderNameError {
                input: s.to_string(),
                reason: "only ASCII letters, digits, '-' and '_' are allowed",
            });
        }

        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for ProviderName {
    type Error = ParseProviderNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProviderName> for String {
    fn from(name: ProviderName) -> Self {
        name.0
    }
}

impl AsRef<str> for ProviderName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_names() {
        let name: ProviderName = "google".parse().expect("should parse");
        assert_eq!(name.as_str(), "google");
        assert_eq!(name.to_string(), "google");

        let name: ProviderName = "azure-ad_v2".parse().expect("should parse");
        assert_eq!(name.as_str(), "azure-ad_v2");
    }

    #[test]
    fn google_is_a_valid_name() {
        assert_eq!(ProviderName::google(), "google".parse().unwrap());
    }

    #[test]
    fn rejects_empty_name() {
        let err = "".parse::<ProviderName>().unwrap_err();
        assert_eq!(err.reason, "name is empty");
    }

    #[test]
    fn rejects_path_separators() {
        assert!("goo/gle".parse::<ProviderName>().is_err());
        assert!("google callback".parse::<ProviderName>().is_err());
        assert!("../google".parse::<ProviderName>().is_err());
    }

    #[test]
    fn comparison_is_case_sensitive() {
        let lower: ProviderName = "google".parse().unwrap();
        let upper: ProviderName = "Google".parse().unwrap();
        assert_ne!(lower, upper);
    }

    #[test]
    fn deserialize_validates() {
        let name: ProviderName = serde_json::from_str("\"google\"").expect("deserialize");
        assert_eq!(name.as_str(), "google");

        let result: Result<ProviderName, _> = serde_json::from_str("\"bad name\"");
        assert!(result.is_err());
    }
}
