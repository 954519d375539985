//! Coarse access levels assigned to known email addresses.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Access level granted to an authenticated email.
///
/// `None` is the deny value: it is returned for unknown emails, empty
/// emails, and level names that are not recognized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    /// No access.
    #[default]
    None,
    /// Full administrative access.
    Admin,
}

impl AccessLevel {
    /// Resolves a human-readable level name as written in configuration.
    ///
    /// Only `admin` is recognized; any other name maps to `None`.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "admin" => Self::Admin,
            _ => Self::None,
        }
    }

    /// Returns the configuration name of this level.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
