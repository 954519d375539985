//! Static allow-list entries.
//!
//! A `UserRecord` pairs an email with the access level it is granted.
//! Records are loaded once from configuration and never mutated.

use serde::{Deserialize, Serialize};

use crate::level::AccessLevel;

/// An allow-list entry.
///
/// Deserializes from `{ email, access }` where `access` is a level name.
/// A missing or unrecognized name yields `AccessLevel::None` rather than
/// failing the whole configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawUserRecord")]
pub struct UserRecord {
    email: String,
    access: AccessLevel,
}

#[derive(Deserialize)]
struct RawUserRecord {
    email: String,
    #[serde(default)]
    access: String,
}

impl From<RawUserRecord> for UserRecord {
    fn from(raw: RawUserRecord) -> Self {
        Self {
            email: raw.email,
            access: AccessLevel::from_name(&raw.access),
        }
    }
}

impl UserRecord {
    /// Creates a new allow-list entry.
    #[must_use]
    pub fn new(email: impl Into<String>, access: AccessLevel) -> Self {
        Self {
            email: email.into(),
            access,
        }
    }

    /// Returns the email address.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the granted access level.
    #[must_use]
    pub fn access(&self) -> AccessLevel {
        self.access
    }
}
