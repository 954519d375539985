//! Email to access level lookup.

use tracing::debug;

use crate::level::AccessLevel;
use crate::user::UserRecord;

/// Read-only allow-list consulted on every guarded request.
///
/// Built once at startup and shared behind an `Arc`; it has no interior
/// mutability, so concurrent lookups need no synchronization.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    users: Vec<UserRecord>,
}

impl AccessPolicy {
    /// Creates a policy over the given allow-list, preserving its order.
    #[must_use]
    pub fn new(users: Vec<UserRecord>) -> Self {
        Self { users }
    }

    /// Returns the allow-list entries.
    #[must_use]
    pub fn users(&self) -> &[UserRecord] {
        &self.users
    }

    /// Returns the access level granted to `email`.
    ///
    /// Scans the list in order and returns the level of the first exact
    /// match. An empty email or an email with no entry yields `None`.
    #[must_use]
    pub fn level_for(&self, email: &str) -> AccessLevel {
        if email.is_empty() {
            return AccessLevel::None;
        }

        match self.users.iter().find(|user| user.email() == email) {
            Some(user) => user.access(),
            None => {
                debug!(email, "email not in allow-list");
                AccessLevel::None
            }
        }
    }

    /// Returns true if `level` is one of the `allowed` levels.
    ///
    /// Membership is exact; `Admin` does not satisfy a check for `None`.
    #[must_use]
    pub fn permits(&self, level: AccessLevel, allowed: &[AccessLevel]) -> bool {
        allowed.contains(&level)
    }

    /// Resolves `email` and checks the resulting level against `allowed`.
    ///
    /// A missing email is treated as `AccessLevel::None`.
    #[must_use]
    pub fn check(&self, email: Option<&str>, allowed: &[AccessLevel]) -> bool {
        let level = email.map_or(AccessLevel::None, |email| self.level_for(email));
        self.permits(level, allowed)
    }
}
