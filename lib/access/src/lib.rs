//! Access policy for gatehouse.
//!
//! This crate provides:
//! - Access levels (`AccessLevel`)
//! - Static allow-list entries (`UserRecord`)
//! - The email to access level lookup (`AccessPolicy`)
//!
//! # Access Control Model
//!
//! Access is granted by exact email match against a list loaded once from
//! configuration. Levels are not ordered: a check for `Admin` is satisfied
//! only by `Admin`, and a check for `None` only by `None`.
//!
//! # Example
//!
//! ```
//! use gatehouse_access::{AccessLevel, AccessPolicy, UserRecord};
//!
//! let policy = AccessPolicy::new(vec![UserRecord::new(
//!     "alice@example.com",
//!     AccessLevel::Admin,
//! )]);
//!
//! assert_eq!(policy.level_for("alice@example.com"), AccessLevel::Admin);
//! assert_eq!(policy.level_for("mallory@example.com"), AccessLevel::None);
//! assert!(policy.permits(AccessLevel::Admin, &[AccessLevel::Admin]));
//! ```

pub mod level;
pub mod policy;
pub mod user;

pub use level::AccessLevel;
pub use policy::AccessPolicy;
pub use user::UserRecord;
