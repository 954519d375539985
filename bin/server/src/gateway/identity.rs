//! The authenticated email kept in the browser session.

use tower_sessions::{Session, session};

/// Session key holding the authenticated user's email.
///
/// Provider blobs are stored under their provider name; the `.` keeps this
/// key outside the set of valid provider names.
pub const EMAIL_KEY: &str = "gatehouse.email";

/// Stores the authenticated email.
pub async fn remember_email(session: &Session, email: &str) -> Result<(), session::Error> {
    session.insert(EMAIL_KEY, email).await
}

/// Returns the authenticated email, if any.
pub async fn current_email(session: &Session) -> Result<Option<String>, session::Error> {
    session.get(EMAIL_KEY).await
}

/// Forgets the authenticated email.
pub async fn forget_email(session: &Session) -> Result<(), session::Error> {
    session.remove_value(EMAIL_KEY).await.map(|_| ())
}
