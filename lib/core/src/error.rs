//! Shared `Result` alias.
//!
//! Fallible operations across the workspace return a `rootcause::Report`
//! wrapping a crate-specific error enum, e.g. `Result<UserProfile, FlowError>`.
//! Callers match on the enum through `Report::current_context`.

use rootcause::Report;

/// A `Result` whose error is a `Report` over context `C`.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug, PartialEq)]
    struct Missing;

    impl fmt::Display for Missing {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("missing")
        }
    }

    impl std::error::Error for Missing {}

    fn lookup(found: bool) -> Result<&'static str, Missing> {
        if found { Ok("google") } else { Err(Missing.into()) }
    }

    #[test]
    fn context_is_recoverable() {
        assert_eq!(lookup(true).expect("found"), "google");
        let err = lookup(false).unwrap_err();
        assert_eq!(err.current_context(), &Missing);
    }
}
