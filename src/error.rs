//! Errors raised by the crate's own tasks.
//!
//! Task failures are typed by the caller; nothing in the combinators wraps
//! or converts them. The types here belong to the few constructors that
//! produce failures themselves.

use std::error::Error;
use std::fmt;

/// An environment variable read by [`Task::read_var`](crate::task::Task::read_var)
/// was unset or not valid unicode.
///
/// # Examples
///
/// ```rust
/// use taskarian::error::MissingEnvironmentVar;
///
/// let error = MissingEnvironmentVar::new("DATABASE_URL");
/// assert_eq!(error.to_string(), "environment variable `DATABASE_URL` is not set");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingEnvironmentVar {
    /// Name of the variable.
    pub key: String,
}

impl MissingEnvironmentVar {
    /// Creates the error for `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl fmt::Display for MissingEnvironmentVar {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "environment variable `{}` is not set", self.key)
    }
}

impl Error for MissingEnvironmentVar {}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("HOME", "environment variable `HOME` is not set")]
    #[case("", "environment variable `` is not set")]
    fn display_names_the_variable(#[case] key: &str, #[case] expected: &str) {
        assert_eq!(MissingEnvironmentVar::new(key).to_string(), expected);
    }

    #[rstest]
    fn is_a_std_error() {
        let error: Box<dyn Error> = Box::new(MissingEnvironmentVar::new("X"));
        assert!(error.source().is_none());
    }
}
