//! Wrapper for values declared sensitive in a schema

use serde::{Deserialize, Serialize};
use std::fmt;

const REDACTED: &str = "(sensitive value)";

/// Holds a secret taken from configuration or state.
///
/// `Debug` and `Display` never print the inner value, so a model holding a
/// `Sensitive` field can be logged as a whole. Serde is transparent: state
/// round-trips the real value, which Terraform itself masks in plans.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sensitive<T>(T);

impl<T> Sensitive<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Borrows the secret. Keep the result out of log statements.
    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl Sensitive<String> {
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl<T> From<T> for Sensitive<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

impl From<&str> for Sensitive<String> {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl<T> fmt::Debug for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl<T> fmt::Display for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensitive_value_is_redacted_in_formatting() {
        let secret = Sensitive::new("hunter2".to_string());
        assert_eq!(format!("{}", secret), REDACTED);
        assert!(!format!("{:?}", secret).contains("hunter2"));

        #[derive(Debug)]
        #[allow(dead_code)]
        struct Holder {
            password: Sensitive<String>,
        }
        let holder = Holder { password: secret };
        assert!(!format!("{:?}", holder).contains("hunter2"));
    }

    #[test]
    fn sensitive_value_serializes_transparently() {
        let secret: Sensitive<String> = serde_json::from_str(r#""abc""#).unwrap();
        assert_eq!(secret.expose(), "abc");
        assert_eq!(serde_json::to_string(&secret).unwrap(), r#""abc""#);
    }

    #[test]
    fn blank_secret_is_empty() {
        assert!(Sensitive::from("  ").is_empty());
        assert!(!Sensitive::from("x").is_empty());
    }
}
