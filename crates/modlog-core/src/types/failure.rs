//! Structured failure payload for fatal events

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Failure code: either a number or a symbolic name
///
/// Serialized untagged, so `42` and `"E_TIMEOUT"` are both valid in config
/// and JSON payloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FailureCode {
    Numeric(i64),
    Symbolic(String),
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCode::Numeric(n) => write!(f, "{}", n),
            FailureCode::Symbolic(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for FailureCode {
    fn from(code: i64) -> Self {
        FailureCode::Numeric(code)
    }
}

impl From<i32> for FailureCode {
    fn from(code: i32) -> Self {
        FailureCode::Numeric(code.into())
    }
}

impl From<&str> for FailureCode {
    fn from(code: &str) -> Self {
        FailureCode::Symbolic(code.to_string())
    }
}

impl From<String> for FailureCode {
    fn from(code: String) -> Self {
        FailureCode::Symbolic(code)
    }
}

/// An unrecoverable condition, described as data
///
/// A `Failure` is what gets handed to `LogHandler::fatal`. It carries a
/// domain (the subsystem that failed), a code and a human-readable
/// description, plus optional ordered details and an underlying cause.
/// Once built it is never mutated; the dispatcher passes the same value to
/// every handler by reference.
///
/// # Example
///
/// ```
/// use modlog_core::types::Failure;
///
/// let failure = Failure::new("camera", 42, "sensor disconnected")
///     .with_detail("device", "front");
///
/// assert_eq!(failure.to_string(), "camera (42): sensor disconnected");
/// assert_eq!(failure.detail("device"), Some("front"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    domain: String,
    code: FailureCode,
    description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    details: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    underlying: Option<Box<Failure>>,
}

impl Failure {
    /// Create a new failure
    pub fn new(
        domain: impl Into<String>,
        code: impl Into<FailureCode>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            code: code.into(),
            description: description.into(),
            details: BTreeMap::new(),
            underlying: None,
        }
    }

    /// Capture an error and its `source()` chain
    ///
    /// Each cause becomes a nested underlying failure sharing the same
    /// domain and code.
    pub fn from_error(
        domain: impl Into<String>,
        code: impl Into<FailureCode>,
        error: &(dyn StdError + 'static),
    ) -> Self {
        let domain = domain.into();
        let code = code.into();

        let mut descriptions = vec![error.to_string()];
        let mut source = error.source();
        while let Some(cause) = source {
            descriptions.push(cause.to_string());
            source = cause.source();
        }

        // Build innermost first
        descriptions
            .into_iter()
            .rev()
            .fold(None, |underlying: Option<Failure>, description| {
                let mut failure = Failure::new(domain.clone(), code.clone(), description);
                failure.underlying = underlying.map(Box::new);
                Some(failure)
            })
            .unwrap_or_else(|| Failure::new(domain, code, String::new()))
    }

    /// Attach a key/value detail
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Attach an underlying cause
    pub fn with_underlying(mut self, underlying: Failure) -> Self {
        self.underlying = Some(Box::new(underlying));
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn code(&self) -> &FailureCode {
        &self.code
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn details(&self) -> &BTreeMap<String, String> {
        &self.details
    }

    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details.get(key).map(String::as_str)
    }

    pub fn underlying(&self) -> Option<&Failure> {
        self.underlying.as_deref()
    }

    /// Iterate over the underlying causes, outermost first (excluding self)
    pub fn causes(&self) -> Causes<'_> {
        Causes {
            next: self.underlying(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.domain, self.code, self.description)
    }
}

impl StdError for Failure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.underlying
            .as_deref()
            .map(|failure| failure as &(dyn StdError + 'static))
    }
}

/// Iterator over a failure's underlying causes
#[derive(Debug, Clone)]
pub struct Causes<'a> {
    next: Option<&'a Failure>,
}

impl<'a> Iterator for Causes<'a> {
    type Item = &'a Failure;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.underlying();
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Outer(Inner);

    #[derive(Debug)]
    struct Inner;

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "outer failed")
        }
    }

    impl fmt::Display for Inner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "disk full")
        }
    }

    impl StdError for Outer {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    impl StdError for Inner {}

    #[test]
    fn test_failure_fields() {
        let failure = Failure::new("X", 42, "boom");
        assert_eq!(failure.domain(), "X");
        assert_eq!(failure.code(), &FailureCode::Numeric(42));
        assert_eq!(failure.description(), "boom");
        assert!(failure.details().is_empty());
        assert!(failure.underlying().is_none());
    }

    #[test]
    fn test_symbolic_code_display() {
        let failure = Failure::new("net", "E_TIMEOUT", "no response");
        assert_eq!(failure.to_string(), "net (E_TIMEOUT): no response");
    }

    #[test]
    fn test_from_error_chain() {
        let failure = Failure::from_error("storage", 7, &Outer(Inner));
        assert_eq!(failure.description(), "outer failed");

        let causes: Vec<_> = failure.causes().map(|f| f.description()).collect();
        assert_eq!(causes, vec!["disk full"]);

        let source = failure.source().unwrap();
        assert_eq!(source.to_string(), "storage (7): disk full");
    }

    #[test]
    fn test_json_shape() {
        let failure = Failure::new("X", 42, "boom").with_detail("module", "camera");
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["domain"], "X");
        assert_eq!(json["code"], 42);
        assert_eq!(json["details"]["module"], "camera");
        assert!(json.get("underlying").is_none());

        let symbolic: Failure =
            serde_json::from_str(r#"{"domain":"net","code":"E_TIMEOUT","description":"slow"}"#).unwrap();
        assert_eq!(symbolic.code(), &FailureCode::Symbolic("E_TIMEOUT".to_string()));
    }
}
