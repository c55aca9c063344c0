//! Named parameter validators.
//!
//! A validator is a plain predicate over one path segment. Register it on the
//! [`Router`](crate::Router) before any route that names it:
//!
//! ```rust
//! use switchyard::{Router, validator};
//!
//! let router = Router::new()
//!     .validator("number", validator::number)
//!     .validator("slug", |s: &str| s.bytes().all(|b| b.is_ascii_lowercase() || b == b'-'));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A shared, named segment predicate.
#[derive(Clone)]
pub struct Validator {
    name: Arc<str>,
    predicate: Arc<dyn Fn(&str) -> bool + Send + Sync>,
}

impl Validator {
    pub fn new<F>(name: impl Into<Arc<str>>, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self { name: name.into(), predicate: Arc::new(predicate) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn accepts(&self, segment: &str) -> bool {
        (self.predicate)(segment)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Validator").field(&self.name).finish()
    }
}

/// Validator registry, filled at setup time.
#[derive(Default)]
pub(crate) struct Validators {
    by_name: HashMap<String, Validator>,
}

impl Validators {
    /// Registers `predicate` under `name`, replacing an earlier registration.
    pub(crate) fn insert<F>(&mut self, name: &str, predicate: F)
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.by_name.insert(name.to_owned(), Validator::new(name, predicate));
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Validator> {
        self.by_name.get(name)
    }
}

// ── Common predicates ─────────────────────────────────────────────────────────

/// Non-empty and ASCII digits only.
pub fn number(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// Non-empty and ASCII letters only.
pub fn alpha(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_alphabetic())
}

/// Non-empty and ASCII letters or digits only.
pub fn alphanumeric(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_predicates() {
        assert!(number("123"));
        assert!(!number("12a"));
        assert!(!number(""));
        assert!(alpha("abc"));
        assert!(!alpha("ab1"));
        assert!(alphanumeric("ab1"));
        assert!(!alphanumeric("ab-1"));
    }

    #[test]
    fn registry_replaces_by_name() {
        let mut validators = Validators::default();
        validators.insert("v", |_| false);
        validators.insert("v", |_| true);
        let v = validators.get("v").unwrap();
        assert_eq!(v.name(), "v");
        assert!(v.accepts("anything"));
        assert!(validators.get("missing").is_none());
    }
}
