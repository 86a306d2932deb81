//! The raw argument mapping of one OAI-PMH request.

use std::collections::BTreeMap;

use crate::error::{OaiError, Result};
use crate::schema::VERB;

/// Arguments of a single request: `verb` plus zero or more named values.
///
/// Keys are unique and case-sensitive. A request is built once from the
/// merged query string and form body and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OaiRequest {
    args: BTreeMap<String, String>,
}

impl OaiRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a request from key/value pairs.
    ///
    /// A repeated key is illegal in OAI-PMH: a repeated `verb` is a
    /// `badVerb`, any other repeated argument a `badArgument`.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut args = BTreeMap::new();
        for (key, value) in pairs {
            let key = key.into();
            if args.contains_key(&key) {
                return Err(if key == VERB {
                    OaiError::BadVerb("The verb argument is repeated".to_string())
                } else {
                    OaiError::BadArgument(format!("repeated argument: {key}"))
                });
            }
            args.insert(key, value.into());
        }
        Ok(Self { args })
    }

    /// Builder used by tests and internal callers; a later value for the
    /// same key replaces the earlier one.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.args.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.args.contains_key(name)
    }

    #[must_use]
    pub fn verb(&self) -> Option<&str> {
        self.get(VERB)
    }

    /// No arguments at all, not even `verb`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Arguments other than `verb`, in key order.
    pub fn arguments(&self) -> impl Iterator<Item = (&str, &str)> {
        self.args
            .iter()
            .filter(|(key, _)| key.as_str() != VERB)
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Number of arguments other than `verb`.
    #[must_use]
    pub fn argument_count(&self) -> usize {
        self.arguments().count()
    }
}
