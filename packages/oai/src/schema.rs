//! OAI-PMH verbs and their argument rules.
//!
//! The [`ArgumentSchema`] is built once at startup and shared read-only by
//! the request validator. It is the only place where the legal arguments
//! of a verb are declared.

use std::collections::HashMap;

use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::SchemaError;

/// Argument names recognized on the wire (case-sensitive).
pub const VERB: &str = "verb";
pub const IDENTIFIER: &str = "identifier";
pub const METADATA_PREFIX: &str = "metadataPrefix";
pub const FROM: &str = "from";
pub const UNTIL: &str = "until";
pub const SET: &str = "set";
pub const RESUMPTION_TOKEN: &str = "resumptionToken";

/// The six OAI-PMH 2.0 verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(AsRefStr, Display, EnumIter, EnumString)]
pub enum OaiVerb {
    GetRecord,
    Identify,
    ListIdentifiers,
    ListMetadataFormats,
    ListRecords,
    ListSets,
}

impl OaiVerb {
    /// Whether this verb pages through the record set with resumption tokens.
    #[must_use]
    pub fn is_list_harvest(&self) -> bool {
        matches!(self, Self::ListIdentifiers | Self::ListRecords)
    }

    /// Comma separated list of all verbs, for error messages.
    #[must_use]
    pub fn all_names() -> String {
        Self::iter()
            .map(|v| v.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// How an argument participates in a verb's request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ArgumentRule {
    Required,
    Optional,
    /// Must be the only argument besides `verb` when present.
    Exclusive,
}

/// Argument rules of a single verb, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerbArguments {
    rules: Vec<(&'static str, ArgumentRule)>,
}

impl VerbArguments {
    fn new(rules: &[(&'static str, ArgumentRule)]) -> Self {
        Self {
            rules: rules.to_vec(),
        }
    }

    /// Rule for an argument, or `None` when the verb does not accept it.
    #[must_use]
    pub fn rule(&self, name: &str) -> Option<ArgumentRule> {
        self.rules
            .iter()
            .find(|(arg, _)| *arg == name)
            .map(|(_, rule)| *rule)
    }

    #[must_use]
    pub fn accepts(&self, name: &str) -> bool {
        self.rule(name).is_some()
    }

    /// The exclusive argument of this verb, if any.
    #[must_use]
    pub fn exclusive(&self) -> Option<&'static str> {
        self.rules
            .iter()
            .find(|(_, rule)| *rule == ArgumentRule::Exclusive)
            .map(|(arg, _)| *arg)
    }

    /// Required arguments, in declaration order.
    pub fn required(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules
            .iter()
            .filter(|(_, rule)| *rule == ArgumentRule::Required)
            .map(|(arg, _)| *arg)
    }

    /// All declared arguments with their rules.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, ArgumentRule)> + '_ {
        self.rules.iter().copied()
    }

    fn exclusive_count(&self) -> usize {
        self.rules
            .iter()
            .filter(|(_, rule)| *rule == ArgumentRule::Exclusive)
            .count()
    }
}

/// Immutable mapping `verb -> {argument -> rule}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentSchema {
    rows: HashMap<OaiVerb, VerbArguments>,
}

impl ArgumentSchema {
    /// The argument table of OAI-PMH 2.0 section 4.
    #[must_use]
    pub fn standard() -> Self {
        use ArgumentRule::{Exclusive, Optional, Required};

        let rows = [
            (
                OaiVerb::GetRecord,
                VerbArguments::new(&[(IDENTIFIER, Required), (METADATA_PREFIX, Required)]),
            ),
            (OaiVerb::Identify, VerbArguments::new(&[])),
            (
                OaiVerb::ListIdentifiers,
                VerbArguments::new(&[
                    (FROM, Optional),
                    (UNTIL, Optional),
                    (METADATA_PREFIX, Required),
                    (SET, Optional),
                    (RESUMPTION_TOKEN, Exclusive),
                ]),
            ),
            (
                OaiVerb::ListMetadataFormats,
                VerbArguments::new(&[(IDENTIFIER, Optional)]),
            ),
            (
                OaiVerb::ListRecords,
                VerbArguments::new(&[
                    (FROM, Optional),
                    (UNTIL, Optional),
                    (SET, Optional),
                    (METADATA_PREFIX, Required),
                    (RESUMPTION_TOKEN, Exclusive),
                ]),
            ),
            (
                OaiVerb::ListSets,
                VerbArguments::new(&[(RESUMPTION_TOKEN, Exclusive)]),
            ),
        ];

        Self {
            rows: rows.into_iter().collect(),
        }
    }

    /// Build a schema from explicit rows, checking that no verb is declared
    /// twice and that each verb has at most one exclusive argument.
    pub fn from_rows<I>(rows: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = (OaiVerb, Vec<(&'static str, ArgumentRule)>)>,
    {
        let mut map = HashMap::new();
        for (verb, rules) in rows {
            let arguments = VerbArguments::new(&rules);
            if arguments.exclusive_count() > 1 {
                let names: Vec<&str> = arguments
                    .iter()
                    .filter(|(_, r)| *r == ArgumentRule::Exclusive)
                    .map(|(a, _)| a)
                    .collect();
                return Err(SchemaError::MultipleExclusive {
                    verb: verb.to_string(),
                    arguments: names.join(", "),
                });
            }
            if map.insert(verb, arguments).is_some() {
                return Err(SchemaError::DuplicateVerb(verb.to_string()));
            }
        }
        Ok(Self { rows: map })
    }

    /// Argument rules of a verb, `None` when the verb has no row.
    #[must_use]
    pub fn arguments(&self, verb: OaiVerb) -> Option<&VerbArguments> {
        self.rows.get(&verb)
    }
}

impl Default for ArgumentSchema {
    fn default() -> Self {
        Self::standard()
    }
}
