//! Request validation against the argument schema.

use std::str::FromStr;
use std::sync::Arc;

use crate::error::{OaiError, Result};
use crate::request::OaiRequest;
use crate::schema::{ArgumentSchema, OaiVerb};

/// Checks a request's arguments against an injected [`ArgumentSchema`].
///
/// Validation is pure: no I/O, no state, the same request always yields
/// the same outcome.
#[derive(Debug, Clone)]
pub struct RequestValidator {
    schema: Arc<ArgumentSchema>,
}

impl RequestValidator {
    pub fn new(schema: Arc<ArgumentSchema>) -> Self {
        Self { schema }
    }

    #[must_use]
    pub fn schema(&self) -> &ArgumentSchema {
        &self.schema
    }

    /// Validate a request and return its verb.
    ///
    /// Checks, in order: the verb is present and known; every argument is
    /// declared for the verb; an exclusive argument stands alone (and then
    /// nothing else is checked); every required argument is present.
    pub fn validate(&self, request: &OaiRequest) -> Result<OaiVerb> {
        if request.is_empty() {
            return Err(OaiError::BadVerb(
                "You did not specify an OAI verb".to_string(),
            ));
        }

        let verb_name = request
            .verb()
            .ok_or_else(|| OaiError::BadVerb("The verb argument is missing".to_string()))?;

        let verb = OaiVerb::from_str(verb_name).map_err(|_| {
            OaiError::BadVerb(format!(
                "The OAI verb '{verb_name}' is not correct. Must be one of {}",
                OaiVerb::all_names()
            ))
        })?;

        let row = self.schema.arguments(verb).ok_or_else(|| {
            OaiError::BadVerb(format!("The OAI verb '{verb_name}' is not supported"))
        })?;

        for (name, _) in request.arguments() {
            if !row.accepts(name) {
                return Err(OaiError::BadArgument(format!("unknown argument: {name}")));
            }
        }

        if let Some(exclusive) = row.exclusive() {
            if request.contains(exclusive) {
                if request.argument_count() > 1 {
                    return Err(OaiError::BadArgument(format!(
                        "exclusive argument used with others: {exclusive}"
                    )));
                }
                return Ok(verb);
            }
        }

        for required in row.required() {
            if !request.contains(required) {
                return Err(OaiError::BadArgument(format!(
                    "argument required but not found: {required}"
                )));
            }
        }

        Ok(verb)
    }
}

impl Default for RequestValidator {
    fn default() -> Self {
        Self::new(Arc::new(ArgumentSchema::standard()))
    }
}
