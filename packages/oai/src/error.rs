//! Error types for the OAI-PMH endpoint.
//!
//! `OaiError` is the protocol taxonomy: every variant maps to exactly one
//! OAI-PMH error code and is rendered in the same error envelope.
//! `GatewayError` covers failures talking to the upstream sample database;
//! those never reach the client directly and are folded into
//! `noRecordsMatch` at the planner boundary.

use thiserror::Error;

/// Protocol-level error, one variant per OAI-PMH error code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OaiError {
    /// Missing, repeated or unrecognized `verb`.
    #[error("{0}")]
    BadVerb(String),

    /// Unknown argument, missing required argument, exclusive argument
    /// combined with others, or an argument with illegal syntax.
    #[error("{0}")]
    BadArgument(String),

    /// Resumption token that does not decode.
    #[error("{0}")]
    BadResumptionToken(String),

    /// Metadata prefix not supported by this repository.
    #[error("{0}")]
    CannotDisseminateFormat(String),

    /// Identifier does not resolve to a record upstream.
    #[error("{0}")]
    IdDoesNotExist(String),

    /// The request arguments match zero records.
    #[error("{0}")]
    NoRecordsMatch(String),

    /// The repository does not support sets.
    #[error("{0}")]
    NoSetHierarchy(String),
}

impl OaiError {
    /// Wire error code as defined in OAI-PMH 2.0 section 3.6.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadVerb(_) => "badVerb",
            Self::BadArgument(_) => "badArgument",
            Self::BadResumptionToken(_) => "badResumptionToken",
            Self::CannotDisseminateFormat(_) => "cannotDisseminateFormat",
            Self::IdDoesNotExist(_) => "idDoesNotExist",
            Self::NoRecordsMatch(_) => "noRecordsMatch",
            Self::NoSetHierarchy(_) => "noSetHierarchy",
        }
    }

    /// Human-readable message carried in the error envelope.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::BadVerb(m)
            | Self::BadArgument(m)
            | Self::BadResumptionToken(m)
            | Self::CannotDisseminateFormat(m)
            | Self::IdDoesNotExist(m)
            | Self::NoRecordsMatch(m)
            | Self::NoSetHierarchy(m) => m,
        }
    }

    /// HTTP status used for every error response.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        400
    }

    pub(crate) fn empty_list() -> Self {
        Self::NoRecordsMatch(
            "The combination of the values of the from, until, set and metadataPrefix \
             arguments results in an empty list."
                .to_string(),
        )
    }

    pub(crate) fn unknown_identifier() -> Self {
        Self::IdDoesNotExist(
            "The value of the identifier argument is unknown or illegal in this repository."
                .to_string(),
        )
    }
}

/// Failure while talking to the upstream sample database.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Upstream answered with its "No data" marker.
    #[error("upstream reported no data for {0}")]
    NoData(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream URL could not be built.
    #[error("invalid upstream URL: {0}")]
    Url(#[from] url::ParseError),

    /// Transient failures persisted through every retry.
    #[error("upstream request failed after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },

    /// XML parsing failed.
    #[error("XML parsing failed: {0}")]
    XmlParse(#[from] roxmltree::Error),

    /// Missing required XML element.
    #[error("Missing required XML element: {element} in {context}")]
    MissingElement { element: String, context: String },

    /// An element was present but its text could not be interpreted.
    #[error("Unparseable upstream value for {field}: '{value}'")]
    InvalidValue { field: String, value: String },
}

impl From<GatewayError> for OaiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NoData(_) => OaiError::empty_list(),
            other => OaiError::NoRecordsMatch(format!("Record source unavailable: {other}")),
        }
    }
}

/// A string that is not a legal OAI-PMH datestamp.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("An illegal datestamp was encountered: '{0}'")]
pub struct DatestampError(pub String);

/// Inconsistent argument schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A verb row marks more than one argument `exclusive`.
    #[error("verb {verb} declares more than one exclusive argument: {arguments}")]
    MultipleExclusive { verb: String, arguments: String },

    /// The same verb was given two rows.
    #[error("verb {0} is declared twice")]
    DuplicateVerb(String),
}

/// Failure while starting the server or running a CLI command.
#[derive(Debug, Error)]
pub enum StartupError {
    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// The upstream HTTP client could not be created.
    #[error("failed to create HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// IO error (binding the listener, serving).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Token given to the CLI did not decode.
    #[error("{}: {}", .0.code(), .0.message())]
    Oai(#[from] OaiError),

    /// JSON output could not be produced.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, OaiError>;

/// Result type alias for upstream operations.
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;
