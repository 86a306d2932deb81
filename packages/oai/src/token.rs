//! Resumption token codec.
//!
//! A token carries everything needed to continue a harvest: the effective
//! date range, the cursor of the next page and the metadata prefix. On the
//! wire it is the four fields joined by commas, in that order:
//!
//! ```text
//! 2011-06-01T00:00:00Z,9999-12-31T23:59:59Z,100,oai_dc
//! ```
//!
//! Nothing outside this module builds or splits token strings.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::config::TOKEN_LIFETIME_HOURS;
use crate::datestamp::Datestamp;
use crate::error::{OaiError, Result};

/// Separator between the token fields.
pub const TOKEN_DELIMITER: char = ',';

const FIELD_COUNT: usize = 4;

/// Decoded resumption token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResumptionToken {
    pub from: Datestamp,
    pub until: Datestamp,
    /// Zero-based offset of the first record of the page to fetch.
    pub cursor: u64,
    pub metadata_prefix: String,
}

impl ResumptionToken {
    pub fn new(
        from: Datestamp,
        until: Datestamp,
        cursor: u64,
        metadata_prefix: impl Into<String>,
    ) -> Self {
        Self {
            from,
            until,
            cursor,
            metadata_prefix: metadata_prefix.into(),
        }
    }

    /// Opaque wire form.
    #[must_use]
    pub fn encode(&self) -> String {
        encode(self.from, self.until, self.cursor, &self.metadata_prefix)
    }

    /// Parse the opaque wire form.
    pub fn decode(token: &str) -> Result<Self> {
        decode(token)
    }
}

impl fmt::Display for ResumptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for ResumptionToken {
    type Err = OaiError;

    fn from_str(s: &str) -> Result<Self> {
        decode(s)
    }
}

/// A token as surfaced in a list response, with its informational attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextToken {
    /// `None` on the last page of a continued harvest.
    pub token: Option<ResumptionToken>,
    /// Not enforced: expired tokens are accepted like any other.
    pub expiration_date: Datestamp,
    pub complete_list_size: Option<u64>,
    /// Cursor of the page the token is attached to.
    pub cursor: u64,
}

impl NextToken {
    pub fn issue(
        token: Option<ResumptionToken>,
        issued_at: Datestamp,
        complete_list_size: Option<u64>,
        cursor: u64,
    ) -> Self {
        Self {
            token,
            expiration_date: issued_at.plus_hours(TOKEN_LIFETIME_HOURS),
            complete_list_size,
            cursor,
        }
    }
}

/// Encode the four token fields.
///
/// # Examples
/// ```
/// use samples_oai::datestamp::Datestamp;
/// use samples_oai::token::{decode, encode};
///
/// let from = Datestamp::harvest_epoch();
/// let until = Datestamp::unbounded();
/// let token = encode(from, until, 200, "igsn");
/// assert_eq!(token, "2011-06-01T00:00:00Z,9999-12-31T23:59:59Z,200,igsn");
///
/// let decoded = decode(&token).unwrap();
/// assert_eq!(decoded.cursor, 200);
/// assert_eq!(decoded.metadata_prefix, "igsn");
/// ```
#[must_use]
pub fn encode(from: Datestamp, until: Datestamp, cursor: u64, metadata_prefix: &str) -> String {
    format!(
        "{from}{d}{until}{d}{cursor}{d}{metadata_prefix}",
        d = TOKEN_DELIMITER
    )
}

/// Decode a token string.
///
/// Fails with `badResumptionToken` when the token does not have exactly
/// four fields, the dates are not datestamps, or the cursor is not a
/// non-negative integer.
pub fn decode(token: &str) -> Result<ResumptionToken> {
    let fields: Vec<&str> = token.split(TOKEN_DELIMITER).collect();
    if fields.len() != FIELD_COUNT {
        return Err(OaiError::BadResumptionToken(format!(
            "The resumption token '{token}' is invalid: expected {FIELD_COUNT} fields, found {}",
            fields.len()
        )));
    }

    let from = Datestamp::parse(fields[0]).map_err(|e| bad_token(token, &e.to_string()))?;
    let until = Datestamp::parse(fields[1]).map_err(|e| bad_token(token, &e.to_string()))?;
    let cursor = Some(fields[2])
        .filter(|raw| !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|raw| raw.parse::<u64>().ok())
        .ok_or_else(|| bad_token(token, &format!("cursor '{}' is not a number", fields[2])))?;
    let metadata_prefix = fields[3];
    if metadata_prefix.is_empty() {
        return Err(bad_token(token, "metadata prefix is empty"));
    }

    Ok(ResumptionToken::new(from, until, cursor, metadata_prefix))
}

fn bad_token(token: &str, reason: &str) -> OaiError {
    OaiError::BadResumptionToken(format!(
        "The resumption token '{token}' is invalid: {reason}"
    ))
}
