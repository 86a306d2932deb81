//! Harvest planning for `ListRecords` and `ListIdentifiers`.
//!
//! The planner turns a validated list request into a position in the
//! result set (date range, cursor, prefix), fetches that page from the
//! [`RecordSource`] and decides whether a further resumption token is due.
//!
//! Invariants kept here:
//! - the cursor of every issued token is a multiple of the page size;
//! - a continued harvest reuses the token's range and prefix verbatim;
//! - no token is issued once `cursor + page_size` reaches the list size.

use crate::datestamp::{Bound, Datestamp};
use crate::error::{OaiError, Result};
use crate::gateway::{DateRange, HarvestPage, RecordSource};
use crate::request::OaiRequest;
use crate::schema::{FROM, METADATA_PREFIX, RESUMPTION_TOKEN, SET, UNTIL};
use crate::token::{self, ResumptionToken};

/// Where a harvest request points into the result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestPosition {
    pub range: DateRange,
    /// Offset of the first record to return.
    pub cursor: u64,
    /// Prefix as requested (or as carried by the token), not yet resolved
    /// to a crosswalk.
    pub metadata_prefix: String,
    /// Whether the request continued a harvest with a resumption token.
    pub resumed: bool,
}

/// Result of planning one harvest step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestPlan {
    pub page: HarvestPage,
    /// Token for the next page, `None` when this page is the last.
    pub next_token: Option<ResumptionToken>,
    pub range: DateRange,
    pub metadata_prefix: String,
    pub resumed: bool,
}

impl HarvestPlan {
    /// Whether the harvest ends with this page.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.next_token.is_none()
    }
}

/// Plans harvest pages against a record source with a fixed page size.
pub struct HarvestPlanner<'a, S: RecordSource + ?Sized> {
    source: &'a S,
    page_size: u64,
}

impl<'a, S: RecordSource + ?Sized> HarvestPlanner<'a, S> {
    /// `page_size` must be non-zero; configuration guarantees this.
    pub fn new(source: &'a S, page_size: u64) -> Self {
        Self {
            source,
            page_size: page_size.max(1),
        }
    }

    #[must_use]
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Resolve and fetch in one step.
    pub fn plan(&self, request: &OaiRequest) -> Result<HarvestPlan> {
        let position = self.resolve(request)?;
        self.fetch(position)
    }

    /// Work out the harvest position from a validated list request.
    pub fn resolve(&self, request: &OaiRequest) -> Result<HarvestPosition> {
        if let Some(raw) = request.get(RESUMPTION_TOKEN) {
            return self.resume(raw);
        }

        if request.contains(SET) {
            return Err(OaiError::NoSetHierarchy(
                "This repository does not support sets".to_string(),
            ));
        }

        let metadata_prefix = request.get(METADATA_PREFIX).ok_or_else(|| {
            OaiError::BadArgument(format!("argument required but not found: {METADATA_PREFIX}"))
        })?;

        let from = match request.get(FROM) {
            Some(raw) => parse_bound(FROM, raw, Bound::Lower)?,
            None => Datestamp::harvest_epoch(),
        };
        let until = match request.get(UNTIL) {
            Some(raw) => parse_bound(UNTIL, raw, Bound::Upper)?,
            None => Datestamp::unbounded(),
        };
        if from > until {
            return Err(OaiError::BadArgument(format!(
                "The from argument ({from}) is later than the until argument ({until})"
            )));
        }

        Ok(HarvestPosition {
            range: DateRange::new(from, until),
            cursor: 0,
            metadata_prefix: metadata_prefix.to_string(),
            resumed: false,
        })
    }

    fn resume(&self, raw: &str) -> Result<HarvestPosition> {
        let decoded = token::decode(raw)?;
        if decoded.cursor % self.page_size != 0 {
            return Err(OaiError::BadResumptionToken(format!(
                "The resumption token '{raw}' is invalid: cursor {} is not a multiple of the \
                 page size {}",
                decoded.cursor, self.page_size
            )));
        }
        if decoded.from > decoded.until {
            return Err(OaiError::BadResumptionToken(format!(
                "The resumption token '{raw}' is invalid: its date range is empty"
            )));
        }

        Ok(HarvestPosition {
            range: DateRange::new(decoded.from, decoded.until),
            cursor: decoded.cursor,
            metadata_prefix: decoded.metadata_prefix,
            resumed: true,
        })
    }

    /// Fetch the page at `position` and compute the follow-up token.
    pub fn fetch(&self, position: HarvestPosition) -> Result<HarvestPlan> {
        let cursor_next = position.cursor.checked_add(self.page_size).ok_or_else(|| {
            OaiError::BadResumptionToken(format!(
                "The resumption token is invalid: cursor {} is past the end of any list",
                position.cursor
            ))
        })?;
        let page_index = position.cursor / self.page_size;
        tracing::debug!(
            cursor = position.cursor,
            page_index,
            page_size = self.page_size,
            from = %position.range.from,
            until = %position.range.until,
            "Fetching harvest page"
        );

        let records = self
            .source
            .fetch_page(page_index, self.page_size, Some(&position.range))?;
        if records.is_empty() {
            return Err(OaiError::empty_list());
        }

        let complete_list_size = match self.source.complete_list_size(&position.range) {
            Ok(size) => Some(size),
            Err(e) => {
                tracing::warn!(error = %e, "Record count unavailable, omitting completeListSize");
                None
            }
        };

        let next_token = match complete_list_size {
            Some(size) if cursor_next >= size => None,
            _ => Some(ResumptionToken::new(
                position.range.from,
                position.range.until,
                cursor_next,
                position.metadata_prefix.clone(),
            )),
        };

        Ok(HarvestPlan {
            page: HarvestPage {
                records,
                cursor: position.cursor,
                complete_list_size,
            },
            next_token,
            range: position.range,
            metadata_prefix: position.metadata_prefix,
            resumed: position.resumed,
        })
    }
}

fn parse_bound(name: &str, raw: &str, bound: Bound) -> Result<Datestamp> {
    Datestamp::parse_argument(raw, bound).map_err(|_| {
        OaiError::BadArgument(format!(
            "The value '{raw}' of the {name} argument is not a legal datestamp"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GatewayError, GatewayResult};
    use crate::gateway::SampleRecord;
    use pretty_assertions::assert_eq;

    struct FixedSource {
        total: u64,
        count_fails: bool,
    }

    impl RecordSource for FixedSource {
        fn fetch_page(
            &self,
            page_index: u64,
            page_size: u64,
            _range: Option<&DateRange>,
        ) -> GatewayResult<Vec<SampleRecord>> {
            let start = page_index * page_size;
            let end = (start + page_size).min(self.total);
            if start >= end {
                return Err(GatewayError::NoData("page".to_string()));
            }
            Ok((start..end)
                .map(|i| SampleRecord::new(format!("AU{i}")))
                .collect())
        }

        fn earliest_record_date(&self) -> GatewayResult<Datestamp> {
            Ok(Datestamp::harvest_epoch())
        }

        fn complete_list_size(&self, _range: &DateRange) -> GatewayResult<u64> {
            if self.count_fails {
                return Err(GatewayError::RetriesExhausted {
                    attempts: 3,
                    message: "Server error: 503".to_string(),
                });
            }
            Ok(self.total)
        }

        fn get_record(&self, _identifier: &str) -> GatewayResult<Option<SampleRecord>> {
            Ok(None)
        }
    }

    fn list(prefix: &str) -> OaiRequest {
        OaiRequest::new()
            .with("verb", "ListRecords")
            .with("metadataPrefix", prefix)
    }

    #[test]
    fn test_resolve_defaults() {
        let source = FixedSource { total: 0, count_fails: false };
        let planner = HarvestPlanner::new(&source, 100);
        let position = planner.resolve(&list("oai_dc")).unwrap();
        assert_eq!(position.range, DateRange::default());
        assert_eq!(position.cursor, 0);
        assert!(!position.resumed);
    }

    #[test]
    fn test_resolve_day_granularity_until_is_inclusive() {
        let source = FixedSource { total: 0, count_fails: false };
        let planner = HarvestPlanner::new(&source, 100);
        let request = list("igsn").with("from", "2017-03-27").with("until", "2017-03-27");
        let position = planner.resolve(&request).unwrap();
        assert_eq!(position.range.from.to_string(), "2017-03-27T00:00:00Z");
        assert_eq!(position.range.until.to_string(), "2017-03-27T23:59:59Z");
    }

    #[test]
    fn test_resolve_rejects_bad_dates() {
        let source = FixedSource { total: 0, count_fails: false };
        let planner = HarvestPlanner::new(&source, 100);

        let err = planner.resolve(&list("oai_dc").with("from", "last week")).unwrap_err();
        assert_eq!(err.code(), "badArgument");

        let err = planner
            .resolve(&list("oai_dc").with("from", "2018-01-01").with("until", "2017-01-01"))
            .unwrap_err();
        assert_eq!(err.code(), "badArgument");
    }

    #[test]
    fn test_resolve_set_is_unsupported() {
        let source = FixedSource { total: 0, count_fails: false };
        let planner = HarvestPlanner::new(&source, 100);
        let err = planner.resolve(&list("oai_dc").with("set", "rocks")).unwrap_err();
        assert_eq!(err.code(), "noSetHierarchy");
    }

    #[test]
    fn test_resolve_token_overrides_range_and_prefix() {
        let source = FixedSource { total: 0, count_fails: false };
        let planner = HarvestPlanner::new(&source, 100);
        let request = OaiRequest::new()
            .with("verb", "ListRecords")
            .with("resumptionToken", "2015-01-01T00:00:00Z,2016-01-01T00:00:00Z,200,igsn");
        let position = planner.resolve(&request).unwrap();
        assert_eq!(position.cursor, 200);
        assert_eq!(position.metadata_prefix, "igsn");
        assert_eq!(position.range.from.to_string(), "2015-01-01T00:00:00Z");
        assert!(position.resumed);
    }

    #[test]
    fn test_resolve_rejects_misaligned_cursor() {
        let source = FixedSource { total: 0, count_fails: false };
        let planner = HarvestPlanner::new(&source, 100);
        let request = OaiRequest::new()
            .with("verb", "ListRecords")
            .with("resumptionToken", "2011-06-01T00:00:00Z,9999-12-31T23:59:59Z,150,oai_dc");
        assert_eq!(planner.resolve(&request).unwrap_err().code(), "badResumptionToken");
    }

    #[test]
    fn test_resume_rejects_cursor_at_end_of_range() {
        let source = FixedSource { total: 0, count_fails: false };
        let planner = HarvestPlanner::new(&source, 100);
        let cursor = u64::MAX - u64::MAX % 100;
        let token = token::encode(
            Datestamp::harvest_epoch(),
            Datestamp::unbounded(),
            cursor,
            "oai_dc",
        );
        let request = OaiRequest::new()
            .with("verb", "ListRecords")
            .with("resumptionToken", token);
        assert_eq!(planner.plan(&request).unwrap_err().code(), "badResumptionToken");
    }

    #[test]
    fn test_fetch_issues_next_token() {
        let source = FixedSource { total: 250, count_fails: false };
        let planner = HarvestPlanner::new(&source, 100);
        let plan = planner.plan(&list("oai_dc")).unwrap();
        assert_eq!(plan.page.records.len(), 100);
        assert_eq!(plan.page.complete_list_size, Some(250));
        let next = plan.next_token.unwrap();
        assert_eq!(next.cursor, 100);
        assert_eq!(next.metadata_prefix, "oai_dc");
    }

    #[test]
    fn test_fetch_exact_multiple_has_no_trailing_token() {
        let source = FixedSource { total: 200, count_fails: false };
        let planner = HarvestPlanner::new(&source, 100);
        let position = HarvestPosition {
            range: DateRange::default(),
            cursor: 100,
            metadata_prefix: "oai_dc".to_string(),
            resumed: true,
        };
        let plan = planner.fetch(position).unwrap();
        assert!(plan.is_exhausted());
    }

    #[test]
    fn test_fetch_degraded_count_still_continues() {
        let source = FixedSource { total: 50, count_fails: true };
        let planner = HarvestPlanner::new(&source, 100);
        let plan = planner.plan(&list("oai_dc")).unwrap();
        assert_eq!(plan.page.complete_list_size, None);
        assert_eq!(plan.next_token.map(|t| t.cursor), Some(100));
    }

    #[test]
    fn test_fetch_no_data_is_no_records_match() {
        let source = FixedSource { total: 0, count_fails: false };
        let planner = HarvestPlanner::new(&source, 100);
        let err = planner.plan(&list("oai_dc")).unwrap_err();
        assert_eq!(err.code(), "noRecordsMatch");
    }
}
