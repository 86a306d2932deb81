//! Contract with the upstream paginated record source.
//!
//! The planner and the service only see the [`RecordSource`] trait. The
//! production implementation talks HTTP to the sample database
//! (see [`crate::upstream`]); tests plug in an in-memory source.

use serde::Serialize;

use crate::datestamp::Datestamp;
use crate::error::GatewayResult;

/// Inclusive modification-date range of a harvest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub from: Datestamp,
    pub until: Datestamp,
}

impl DateRange {
    pub fn new(from: Datestamp, until: Datestamp) -> Self {
        Self { from, until }
    }

    #[must_use]
    pub fn contains(&self, stamp: Datestamp) -> bool {
        self.from <= stamp && stamp <= self.until
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self::new(Datestamp::harvest_epoch(), Datestamp::unbounded())
    }
}

/// Sampling location as delivered by the database's spatial column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SamplePoint {
    pub srid: String,
    pub x: String,
    pub y: String,
    pub z: Option<String>,
}

impl SamplePoint {
    /// Well-known text with SRID prefix, e.g. `SRID=8311;POINT(135.1 -25.2)`.
    #[must_use]
    pub fn to_wkt(&self) -> String {
        match &self.z {
            Some(z) => format!("SRID={};POINTZ({} {} {})", self.srid, self.x, self.y, z),
            None => format!("SRID={};POINT({} {})", self.srid, self.x, self.y),
        }
    }
}

/// One physical sample record from the database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SampleRecord {
    /// IGSN, used as the OAI identifier.
    pub igsn: String,
    pub sample_id: Option<String>,
    pub sample_no: Option<String>,
    pub sample_type: Option<String>,
    pub material_class: Option<String>,
    pub sampling_method: Option<String>,
    pub lithology: Option<String>,
    pub remark: Option<String>,
    pub entity_name: Option<String>,
    pub country: Option<String>,
    pub location: Option<SamplePoint>,
    pub date_acquired: Option<Datestamp>,
    pub date_modified: Option<Datestamp>,
}

impl SampleRecord {
    pub fn new(igsn: impl Into<String>) -> Self {
        Self {
            igsn: igsn.into(),
            ..Self::default()
        }
    }

    /// Header datestamp: the modification date, or the sentinel when unknown.
    #[must_use]
    pub fn datestamp(&self) -> Datestamp {
        self.date_modified.unwrap_or_else(Datestamp::sentinel)
    }
}

/// One page of a harvest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestPage {
    pub records: Vec<SampleRecord>,
    /// Offset of the first record of this page in the full result set.
    pub cursor: u64,
    /// Number of records in the full result set; `None` when the source
    /// could not report it.
    pub complete_list_size: Option<u64>,
}

/// Upstream paginated store of sample records.
///
/// Implementations are read-only and side-effect free; every call may be
/// served concurrently.
pub trait RecordSource: Send + Sync {
    /// Fetch one page of records ordered by identifier.
    ///
    /// `page_index` is zero-based; every page of one harvest uses the same
    /// `page_size`. Returns `GatewayError::NoData` when nothing matches.
    fn fetch_page(
        &self,
        page_index: u64,
        page_size: u64,
        range: Option<&DateRange>,
    ) -> GatewayResult<Vec<SampleRecord>>;

    /// Earliest modification date over all records.
    fn earliest_record_date(&self) -> GatewayResult<Datestamp>;

    /// Number of records modified within `range`.
    fn complete_list_size(&self, range: &DateRange) -> GatewayResult<u64>;

    /// A single record by identifier, `None` when it does not exist.
    fn get_record(&self, identifier: &str) -> GatewayResult<Option<SampleRecord>>;
}

impl<T: RecordSource + ?Sized> RecordSource for std::sync::Arc<T> {
    fn fetch_page(
        &self,
        page_index: u64,
        page_size: u64,
        range: Option<&DateRange>,
    ) -> GatewayResult<Vec<SampleRecord>> {
        (**self).fetch_page(page_index, page_size, range)
    }

    fn earliest_record_date(&self) -> GatewayResult<Datestamp> {
        (**self).earliest_record_date()
    }

    fn complete_list_size(&self, range: &DateRange) -> GatewayResult<u64> {
        (**self).complete_list_size(range)
    }

    fn get_record(&self, identifier: &str) -> GatewayResult<Option<SampleRecord>> {
        (**self).get_record(identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wkt() {
        let point = SamplePoint {
            srid: "8311".to_string(),
            x: "135.1".to_string(),
            y: "-25.2".to_string(),
            z: None,
        };
        assert_eq!(point.to_wkt(), "SRID=8311;POINT(135.1 -25.2)");

        let point = SamplePoint {
            z: Some("12".to_string()),
            ..point
        };
        assert_eq!(point.to_wkt(), "SRID=8311;POINTZ(135.1 -25.2 12)");
    }

    #[test]
    fn test_datestamp_falls_back_to_sentinel() {
        let mut record = SampleRecord::new("AU240");
        assert_eq!(record.datestamp().to_string(), "1900-01-01T00:00:00Z");

        let modified = Datestamp::parse("2017-03-27T19:20:53Z").unwrap();
        record.date_modified = Some(modified);
        assert_eq!(record.datestamp(), modified);
    }

    #[test]
    fn test_date_range_contains() {
        let range = DateRange::default();
        assert!(range.contains(Datestamp::harvest_epoch()));
        assert!(range.contains(Datestamp::unbounded()));
        assert!(!range.contains(Datestamp::sentinel()));
    }
}
