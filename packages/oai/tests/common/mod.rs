//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use samples_oai::error::{GatewayError, GatewayResult};
use samples_oai::{DateRange, Datestamp, RecordSource, SampleRecord};

/// Load fixture file content.
pub fn load_fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to load {}: {}", path.display(), e))
}

pub fn ds(value: &str) -> Datestamp {
    Datestamp::parse(value).expect("valid datestamp")
}

/// In-memory record source ordered by identifier.
pub struct MemorySource {
    records: Vec<SampleRecord>,
    pub count_fails: bool,
    pub page_calls: AtomicUsize,
}

impl MemorySource {
    /// `n` records `AU00000..`, modified one day apart from 2012-01-01.
    pub fn with_records(n: usize) -> Self {
        let start = ds("2012-01-01T00:00:00Z");
        let records = (0..n)
            .map(|i| {
                let mut record = SampleRecord::new(format!("AU{i:05}"));
                record.date_modified = Some(start.plus_hours(24 * i as i64));
                record.sample_type = Some("core".to_string());
                record
            })
            .collect();
        Self {
            records,
            count_fails: false,
            page_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_count(mut self) -> Self {
        self.count_fails = true;
        self
    }

    fn matching(&self, range: Option<&DateRange>) -> Vec<&SampleRecord> {
        self.records
            .iter()
            .filter(|r| range.map_or(true, |range| range.contains(r.datestamp())))
            .collect()
    }
}

impl RecordSource for MemorySource {
    fn fetch_page(
        &self,
        page_index: u64,
        page_size: u64,
        range: Option<&DateRange>,
    ) -> GatewayResult<Vec<SampleRecord>> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        let matching = self.matching(range);
        let start = (page_index * page_size) as usize;
        let end = (start + page_size as usize).min(matching.len());
        if start >= end {
            return Err(GatewayError::NoData(format!("page {}", page_index + 1)));
        }
        Ok(matching[start..end].iter().map(|r| (*r).clone()).collect())
    }

    fn earliest_record_date(&self) -> GatewayResult<Datestamp> {
        self.records
            .iter()
            .map(SampleRecord::datestamp)
            .min()
            .ok_or_else(|| GatewayError::NoData("earliest date".to_string()))
    }

    fn complete_list_size(&self, range: &DateRange) -> GatewayResult<u64> {
        if self.count_fails {
            return Err(GatewayError::RetriesExhausted {
                attempts: 3,
                message: "Server error: 503 Service Unavailable".to_string(),
            });
        }
        Ok(self.matching(Some(range)).len() as u64)
    }

    fn get_record(&self, identifier: &str) -> GatewayResult<Option<SampleRecord>> {
        Ok(self.records.iter().find(|r| r.igsn == identifier).cloned())
    }
}

/// Text of the first element with the given local name.
pub fn element_text(xml: &str, tag: &str) -> Option<String> {
    let doc = roxmltree::Document::parse(xml).expect("well-formed response");
    doc.descendants()
        .find(|n| n.has_tag_name(tag))
        .and_then(|n| n.text().map(str::to_string))
}

/// Attribute of the first element with the given local name.
pub fn element_attribute(xml: &str, tag: &str, attribute: &str) -> Option<String> {
    let doc = roxmltree::Document::parse(xml).expect("well-formed response");
    doc.descendants()
        .find(|n| n.has_tag_name(tag))
        .and_then(|n| n.attribute(attribute).map(str::to_string))
}

/// Number of elements with the given local name.
pub fn count_elements(xml: &str, tag: &str) -> usize {
    let doc = roxmltree::Document::parse(xml).expect("well-formed response");
    doc.descendants().filter(|n| n.has_tag_name(tag)).count()
}
