//! HTTP implementation of [`RecordSource`] for the sample database XML API.
//!
//! The database answers with `ROWSET/ROW` documents. An empty result is not
//! an empty `ROWSET` but a plain-text body containing the marker `No data`.

use reqwest::blocking::Client;
use roxmltree::{Document, Node};

use crate::config::{OaiConfig, UpstreamEndpoints};
use crate::datestamp::Datestamp;
use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{DateRange, RecordSource, SamplePoint, SampleRecord};
use crate::http::{create_client, download_text};
use crate::xml::{descendants_named, find_by_path, text_at};

/// Marker the database API returns instead of an empty result set.
const NO_DATA_MARKER: &str = "No data";

/// Blocking client for the upstream sample database.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
    endpoints: UpstreamEndpoints,
}

impl UpstreamClient {
    pub fn new(client: Client, endpoints: UpstreamEndpoints) -> Self {
        Self { client, endpoints }
    }

    /// Build a client with the configured base URL and timeout.
    pub fn from_config(config: &OaiConfig) -> reqwest::Result<Self> {
        let client = create_client(config.http_timeout_secs)?;
        Ok(Self::new(client, config.endpoints()))
    }

    fn download(&self, url: &url::Url, what: &str) -> GatewayResult<String> {
        tracing::debug!(url = %url, "Querying sample database");
        let body = download_text(&self.client, url)?;
        if is_no_data(&body) {
            return Err(GatewayError::NoData(what.to_string()));
        }
        Ok(body)
    }
}

/// The marker only counts as an empty result when the body is not a
/// document; field text inside a `ROWSET` may contain the same words.
fn is_no_data(body: &str) -> bool {
    !body.trim_start().starts_with('<') && body.contains(NO_DATA_MARKER)
}

impl RecordSource for UpstreamClient {
    fn fetch_page(
        &self,
        page_index: u64,
        page_size: u64,
        range: Option<&DateRange>,
    ) -> GatewayResult<Vec<SampleRecord>> {
        let bounds = range.map(|r| (r.from.to_upstream(), r.until.to_upstream()));
        let url = self.endpoints.sample_set_url(
            page_index + 1,
            page_size,
            bounds.as_ref().map(|(f, u)| (f.as_str(), u.as_str())),
        )?;
        let body = self.download(&url, &format!("sample set page {}", page_index + 1))?;
        parse_sample_set(&body)
    }

    fn earliest_record_date(&self) -> GatewayResult<Datestamp> {
        let url = self.endpoints.earliest_date_url()?;
        let body = self.download(&url, "earliest modification date")?;
        parse_earliest_date(&body)
    }

    fn complete_list_size(&self, range: &DateRange) -> GatewayResult<u64> {
        let url = self
            .endpoints
            .record_count_url(&range.from.to_upstream(), &range.until.to_upstream())?;
        let body = self.download(&url, "record count")?;
        parse_record_count(&body)
    }

    fn get_record(&self, identifier: &str) -> GatewayResult<Option<SampleRecord>> {
        let url = self.endpoints.sample_url(identifier)?;
        match self.download(&url, &format!("sample {identifier}")) {
            Ok(body) => Ok(parse_sample_set(&body)?.into_iter().next()),
            Err(GatewayError::NoData(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Parse every `ROW` of a sample set document.
pub fn parse_sample_set(xml: &str) -> GatewayResult<Vec<SampleRecord>> {
    let doc = Document::parse(xml)?;
    descendants_named(doc.root_element(), "ROW")
        .map(parse_sample_row)
        .collect()
}

/// Parse a single `ROW` element into a record.
pub fn parse_sample_row(row: Node<'_, '_>) -> GatewayResult<SampleRecord> {
    let igsn = text_at(row, "IGSN").ok_or_else(|| GatewayError::MissingElement {
        element: "IGSN".to_string(),
        context: "ROW".to_string(),
    })?;

    Ok(SampleRecord {
        sample_id: text_at(row, "SAMPLEID"),
        sample_no: text_at(row, "SAMPLENO"),
        sample_type: text_at(row, "SAMPLE_TYPE_NEW"),
        material_class: text_at(row, "MATERIAL_CLASS"),
        sampling_method: text_at(row, "SAMPLING_METHOD"),
        lithology: text_at(row, "LITHNAME"),
        remark: text_at(row, "REMARK"),
        entity_name: text_at(row, "ENTITYID"),
        country: text_at(row, "COUNTRY"),
        location: parse_location(row),
        date_acquired: record_date(row, "ACQUIREDATE", &igsn),
        date_modified: record_date(row, "MODIFIED_DATE", &igsn),
        igsn,
    })
}

fn parse_location(row: Node<'_, '_>) -> Option<SamplePoint> {
    let geom = find_by_path(row, "GEOM")?;
    Some(SamplePoint {
        srid: text_at(geom, "SDO_SRID")?,
        x: text_at(geom, "SDO_POINT/X")?,
        y: text_at(geom, "SDO_POINT/Y")?,
        z: text_at(geom, "SDO_POINT/Z"),
    })
}

/// A record date field; unparseable values are logged and treated as absent.
fn record_date(row: Node<'_, '_>, field: &str, igsn: &str) -> Option<Datestamp> {
    let raw = text_at(row, field)?;
    match Datestamp::from_upstream(&raw) {
        Ok(stamp) => Some(stamp),
        Err(e) => {
            tracing::warn!(igsn, field, error = %e, "Ignoring unparseable record date");
            None
        }
    }
}

/// Parse the `EARLIEST_MODIFIED_DATE` document.
pub fn parse_earliest_date(xml: &str) -> GatewayResult<Datestamp> {
    let doc = Document::parse(xml)?;
    let raw = descendants_named(doc.root_element(), "EARLIEST_MODIFIED_DATE")
        .last()
        .and_then(crate::xml::non_empty_text)
        .ok_or_else(|| GatewayError::MissingElement {
            element: "EARLIEST_MODIFIED_DATE".to_string(),
            context: "earliest date response".to_string(),
        })?;
    Datestamp::from_upstream(&raw).map_err(|_| GatewayError::InvalidValue {
        field: "EARLIEST_MODIFIED_DATE".to_string(),
        value: raw,
    })
}

/// Parse the `RECORD_COUNT` document.
pub fn parse_record_count(xml: &str) -> GatewayResult<u64> {
    let doc = Document::parse(xml)?;
    let raw = descendants_named(doc.root_element(), "RECORD_COUNT")
        .last()
        .and_then(crate::xml::non_empty_text)
        .ok_or_else(|| GatewayError::MissingElement {
            element: "RECORD_COUNT".to_string(),
            context: "record count response".to_string(),
        })?;
    raw.parse::<u64>().map_err(|_| GatewayError::InvalidValue {
        field: "RECORD_COUNT".to_string(),
        value: raw,
    })
}
