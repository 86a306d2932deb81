//! Request handling: validate, plan, render.
//!
//! [`OaiService`] is the only place where an [`OaiError`] turns into an
//! error document. Everything below it returns typed errors; everything
//! above it (the HTTP server) only moves bytes.

use crate::config::OaiConfig;
use crate::crosswalk::CrosswalkSelector;
use crate::datestamp::Datestamp;
use crate::error::{OaiError, Result};
use crate::gateway::{RecordSource, SampleRecord};
use crate::planner::HarvestPlanner;
use crate::request::OaiRequest;
use crate::response::{self, Envelope, RenderResult, RepositoryInfo};
use crate::schema::{OaiVerb, IDENTIFIER, METADATA_PREFIX};
use crate::token::NextToken;
use crate::validate::RequestValidator;

/// A rendered response, ready to be written to the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OaiResponse {
    pub status: u16,
    pub body: String,
}

impl OaiResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    #[must_use]
    pub fn content_type(&self) -> &'static str {
        response::CONTENT_TYPE
    }
}

/// The OAI-PMH request engine over a record source.
pub struct OaiService<S: RecordSource> {
    config: OaiConfig,
    validator: RequestValidator,
    selector: CrosswalkSelector,
    source: S,
}

impl<S: RecordSource> OaiService<S> {
    pub fn new(config: OaiConfig, source: S) -> Self {
        Self::with_validator(config, RequestValidator::default(), source)
    }

    pub fn with_validator(config: OaiConfig, validator: RequestValidator, source: S) -> Self {
        let selector = CrosswalkSelector::new(config.prefix_policy);
        Self {
            config,
            validator,
            selector,
            source,
        }
    }

    pub fn config(&self) -> &OaiConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Handle raw key/value pairs as received from the query string or form.
    ///
    /// A repeated key is rejected before validation, with the same error
    /// envelope as any other failure.
    pub fn handle_pairs<I>(&self, pairs: I, request_uri: &str, now: Datestamp) -> OaiResponse
    where
        I: IntoIterator<Item = (String, String)>,
    {
        match OaiRequest::from_pairs(pairs) {
            Ok(request) => self.handle(&request, request_uri, now),
            Err(err) => {
                let envelope = Envelope {
                    response_date: now,
                    request_uri,
                    request: None,
                };
                finish(reject(&envelope, &err))
            }
        }
    }

    /// Handle one request. Never fails: errors become error documents.
    #[tracing::instrument(skip_all, fields(verb = request.verb().unwrap_or("")))]
    pub fn handle(&self, request: &OaiRequest, request_uri: &str, now: Datestamp) -> OaiResponse {
        let envelope = Envelope {
            response_date: now,
            request_uri,
            request: Some(request),
        };

        let rendered = match self.dispatch(request, &envelope) {
            Ok(body) => body.map(|b| (200, b)),
            Err(err) => reject(&envelope, &err),
        };
        finish(rendered)
    }

    fn dispatch(&self, request: &OaiRequest, envelope: &Envelope<'_>) -> Result<RenderResult> {
        let verb = self.validator.validate(request)?;

        match verb {
            OaiVerb::Identify => Ok(self.identify(envelope)),
            OaiVerb::ListMetadataFormats => {
                if let Some(identifier) = request.get(IDENTIFIER) {
                    self.lookup(identifier)?;
                }
                Ok(response::list_metadata_formats(envelope))
            }
            OaiVerb::ListSets => Err(OaiError::NoSetHierarchy(
                "This repository does not support sets".to_string(),
            )),
            OaiVerb::GetRecord => {
                let crosswalk = self.selector.select(request.get(METADATA_PREFIX))?;
                let identifier = request.get(IDENTIFIER).unwrap_or_default();
                let record = self.lookup(identifier)?;
                Ok(response::get_record(envelope, &record, crosswalk))
            }
            OaiVerb::ListRecords | OaiVerb::ListIdentifiers => {
                self.harvest(verb, request, envelope)
            }
        }
    }

    fn identify(&self, envelope: &Envelope<'_>) -> RenderResult {
        let earliest_datestamp = match self.source.earliest_record_date() {
            Ok(date) => date,
            Err(e) => {
                tracing::warn!(error = %e, "Earliest record date unavailable, using harvest epoch");
                Datestamp::harvest_epoch()
            }
        };
        let info = RepositoryInfo {
            name: &self.config.repository_name,
            base_url: &self.config.base_url,
            admin_email: &self.config.admin_email,
            earliest_datestamp,
        };
        response::identify(envelope, &info)
    }

    fn lookup(&self, identifier: &str) -> Result<SampleRecord> {
        match self.source.get_record(identifier) {
            Ok(Some(record)) => Ok(record),
            Ok(None) => Err(OaiError::unknown_identifier()),
            Err(e) => {
                tracing::warn!(identifier, error = %e, "Record lookup failed");
                Err(e.into())
            }
        }
    }

    fn harvest(
        &self,
        verb: OaiVerb,
        request: &OaiRequest,
        envelope: &Envelope<'_>,
    ) -> Result<RenderResult> {
        let planner = HarvestPlanner::new(&self.source, self.config.batch_size);
        let mut position = planner.resolve(request)?;

        let crosswalk = self.selector.select(Some(&position.metadata_prefix))?;
        position.metadata_prefix = crosswalk.prefix().to_string();

        let plan = planner.fetch(position)?;
        tracing::info!(
            records = plan.page.records.len(),
            cursor = plan.page.cursor,
            complete_list_size = ?plan.page.complete_list_size,
            exhausted = plan.is_exhausted(),
            "Harvest page served"
        );

        let next = match (&plan.next_token, plan.resumed) {
            (None, false) => None,
            (token, _) => Some(NextToken::issue(
                token.clone(),
                envelope.response_date,
                plan.page.complete_list_size,
                plan.page.cursor,
            )),
        };

        Ok(match verb {
            OaiVerb::ListIdentifiers => {
                response::list_identifiers(envelope, &plan.page.records, next.as_ref())
            }
            _ => response::list_records(envelope, &plan.page.records, crosswalk, next.as_ref()),
        })
    }
}

/// Status and body, or a formatting failure.
type Rendered = std::result::Result<(u16, String), std::fmt::Error>;

fn reject(envelope: &Envelope<'_>, err: &OaiError) -> Rendered {
    tracing::info!(code = err.code(), message = err.message(), "Request rejected");
    response::error(envelope, err).map(|body| (err.http_status(), body))
}

fn finish(rendered: Rendered) -> OaiResponse {
    match rendered {
        Ok((status, body)) => OaiResponse { status, body },
        Err(_) => {
            tracing::error!("Failed to render response document");
            OaiResponse {
                status: 500,
                body: "Failed to render response document".to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crosswalk::PrefixPolicy;
    use crate::error::{GatewayError, GatewayResult};
    use crate::gateway::DateRange;
    use pretty_assertions::assert_eq;

    struct OneRecord;

    impl RecordSource for OneRecord {
        fn fetch_page(
            &self,
            page_index: u64,
            _page_size: u64,
            _range: Option<&DateRange>,
        ) -> GatewayResult<Vec<SampleRecord>> {
            if page_index == 0 {
                Ok(vec![SampleRecord::new("AU240")])
            } else {
                Err(GatewayError::NoData("page".to_string()))
            }
        }

        fn earliest_record_date(&self) -> GatewayResult<Datestamp> {
            Err(GatewayError::NoData("earliest".to_string()))
        }

        fn complete_list_size(&self, _range: &DateRange) -> GatewayResult<u64> {
            Ok(1)
        }

        fn get_record(&self, identifier: &str) -> GatewayResult<Option<SampleRecord>> {
            Ok((identifier == "AU240").then(|| SampleRecord::new("AU240")))
        }
    }

    fn service() -> OaiService<OneRecord> {
        OaiService::new(OaiConfig::default(), OneRecord)
    }

    fn now() -> Datestamp {
        Datestamp::parse("2017-03-24T04:02:52Z").unwrap()
    }

    fn error_code(response: &OaiResponse) -> Option<String> {
        let doc = roxmltree::Document::parse(&response.body).unwrap();
        doc.descendants()
            .find(|n| n.has_tag_name("error"))
            .and_then(|n| n.attribute("code").map(str::to_string))
    }

    #[test]
    fn test_bad_verb() {
        let request = OaiRequest::new().with("verb", "GetRec");
        let response = service().handle(&request, "/oai?verb=GetRec", now());
        assert_eq!(response.status, 400);
        assert_eq!(error_code(&response).as_deref(), Some("badVerb"));
        assert_eq!(response.content_type(), "text/xml");
    }

    #[test]
    fn test_repeated_argument_gets_envelope() {
        let pairs = vec![
            ("verb".to_string(), "ListRecords".to_string()),
            ("metadataPrefix".to_string(), "oai_dc".to_string()),
            ("metadataPrefix".to_string(), "igsn".to_string()),
        ];
        let response = service().handle_pairs(pairs, "/oai", now());
        assert_eq!(response.status, 400);
        assert_eq!(error_code(&response).as_deref(), Some("badArgument"));
    }

    #[test]
    fn test_identify_falls_back_to_epoch() {
        let request = OaiRequest::new().with("verb", "Identify");
        let response = service().handle(&request, "/oai?verb=Identify", now());
        assert!(response.is_success());
        assert!(response
            .body
            .contains("<earliestDatestamp>2011-06-01T00:00:00Z</earliestDatestamp>"));
    }

    #[test]
    fn test_get_record_unknown_identifier() {
        let request = OaiRequest::new()
            .with("verb", "GetRecord")
            .with("identifier", "AU999")
            .with("metadataPrefix", "oai_dc");
        let response = service().handle(&request, "/oai", now());
        assert_eq!(error_code(&response).as_deref(), Some("idDoesNotExist"));
    }

    #[test]
    fn test_get_record_found() {
        let request = OaiRequest::new()
            .with("verb", "GetRecord")
            .with("identifier", "AU240")
            .with("metadataPrefix", "igsn");
        let response = service().handle(&request, "/oai", now());
        assert!(response.is_success());
        assert!(response.body.contains("<resourceIdentifier>AU240</resourceIdentifier>"));
    }

    #[test]
    fn test_list_metadata_formats_checks_identifier() {
        let request = OaiRequest::new()
            .with("verb", "ListMetadataFormats")
            .with("identifier", "AU999");
        let response = service().handle(&request, "/oai", now());
        assert_eq!(error_code(&response).as_deref(), Some("idDoesNotExist"));
    }

    #[test]
    fn test_list_sets_has_no_hierarchy() {
        let request = OaiRequest::new().with("verb", "ListSets");
        let response = service().handle(&request, "/oai", now());
        assert_eq!(error_code(&response).as_deref(), Some("noSetHierarchy"));
    }

    #[test]
    fn test_strict_prefix_policy() {
        let config = OaiConfig::default().with_prefix_policy(PrefixPolicy::Strict);
        let service = OaiService::new(config, OneRecord);
        let request = OaiRequest::new()
            .with("verb", "ListRecords")
            .with("metadataPrefix", "marc21");
        let response = service.handle(&request, "/oai", now());
        assert_eq!(
            error_code(&response).as_deref(),
            Some("cannotDisseminateFormat")
        );
    }

    #[test]
    fn test_single_page_harvest_has_no_token() {
        let request = OaiRequest::new()
            .with("verb", "ListIdentifiers")
            .with("metadataPrefix", "marc21");
        let response = service().handle(&request, "/oai", now());
        assert!(response.is_success());
        assert!(!response.body.contains("resumptionToken"));
        assert!(response.body.contains("<identifier>AU240</identifier>"));
    }
}
