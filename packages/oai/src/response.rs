//! OAI-PMH response documents.
//!
//! Every document shares the same envelope: `responseDate`, the echoed
//! `request` and then either one verb element or one `error` element.

use std::fmt::{self, Write};

use quick_xml::escape::escape;
use strum::IntoEnumIterator;

use crate::crosswalk::CrosswalkId;
use crate::datestamp::Datestamp;
use crate::error::OaiError;
use crate::gateway::SampleRecord;
use crate::request::OaiRequest;
use crate::schema::OaiVerb;
use crate::token::NextToken;

/// Content type of every response, success or error.
pub const CONTENT_TYPE: &str = "text/xml";

pub const OAI_NAMESPACE: &str = "http://www.openarchives.org/OAI/2.0/";
const OAI_SCHEMA: &str = "http://www.openarchives.org/OAI/2.0/OAI-PMH.xsd";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

pub const PROTOCOL_VERSION: &str = "2.0";
pub const GRANULARITY: &str = "YYYY-MM-DDThh:mm:ssZ";

pub type RenderResult = Result<String, fmt::Error>;

/// The parts of the envelope common to every response.
#[derive(Debug, Clone, Copy)]
pub struct Envelope<'a> {
    pub response_date: Datestamp,
    pub request_uri: &'a str,
    /// Arguments echoed as attributes of `<request>`; `None` leaves the
    /// element bare, as required when the request itself was illegal.
    pub request: Option<&'a OaiRequest>,
}

/// Repository description reported by `Identify`.
#[derive(Debug, Clone)]
pub struct RepositoryInfo<'a> {
    pub name: &'a str,
    pub base_url: &'a str,
    pub admin_email: &'a str,
    pub earliest_datestamp: Datestamp,
}

fn open(out: &mut String, envelope: &Envelope<'_>) -> fmt::Result {
    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        out,
        r#"<OAI-PMH xmlns="{OAI_NAMESPACE}" xmlns:xsi="{XSI_NAMESPACE}" xsi:schemaLocation="{OAI_NAMESPACE} {OAI_SCHEMA}">"#
    )?;
    writeln!(out, "  <responseDate>{}</responseDate>", envelope.response_date)?;
    write!(out, "  <request")?;
    if let Some(request) = envelope.request {
        let attributes = request
            .verb()
            .map(|v| ("verb", v))
            .into_iter()
            .chain(request.arguments());
        for (name, value) in attributes {
            write!(out, r#" {name}="{}""#, escape(value))?;
        }
    }
    writeln!(out, ">{}</request>", escape(envelope.request_uri))
}

fn close(out: &mut String) -> fmt::Result {
    writeln!(out, "</OAI-PMH>")
}

/// The error envelope. Illegal requests are echoed without attributes.
pub fn error(envelope: &Envelope<'_>, err: &OaiError) -> RenderResult {
    let envelope = match err {
        OaiError::BadVerb(_) | OaiError::BadArgument(_) => Envelope {
            request: None,
            ..*envelope
        },
        _ => *envelope,
    };

    let mut out = String::new();
    open(&mut out, &envelope)?;
    writeln!(
        out,
        r#"  <error code="{}">{}</error>"#,
        err.code(),
        escape(err.message())
    )?;
    close(&mut out)?;
    Ok(out)
}

pub fn identify(envelope: &Envelope<'_>, info: &RepositoryInfo<'_>) -> RenderResult {
    let mut out = String::new();
    open(&mut out, envelope)?;
    writeln!(out, "  <Identify>")?;
    writeln!(out, "    <repositoryName>{}</repositoryName>", escape(info.name))?;
    writeln!(out, "    <baseURL>{}</baseURL>", escape(info.base_url))?;
    writeln!(out, "    <protocolVersion>{PROTOCOL_VERSION}</protocolVersion>")?;
    writeln!(out, "    <adminEmail>{}</adminEmail>", escape(info.admin_email))?;
    writeln!(
        out,
        "    <earliestDatestamp>{}</earliestDatestamp>",
        info.earliest_datestamp
    )?;
    writeln!(out, "    <deletedRecord>no</deletedRecord>")?;
    writeln!(out, "    <granularity>{GRANULARITY}</granularity>")?;
    writeln!(out, "  </Identify>")?;
    close(&mut out)?;
    Ok(out)
}

pub fn list_metadata_formats(envelope: &Envelope<'_>) -> RenderResult {
    let mut out = String::new();
    open(&mut out, envelope)?;
    writeln!(out, "  <ListMetadataFormats>")?;
    for id in CrosswalkId::iter() {
        writeln!(out, "    <metadataFormat>")?;
        writeln!(out, "      <metadataPrefix>{}</metadataPrefix>", id.prefix())?;
        writeln!(out, "      <schema>{}</schema>", id.schema())?;
        writeln!(
            out,
            "      <metadataNamespace>{}</metadataNamespace>",
            id.namespace()
        )?;
        writeln!(out, "    </metadataFormat>")?;
    }
    writeln!(out, "  </ListMetadataFormats>")?;
    close(&mut out)?;
    Ok(out)
}

pub fn get_record(
    envelope: &Envelope<'_>,
    record: &SampleRecord,
    crosswalk: CrosswalkId,
) -> RenderResult {
    let mut out = String::new();
    open(&mut out, envelope)?;
    writeln!(out, "  <{}>", OaiVerb::GetRecord)?;
    write_record(&mut out, record, crosswalk)?;
    writeln!(out, "  </{}>", OaiVerb::GetRecord)?;
    close(&mut out)?;
    Ok(out)
}

pub fn list_records(
    envelope: &Envelope<'_>,
    records: &[SampleRecord],
    crosswalk: CrosswalkId,
    next: Option<&NextToken>,
) -> RenderResult {
    let mut out = String::new();
    open(&mut out, envelope)?;
    writeln!(out, "  <{}>", OaiVerb::ListRecords)?;
    for record in records {
        write_record(&mut out, record, crosswalk)?;
    }
    if let Some(next) = next {
        write_resumption_token(&mut out, next)?;
    }
    writeln!(out, "  </{}>", OaiVerb::ListRecords)?;
    close(&mut out)?;
    Ok(out)
}

pub fn list_identifiers(
    envelope: &Envelope<'_>,
    records: &[SampleRecord],
    next: Option<&NextToken>,
) -> RenderResult {
    let mut out = String::new();
    open(&mut out, envelope)?;
    writeln!(out, "  <{}>", OaiVerb::ListIdentifiers)?;
    for record in records {
        write_header(&mut out, record, 4)?;
    }
    if let Some(next) = next {
        write_resumption_token(&mut out, next)?;
    }
    writeln!(out, "  </{}>", OaiVerb::ListIdentifiers)?;
    close(&mut out)?;
    Ok(out)
}

fn write_header(out: &mut String, record: &SampleRecord, indent: usize) -> fmt::Result {
    let pad = " ".repeat(indent);
    writeln!(out, "{pad}<header>")?;
    writeln!(
        out,
        "{pad}  <identifier>{}</identifier>",
        escape(record.igsn.as_str())
    )?;
    writeln!(out, "{pad}  <datestamp>{}</datestamp>", record.datestamp())?;
    writeln!(out, "{pad}</header>")
}

fn write_record(out: &mut String, record: &SampleRecord, crosswalk: CrosswalkId) -> fmt::Result {
    writeln!(out, "    <record>")?;
    write_header(out, record, 6)?;
    writeln!(out, "      <metadata>")?;
    crosswalk.render(record, out)?;
    writeln!(out, "      </metadata>")?;
    writeln!(out, "    </record>")
}

fn write_resumption_token(out: &mut String, next: &NextToken) -> fmt::Result {
    write!(out, "    <resumptionToken")?;
    if next.token.is_some() {
        write!(out, r#" expirationDate="{}""#, next.expiration_date)?;
    }
    if let Some(size) = next.complete_list_size {
        write!(out, r#" completeListSize="{size}""#)?;
    }
    write!(out, r#" cursor="{}""#, next.cursor)?;
    match &next.token {
        Some(token) => writeln!(
            out,
            ">{}</resumptionToken>",
            escape(token.encode().as_str())
        ),
        None => writeln!(out, "/>"),
    }
}
