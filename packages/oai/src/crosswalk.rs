//! Metadata formats and the crosswalks that render a sample into them.
//!
//! Every supported `metadataPrefix` has one [`CrosswalkId`]. The
//! [`CrosswalkSelector`] resolves a requested prefix to a crosswalk
//! according to the configured [`PrefixPolicy`].

use std::fmt::{self, Write};
use std::str::FromStr;

use quick_xml::escape::escape;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::datestamp::Datestamp;
use crate::error::{OaiError, Result};
use crate::gateway::SampleRecord;

/// Zero width space that some harvesters append to the prefix.
const ZERO_WIDTH_SPACE: char = '\u{200B}';

/// Organisation credited as creator and publisher of every record.
pub const RECORD_AGENT: &str = "Geoscience Australia (http://pid.geoscience.gov.au/org/ga)";

/// Base of sample landing pages.
const LANDING_PAGE_BASE: &str = "http://pid.geoscience.gov.au/sample/";

const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const DC_NAMESPACE: &str = "http://purl.org/dc/elements/1.1/";

/// Supported metadata formats.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, AsRefStr, Display, EnumIter, EnumString,
)]
pub enum CrosswalkId {
    /// Simple Dublin Core, mandatory for every OAI-PMH repository.
    #[default]
    #[strum(serialize = "oai_dc")]
    OaiDc,
    /// IGSN description schema 1.0.
    #[strum(serialize = "igsn")]
    Igsn,
    /// IGSN registration kernel, release 1.
    #[strum(serialize = "igsn-r1")]
    IgsnR1,
    /// CSIRO IGSN descriptive metadata, version 3.
    #[strum(serialize = "csirov3")]
    CsiroV3,
}

impl CrosswalkId {
    /// The `metadataPrefix` naming this format.
    #[must_use]
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::OaiDc => "oai_dc",
            Self::Igsn => "igsn",
            Self::IgsnR1 => "igsn-r1",
            Self::CsiroV3 => "csirov3",
        }
    }

    #[must_use]
    pub fn namespace(&self) -> &'static str {
        match self {
            Self::OaiDc => "http://www.openarchives.org/OAI/2.0/oai_dc/",
            Self::Igsn => "http://schema.igsn.org/description/1.0",
            Self::IgsnR1 => "http://igsn.org/schema/kernel-v.1.0",
            Self::CsiroV3 => "https://igsn.csiro.au/schemas/3.0",
        }
    }

    #[must_use]
    pub fn schema(&self) -> &'static str {
        match self {
            Self::OaiDc => "http://www.openarchives.org/OAI/2.0/oai_dc.xsd",
            Self::Igsn => "http://schema.igsn.org/description/1.0/resource.xsd",
            Self::IgsnR1 => "http://schema.igsn.org/registration/1.0/igsn.xsd",
            Self::CsiroV3 => "https://igsn.csiro.au/schemas/3.0/igsn-csiro-v3.0.xsd",
        }
    }

    /// Write the metadata payload of `record` in this format.
    pub fn render(&self, record: &SampleRecord, out: &mut String) -> fmt::Result {
        match self {
            Self::OaiDc => render_dc(record, out),
            Self::Igsn => render_igsn(record, out),
            Self::IgsnR1 => render_igsn_r1(record, out),
            Self::CsiroV3 => render_csirov3(record, out),
        }
    }
}

/// What to do with a `metadataPrefix` that names no crosswalk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrefixPolicy {
    /// Serve Dublin Core instead.
    #[default]
    Fallback,
    /// Reject with `cannotDisseminateFormat`.
    Strict,
}

/// Resolves requested prefixes to crosswalks.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrosswalkSelector {
    policy: PrefixPolicy,
}

impl CrosswalkSelector {
    pub fn new(policy: PrefixPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub fn policy(&self) -> PrefixPolicy {
        self.policy
    }

    /// Pick the crosswalk for a requested prefix.
    ///
    /// Zero width spaces are stripped first. An absent prefix selects Dublin
    /// Core; an unknown one does too under [`PrefixPolicy::Fallback`].
    ///
    /// # Examples
    /// ```
    /// use samples_oai::crosswalk::{CrosswalkId, CrosswalkSelector, PrefixPolicy};
    ///
    /// let selector = CrosswalkSelector::new(PrefixPolicy::Strict);
    /// assert_eq!(selector.select(Some("igsn\u{200B}")).unwrap(), CrosswalkId::Igsn);
    /// assert!(selector.select(Some("marc21")).is_err());
    /// ```
    pub fn select(&self, prefix: Option<&str>) -> Result<CrosswalkId> {
        let Some(raw) = prefix else {
            return Ok(CrosswalkId::OaiDc);
        };
        let cleaned = clean_prefix(raw);
        match CrosswalkId::from_str(&cleaned) {
            Ok(id) => Ok(id),
            Err(_) => match self.policy {
                PrefixPolicy::Fallback => {
                    tracing::debug!(prefix = %cleaned, "Unknown metadata prefix, serving oai_dc");
                    Ok(CrosswalkId::OaiDc)
                }
                PrefixPolicy::Strict => Err(OaiError::CannotDisseminateFormat(format!(
                    "The metadata format '{cleaned}' is not supported by this repository. \
                     Supported formats: {}",
                    supported_prefixes()
                ))),
            },
        }
    }
}

/// Remove zero width spaces from a requested prefix.
#[must_use]
pub fn clean_prefix(raw: &str) -> String {
    raw.replace(ZERO_WIDTH_SPACE, "")
}

fn supported_prefixes() -> String {
    CrosswalkId::iter()
        .map(|id| id.prefix())
        .collect::<Vec<_>>()
        .join(", ")
}

/// `<tag>value</tag>` on its own line, skipped when the value is absent.
fn element(out: &mut String, indent: usize, tag: &str, value: Option<&str>) -> fmt::Result {
    if let Some(value) = value {
        writeln!(
            out,
            "{:indent$}<{tag}>{}</{tag}>",
            "",
            escape(value),
            indent = indent
        )?;
    }
    Ok(())
}

fn schema_location(id: CrosswalkId) -> String {
    format!(
        r#"xmlns:xsi="{XSI_NAMESPACE}" xsi:schemaLocation="{} {}""#,
        id.namespace(),
        id.schema()
    )
}

fn render_dc(record: &SampleRecord, out: &mut String) -> fmt::Result {
    let id = CrosswalkId::OaiDc;
    let wkt = record.location.as_ref().map(|p| p.to_wkt());
    let date = record.date_acquired.map(|d| d.to_string());

    writeln!(
        out,
        r#"<oai_dc:dc xmlns:oai_dc="{}" xmlns:dc="{DC_NAMESPACE}" {}>"#,
        id.namespace(),
        schema_location(id)
    )?;
    element(out, 2, "dc:identifier", Some(&record.igsn))?;
    element(out, 2, "dc:description", record.remark.as_deref())?;
    element(out, 2, "dc:date", date.as_deref())?;
    element(out, 2, "dc:type", record.sample_type.as_deref())?;
    element(out, 2, "dc:format", record.material_class.as_deref())?;
    element(out, 2, "dc:coverage", wkt.as_deref())?;
    element(out, 2, "dc:creator", Some(RECORD_AGENT))?;
    element(out, 2, "dc:publisher", Some(RECORD_AGENT))?;
    writeln!(out, "</oai_dc:dc>")
}

fn render_igsn(record: &SampleRecord, out: &mut String) -> fmt::Result {
    let id = CrosswalkId::Igsn;
    // The schema requires a collection time.
    let collection_time = record
        .date_acquired
        .unwrap_or_else(Datestamp::sentinel)
        .to_string();

    writeln!(
        out,
        r#"<resource xmlns="{}" {}>"#,
        id.namespace(),
        schema_location(id)
    )?;
    element(out, 2, "resourceIdentifier", Some(&record.igsn))?;
    if let Some(sample_id) = &record.sample_id {
        writeln!(out, "  <alternateIdentifiers>")?;
        element(out, 4, "alternateIdentifier", Some(sample_id))?;
        writeln!(out, "  </alternateIdentifiers>")?;
    }
    element(out, 2, "description", record.remark.as_deref())?;
    if let Some(point) = &record.location {
        writeln!(out, "  <location>")?;
        element(out, 4, "geometry", Some(&point.to_wkt()))?;
        writeln!(out, "  </location>")?;
    }
    if let Some(sample_type) = &record.sample_type {
        writeln!(out, "  <resourceTypes>")?;
        element(out, 4, "resourceType", Some(sample_type))?;
        writeln!(out, "  </resourceTypes>")?;
    }
    if let Some(material) = &record.material_class {
        writeln!(out, "  <materials>")?;
        element(out, 4, "material", Some(material))?;
        writeln!(out, "  </materials>")?;
    }
    if let Some(method) = &record.sampling_method {
        writeln!(out, "  <collectionMethods>")?;
        element(out, 4, "collectionMethod", Some(method))?;
        writeln!(out, "  </collectionMethods>")?;
    }
    element(out, 2, "collectionTime", Some(&collection_time))?;
    writeln!(out, "</resource>")
}

fn render_igsn_r1(record: &SampleRecord, out: &mut String) -> fmt::Result {
    let id = CrosswalkId::IgsnR1;
    let collection_time = record.date_acquired.map(|d| d.to_string());

    writeln!(
        out,
        r#"<sample xmlns="{}" {}>"#,
        id.namespace(),
        schema_location(id)
    )?;
    writeln!(
        out,
        r#"  <sampleNumber identifierType="igsn">{}</sampleNumber>"#,
        escape(record.igsn.as_str())
    )?;
    element(out, 2, "sampleName", record.sample_id.as_deref())?;
    element(out, 2, "description", record.remark.as_deref())?;
    if let Some(point) = &record.location {
        writeln!(out, "  <location>")?;
        element(out, 4, "geometry", Some(&point.to_wkt()))?;
        writeln!(out, "  </location>")?;
    }
    element(out, 2, "sampleType", record.sample_type.as_deref())?;
    element(out, 2, "material", record.material_class.as_deref())?;
    element(out, 2, "collectionMethod", record.sampling_method.as_deref())?;
    element(out, 2, "collectionTime", collection_time.as_deref())?;
    writeln!(out, "</sample>")
}

fn render_csirov3(record: &SampleRecord, out: &mut String) -> fmt::Result {
    let id = CrosswalkId::CsiroV3;
    let landing_page = format!("{LANDING_PAGE_BASE}{}", record.igsn);

    writeln!(
        out,
        r#"<resources xmlns="{}" {}>"#,
        id.namespace(),
        schema_location(id)
    )?;
    writeln!(out, "  <resource>")?;
    writeln!(
        out,
        r#"    <resourceIdentifier identifierType="IGSN">{}</resourceIdentifier>"#,
        escape(record.igsn.as_str())
    )?;
    element(out, 4, "landingPage", Some(&landing_page))?;
    element(out, 4, "resourceTitle", record.sample_id.as_deref())?;
    if let Some(sample_type) = &record.sample_type {
        writeln!(out, "    <resourceTypes>")?;
        element(out, 6, "resourceType", Some(sample_type))?;
        writeln!(out, "    </resourceTypes>")?;
    }
    if let Some(material) = &record.material_class {
        writeln!(out, "    <materialTypes>")?;
        element(out, 6, "materialType", Some(material))?;
        writeln!(out, "    </materialTypes>")?;
    }
    element(out, 4, "method", record.sampling_method.as_deref())?;
    if let Some(point) = &record.location {
        writeln!(out, "    <location>")?;
        element(out, 6, "geometry", Some(&point.to_wkt()))?;
        writeln!(out, "    </location>")?;
    }
    if let Some(acquired) = record.date_acquired {
        writeln!(out, "    <date>")?;
        element(out, 6, "timeInstant", Some(&acquired.to_string()))?;
        writeln!(out, "    </date>")?;
    }
    writeln!(out, "  </resource>")?;
    writeln!(out, "</resources>")
}
