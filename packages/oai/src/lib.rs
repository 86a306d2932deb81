//! Samples OAI-PMH - Serve the physical samples database over OAI-PMH.
//!
//! This crate implements the OAI-PMH 2.0 request engine in front of the
//! sample database XML API: verb and argument validation, stateless
//! pagination with resumption tokens, and metadata crosswalk selection.
//!
//! # Example
//!
//! ```
//! use samples_oai::{OaiRequest, RequestValidator};
//!
//! let validator = RequestValidator::default();
//! let request = OaiRequest::new()
//!     .with("verb", "ListRecords")
//!     .with("metadataPrefix", "oai_dc")
//!     .with("resumptionToken", "2011-06-01T00:00:00Z,9999-12-31T23:59:59Z,100,oai_dc");
//!
//! let err = validator.validate(&request).unwrap_err();
//! assert_eq!(err.code(), "badArgument");
//! ```
//!
//! # Architecture
//!
//! - [`schema`]: Verbs and their argument rules
//! - [`request`]: Raw request arguments
//! - [`validate`]: Request validation against the schema
//! - [`token`]: Resumption token codec
//! - [`datestamp`]: OAI-PMH datestamps
//! - [`gateway`]: Record source contract
//! - [`upstream`]: HTTP record source for the sample database
//! - [`planner`]: Harvest paging and token issuing
//! - [`crosswalk`]: Metadata formats and prefix selection
//! - [`response`]: Response documents
//! - [`service`]: Request handling
//! - [`server`]: HTTP transport
//! - [`config`]: Configuration constants and environment
//! - [`error`]: Error types and Result aliases
//! - [`http`]: Upstream HTTP client with retries
//! - [`xml`]: XML utilities
//! - [`cli`]: Command-line interface

pub mod cli;
pub mod config;
pub mod crosswalk;
pub mod datestamp;
pub mod error;
pub mod gateway;
pub mod http;
pub mod planner;
pub mod request;
pub mod response;
pub mod schema;
pub mod server;
pub mod service;
pub mod token;
pub mod upstream;
pub mod validate;
pub mod xml;

// Re-export commonly used items
pub use config::OaiConfig;
pub use crosswalk::{CrosswalkId, CrosswalkSelector, PrefixPolicy};
pub use datestamp::Datestamp;
pub use error::{GatewayError, OaiError, Result};
pub use gateway::{DateRange, HarvestPage, RecordSource, SampleRecord};
pub use planner::{HarvestPlan, HarvestPlanner};
pub use request::OaiRequest;
pub use schema::{ArgumentSchema, OaiVerb};
pub use service::{OaiResponse, OaiService};
pub use token::ResumptionToken;
pub use upstream::UpstreamClient;
pub use validate::RequestValidator;
