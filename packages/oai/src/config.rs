//! Configuration constants, runtime configuration and upstream URL builders.

use std::net::SocketAddr;

use url::Url;

use crate::crosswalk::PrefixPolicy;
use crate::error::StartupError;

/// Default base URL of the sample database XML API.
pub const DEFAULT_UPSTREAM_BASE_URL: &str = "http://dbforms.ga.gov.au/www_distp";

/// Default public URL of this OAI-PMH endpoint.
pub const DEFAULT_BASE_URL: &str = "http://pid.geoscience.gov.au/oai";

/// Default repository administrator address reported by `Identify`.
pub const DEFAULT_ADMIN_EMAIL: &str = "dataman@ga.gov.au";

/// Default repository name reported by `Identify`.
pub const DEFAULT_REPOSITORY_NAME: &str = "Geoscience Australia Samples";

/// Default listen address for the HTTP server.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Default number of records per harvest page.
pub const DEFAULT_BATCH_SIZE: u64 = 100;

/// HTTP timeout in seconds for upstream calls.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Lower bound of a harvest when `from` is not given.
pub const HARVEST_EPOCH: &str = "2011-06-01T00:00:00Z";

/// Upper bound of a harvest when `until` is not given.
pub const UNBOUNDED_UNTIL: &str = "9999-12-31T23:59:59Z";

/// Datestamp used for records without a modification date.
pub const SENTINEL_DATESTAMP: &str = "1900-01-01T00:00:00Z";

/// Lifetime reported in `expirationDate` of issued resumption tokens.
///
/// Informational only: expired tokens are still accepted.
pub const TOKEN_LIFETIME_HOURS: i64 = 1;

/// Runtime configuration of the OAI-PMH service.
#[derive(Debug, Clone)]
pub struct OaiConfig {
    pub upstream_base_url: String,
    pub base_url: String,
    pub admin_email: String,
    pub repository_name: String,
    pub batch_size: u64,
    pub prefix_policy: PrefixPolicy,
    pub bind_addr: SocketAddr,
    pub http_timeout_secs: u64,
}

impl OaiConfig {
    /// Read the configuration from `OAI_*` environment variables.
    pub fn from_env() -> Result<Self, StartupError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StartupError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let upstream_base_url = lookup("OAI_UPSTREAM_BASE_URL")
            .unwrap_or_else(|| DEFAULT_UPSTREAM_BASE_URL.to_string());
        Url::parse(&upstream_base_url).map_err(|e| {
            StartupError::Config(format!(
                "OAI_UPSTREAM_BASE_URL '{upstream_base_url}' is not a valid URL: {e}"
            ))
        })?;

        let base_url = lookup("OAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let admin_email =
            lookup("OAI_ADMIN_EMAIL").unwrap_or_else(|| DEFAULT_ADMIN_EMAIL.to_string());
        let repository_name =
            lookup("OAI_REPOSITORY_NAME").unwrap_or_else(|| DEFAULT_REPOSITORY_NAME.to_string());

        let batch_size = match lookup("OAI_BATCH_SIZE") {
            Some(raw) => parse_batch_size(&raw)?,
            None => DEFAULT_BATCH_SIZE,
        };

        let prefix_policy = if lookup("OAI_STRICT_METADATA_PREFIX")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false)
        {
            PrefixPolicy::Strict
        } else {
            PrefixPolicy::Fallback
        };

        let bind_raw = lookup("OAI_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse().map_err(|_| {
            StartupError::Config(format!("OAI_BIND_ADDR '{bind_raw}' is not a socket address"))
        })?;

        let http_timeout_secs = match lookup("OAI_HTTP_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(StartupError::Config(format!(
                        "OAI_HTTP_TIMEOUT_SECS '{raw}' must be a positive number of seconds"
                    )))
                }
            },
            None => HTTP_TIMEOUT_SECS,
        };

        Ok(Self {
            upstream_base_url,
            base_url,
            admin_email,
            repository_name,
            batch_size,
            prefix_policy,
            bind_addr,
            http_timeout_secs,
        })
    }

    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_prefix_policy(mut self, policy: PrefixPolicy) -> Self {
        self.prefix_policy = policy;
        self
    }

    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Upstream endpoints derived from `upstream_base_url`.
    pub fn endpoints(&self) -> UpstreamEndpoints {
        UpstreamEndpoints::new(&self.upstream_base_url)
    }
}

impl Default for OaiConfig {
    fn default() -> Self {
        Self {
            upstream_base_url: DEFAULT_UPSTREAM_BASE_URL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            admin_email: DEFAULT_ADMIN_EMAIL.to_string(),
            repository_name: DEFAULT_REPOSITORY_NAME.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            prefix_policy: PrefixPolicy::Fallback,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            http_timeout_secs: HTTP_TIMEOUT_SECS,
        }
    }
}

/// Parse and check a batch size; zero would make cursor arithmetic meaningless.
pub fn parse_batch_size(raw: &str) -> Result<u64, StartupError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(StartupError::Config(
            "OAI_BATCH_SIZE must be greater than zero".to_string(),
        )),
        Ok(n) => Ok(n),
        Err(_) => Err(StartupError::Config(format!(
            "OAI_BATCH_SIZE '{raw}' is not a positive integer"
        ))),
    }
}

/// URL builders for the sample database XML API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamEndpoints {
    base: String,
}

impl UpstreamEndpoints {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// One page of samples, optionally restricted to a modification date range.
    ///
    /// `page_no` is the upstream's 1-based page number.
    pub fn sample_set_url(
        &self,
        page_no: u64,
        per_page: u64,
        range: Option<(&str, &str)>,
    ) -> Result<Url, url::ParseError> {
        let page_no = page_no.to_string();
        let per_page = per_page.to_string();
        let mut params = vec![
            ("pOrder", "IGSN"),
            ("pPageNo", page_no.as_str()),
            ("pNoOfLinesPerPage", per_page.as_str()),
        ];
        if let Some((from, until)) = range {
            params.push(("pModifiedFromDate", from));
            params.push(("pModifiedToDate", until));
        }
        Url::parse_with_params(
            &format!("{}/a.igsn_api.get_igsnSampleSet", self.base),
            &params,
        )
    }

    /// A single sample by IGSN.
    pub fn sample_url(&self, igsn: &str) -> Result<Url, url::ParseError> {
        Url::parse_with_params(
            &format!("{}/a.igsn_api.get_igsnSample", self.base),
            &[("pIGSN", igsn)],
        )
    }

    /// Earliest modification date over all samples.
    pub fn earliest_date_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!("{}/a.igsn_api.get_Earliest_Date_Modified", self.base))
    }

    /// Number of samples modified within a date range.
    pub fn record_count_url(&self, from: &str, until: &str) -> Result<Url, url::ParseError> {
        Url::parse_with_params(
            &format!("{}/a.igsn_api.get_Number_Modified", self.base),
            &[("pModifiedFromDate", from), ("pModifiedToDate", until)],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = OaiConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.upstream_base_url, DEFAULT_UPSTREAM_BASE_URL);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.prefix_policy, PrefixPolicy::Fallback);
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.http_timeout_secs, HTTP_TIMEOUT_SECS);
    }

    #[test]
    fn test_config_overrides() {
        let config = OaiConfig::from_lookup(lookup_from(&[
            ("OAI_UPSTREAM_BASE_URL", "http://localhost:9000/api"),
            ("OAI_BATCH_SIZE", "250"),
            ("OAI_STRICT_METADATA_PREFIX", "true"),
            ("OAI_BIND_ADDR", "127.0.0.1:5000"),
            ("OAI_ADMIN_EMAIL", "admin@example.org"),
        ]))
        .unwrap();

        assert_eq!(config.upstream_base_url, "http://localhost:9000/api");
        assert_eq!(config.batch_size, 250);
        assert_eq!(config.prefix_policy, PrefixPolicy::Strict);
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:5000");
        assert_eq!(config.admin_email, "admin@example.org");
    }

    #[test]
    fn test_config_rejects_zero_batch_size() {
        let result = OaiConfig::from_lookup(lookup_from(&[("OAI_BATCH_SIZE", "0")]));
        assert!(matches!(result, Err(StartupError::Config(_))));
    }

    #[test]
    fn test_config_rejects_bad_upstream_url() {
        let result = OaiConfig::from_lookup(lookup_from(&[("OAI_UPSTREAM_BASE_URL", "not a url")]));
        assert!(matches!(result, Err(StartupError::Config(_))));
    }

    #[test]
    fn test_config_rejects_bad_timeout() {
        for raw in ["thirty", "0", "-5"] {
            let result = OaiConfig::from_lookup(lookup_from(&[("OAI_HTTP_TIMEOUT_SECS", raw)]));
            assert!(matches!(result, Err(StartupError::Config(_))), "timeout {raw}");
        }
        let config =
            OaiConfig::from_lookup(lookup_from(&[("OAI_HTTP_TIMEOUT_SECS", "5")])).unwrap();
        assert_eq!(config.http_timeout_secs, 5);
    }

    #[test]
    fn test_parse_batch_size() {
        assert_eq!(parse_batch_size("100").unwrap(), 100);
        assert!(parse_batch_size("-1").is_err());
        assert!(parse_batch_size("abc").is_err());
    }

    #[test]
    fn test_sample_set_url_without_range() {
        let endpoints = UpstreamEndpoints::new("http://db.example.org/api/");
        assert_eq!(
            endpoints.sample_set_url(1, 100, None).unwrap().as_str(),
            "http://db.example.org/api/a.igsn_api.get_igsnSampleSet?pOrder=IGSN&pPageNo=1&pNoOfLinesPerPage=100"
        );
    }

    #[test]
    fn test_sample_set_url_with_range() {
        let endpoints = UpstreamEndpoints::new("http://db.example.org/api");
        let url = endpoints
            .sample_set_url(3, 50, Some(("2011-06-01T00:00:00", "2020-01-01T00:00:00")))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://db.example.org/api/a.igsn_api.get_igsnSampleSet?pOrder=IGSN&pPageNo=3&pNoOfLinesPerPage=50\
             &pModifiedFromDate=2011-06-01T00%3A00%3A00&pModifiedToDate=2020-01-01T00%3A00%3A00"
        );
    }

    #[test]
    fn test_sample_url_encodes_identifier() {
        let endpoints = UpstreamEndpoints::new("http://db.example.org/api");
        assert_eq!(
            endpoints.sample_url("AU 240&x").unwrap().as_str(),
            "http://db.example.org/api/a.igsn_api.get_igsnSample?pIGSN=AU+240%26x"
        );
    }

    #[test]
    fn test_count_and_earliest_urls() {
        let endpoints = UpstreamEndpoints::new("http://db.example.org/api");
        assert_eq!(
            endpoints.earliest_date_url().unwrap().as_str(),
            "http://db.example.org/api/a.igsn_api.get_Earliest_Date_Modified"
        );
        assert_eq!(
            endpoints
                .record_count_url("2011-06-01T00:00:00", "2012-01-01T00:00:00")
                .unwrap()
                .as_str(),
            "http://db.example.org/api/a.igsn_api.get_Number_Modified\
             ?pModifiedFromDate=2011-06-01T00%3A00%3A00&pModifiedToDate=2012-01-01T00%3A00%3A00"
        );
    }
}
