//! Command-line interface for the OAI-PMH endpoint.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use console::style;
use serde::Serialize;

use crate::config::{parse_batch_size, OaiConfig};
use crate::crosswalk::PrefixPolicy;
use crate::error::{OaiError, StartupError};
use crate::server;
use crate::service::OaiService;
use crate::token::{self, ResumptionToken};
use crate::upstream::UpstreamClient;

/// Samples OAI-PMH - Serve the physical samples database over OAI-PMH.
#[derive(Parser)]
#[command(name = "samples-oai")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP endpoint.
    Serve {
        /// Listen address (default: OAI_BIND_ADDR or 0.0.0.0:8080)
        #[arg(short, long)]
        bind: Option<SocketAddr>,

        /// Records per harvest page (default: OAI_BATCH_SIZE or 100)
        #[arg(long, value_parser = parse_batch_size_arg)]
        batch_size: Option<u64>,

        /// Base URL of the sample database API
        #[arg(long)]
        upstream: Option<String>,

        /// Reject unknown metadata prefixes instead of serving oai_dc
        #[arg(long)]
        strict: bool,
    },

    /// Decode a resumption token and print its fields.
    InspectToken {
        /// The token as issued in a list response
        token: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,

        /// Page size to check the cursor against (default: OAI_BATCH_SIZE or 100)
        #[arg(long, value_parser = parse_batch_size_arg)]
        batch_size: Option<u64>,
    },
}

fn parse_batch_size_arg(raw: &str) -> std::result::Result<u64, String> {
    parse_batch_size(raw).map_err(|e| e.to_string())
}

/// Run the CLI.
pub fn run() -> Result<(), StartupError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            batch_size,
            upstream,
            strict,
        } => {
            let config =
                apply_overrides(OaiConfig::from_env()?, bind, batch_size, upstream, strict);
            serve_command(config)
        }
        Commands::InspectToken {
            token,
            json,
            batch_size,
        } => {
            let batch_size = match batch_size {
                Some(size) => size,
                None => OaiConfig::from_env()?.batch_size,
            };
            inspect_token_command(&token, json, batch_size)
        }
    }
}

fn apply_overrides(
    mut config: OaiConfig,
    bind: Option<SocketAddr>,
    batch_size: Option<u64>,
    upstream: Option<String>,
    strict: bool,
) -> OaiConfig {
    if let Some(addr) = bind {
        config = config.with_bind_addr(addr);
    }
    if let Some(size) = batch_size {
        config = config.with_batch_size(size);
    }
    if let Some(url) = upstream {
        config.upstream_base_url = url;
    }
    if strict {
        config = config.with_prefix_policy(PrefixPolicy::Strict);
    }
    config
}

/// Execute the serve command.
fn serve_command(config: OaiConfig) -> Result<(), StartupError> {
    url::Url::parse(&config.upstream_base_url).map_err(|e| {
        StartupError::Config(format!(
            "upstream URL '{}' is not valid: {e}",
            config.upstream_base_url
        ))
    })?;

    println!(
        "{} {} on {}",
        style("Serving").bold(),
        style(&config.repository_name).cyan(),
        style(config.bind_addr).green()
    );
    println!("  Upstream: {}", config.upstream_base_url);
    println!("  Batch size: {}", config.batch_size);
    if config.prefix_policy == PrefixPolicy::Strict {
        println!("  Metadata prefixes: {}", style("strict").yellow().bold());
    }
    println!();

    // The blocking client owns a runtime of its own; build it before ours.
    let source = UpstreamClient::from_config(&config)?;
    let addr = config.bind_addr;
    let service = Arc::new(OaiService::new(config, source));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(server::serve(service, addr))
}

/// Token fields as printed by `inspect-token`.
#[derive(Debug, Serialize)]
struct TokenReport {
    #[serde(flatten)]
    token: ResumptionToken,
    batch_size: u64,
    /// 1-based page the token resumes at.
    page: u64,
    aligned: bool,
}

impl TokenReport {
    fn new(token: ResumptionToken, batch_size: u64) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            page: token.cursor / batch_size + 1,
            aligned: token.cursor % batch_size == 0,
            batch_size,
            token,
        }
    }
}

/// Execute the inspect-token command.
fn inspect_token_command(raw: &str, json: bool, batch_size: u64) -> Result<(), StartupError> {
    let report = TokenReport::new(token::decode(raw)?, batch_size);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{} {}", style("Token").bold(), style(raw).cyan());
        println!("  From: {}", style(report.token.from).green());
        println!("  Until: {}", style(report.token.until).green());
        println!("  Cursor: {}", report.token.cursor);
        println!("  Metadata prefix: {}", report.token.metadata_prefix);
        println!("  Page: {} (batch size {})", report.page, report.batch_size);
    }

    if !report.aligned {
        return Err(OaiError::BadResumptionToken(format!(
            "cursor {} is not a multiple of the batch size {}",
            report.token.cursor, report.batch_size
        ))
        .into());
    }
    Ok(())
}
