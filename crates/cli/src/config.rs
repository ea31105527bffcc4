use anyhow::{anyhow, Context, Result};
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tgw_fabric::NamePolicy;
use tgw_matrix::{FailurePolicy, DEFAULT_CONCURRENCY, MAX_CONCURRENCY};

pub const CONCURRENCY_ENV: &str = "TGW_MATRIX_CONCURRENCY";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Query EC2 through the aws CLI
    #[default]
    Aws,

    /// Read JSON documents from a snapshot directory
    Snapshot,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Html,
    Json,
}

fn parse_concurrency(raw: Option<&str>, default_value: usize) -> usize {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default_value)
        .clamp(1, MAX_CONCURRENCY)
}

fn default_concurrency() -> usize {
    let raw = std::env::var(CONCURRENCY_ENV).ok();
    parse_concurrency(raw.as_deref(), DEFAULT_CONCURRENCY)
}

/// Settings for one matrix run. Loaded from TOML, then overridden by flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatrixConfig {
    pub source: SourceKind,
    pub snapshot_dir: Option<PathBuf>,

    pub aws_program: PathBuf,
    pub region: Option<String>,
    pub profile: Option<String>,
    pub transit_gateway_id: Option<String>,
    pub max_attempts: u32,

    pub alias_file: PathBuf,
    pub output: PathBuf,
    pub format: OutputFormat,

    pub concurrency: usize,
    pub cache: bool,
    pub failure_policy: FailurePolicy,
    pub name_policy: NamePolicy,

    /// Embed the generation time in the document
    pub timestamp: bool,

    /// Write a default style.css next to an HTML document when missing
    pub stylesheet: bool,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Aws,
            snapshot_dir: None,
            aws_program: PathBuf::from("aws"),
            region: None,
            profile: None,
            transit_gateway_id: None,
            max_attempts: 10,
            alias_file: PathBuf::from("alias.json"),
            output: PathBuf::from("transit.html"),
            format: OutputFormat::Html,
            concurrency: default_concurrency(),
            cache: true,
            failure_policy: FailurePolicy::Abort,
            name_policy: NamePolicy::FallbackToId,
            timestamp: true,
            stylesheet: true,
        }
    }
}

impl MatrixConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.source == SourceKind::Snapshot && self.snapshot_dir.is_none() {
            return Err(anyhow!("snapshot source requires snapshot_dir"));
        }
        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return Err(anyhow!(
                "concurrency {} is out of range (1..={})",
                self.concurrency,
                MAX_CONCURRENCY
            ));
        }
        if self.max_attempts == 0 {
            return Err(anyhow!("max_attempts must be > 0"));
        }
        Ok(())
    }
}

/// Command-line overrides for [`MatrixConfig`]
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigOverrides {
    /// Where attachments and routes come from (default: aws)
    #[arg(long, value_enum)]
    pub source: Option<SourceKind>,

    /// Snapshot directory (implies --source snapshot)
    #[arg(long)]
    pub snapshot_dir: Option<PathBuf>,

    /// AWS region passed to the aws CLI
    #[arg(long)]
    pub region: Option<String>,

    /// AWS profile passed to the aws CLI
    #[arg(long)]
    pub profile: Option<String>,

    /// Only include attachments of this transit gateway
    #[arg(long)]
    pub transit_gateway_id: Option<String>,

    /// Alias file mapping attachment names to friendly names (JSON or TOML)
    #[arg(long)]
    pub alias: Option<PathBuf>,

    /// Output document path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Attachments classified at the same time
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Query route tables every time instead of once per run
    #[arg(long)]
    pub no_cache: bool,

    /// Mark failed queries as unknown instead of failing the run
    #[arg(long)]
    pub degrade: bool,

    /// Fail when an attachment has no Name tag
    #[arg(long)]
    pub strict_names: bool,

    /// Leave the generation time out of the document
    #[arg(long)]
    pub no_timestamp: bool,

    /// Do not write a default style.css
    #[arg(long)]
    pub no_stylesheet: bool,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut MatrixConfig) {
        if let Some(dir) = &self.snapshot_dir {
            config.snapshot_dir = Some(dir.clone());
            config.source = SourceKind::Snapshot;
        }
        if let Some(source) = self.source {
            config.source = source;
        }
        if let Some(region) = &self.region {
            config.region = Some(region.clone());
        }
        if let Some(profile) = &self.profile {
            config.profile = Some(profile.clone());
        }
        if let Some(tgw) = &self.transit_gateway_id {
            config.transit_gateway_id = Some(tgw.clone());
        }
        if let Some(alias) = &self.alias {
            config.alias_file = alias.clone();
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if self.no_cache {
            config.cache = false;
        }
        if self.degrade {
            config.failure_policy = FailurePolicy::Degrade;
        }
        if self.strict_names {
            config.name_policy = NamePolicy::Strict;
        }
        if self.no_timestamp {
            config.timestamp = false;
        }
        if self.no_stylesheet {
            config.stylesheet = false;
        }
    }
}
