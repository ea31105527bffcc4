use crate::config::{MatrixConfig, OutputFormat, SourceKind};
use crate::report;
use anyhow::{anyhow, Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tgw_fabric::{
    AliasMap, AttachmentCatalog, AwsCliConfig, AwsCliSource, FabricSource, RouteIndex,
    SnapshotSource,
};
use tgw_matrix::{ClassifierConfig, GridStats, ReachabilityClassifier};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub attachments: usize,
    pub route_queries: usize,
    pub stats: GridStats,
    pub output: PathBuf,
    pub stylesheet: Option<PathBuf>,
}

pub async fn open_source(config: &MatrixConfig) -> Result<Arc<dyn FabricSource>> {
    let source: Arc<dyn FabricSource> = match config.source {
        SourceKind::Aws => Arc::new(AwsCliSource::new(AwsCliConfig {
            program: config.aws_program.clone(),
            region: config.region.clone(),
            profile: config.profile.clone(),
            transit_gateway_id: config.transit_gateway_id.clone(),
            max_attempts: config.max_attempts,
        })),
        SourceKind::Snapshot => {
            let dir = config
                .snapshot_dir
                .as_deref()
                .ok_or_else(|| anyhow!("snapshot source requires snapshot_dir"))?;
            let snapshot = SnapshotSource::load(dir)
                .await
                .with_context(|| format!("Failed to load snapshot {}", dir.display()))?;
            Arc::new(snapshot)
        }
    };
    Ok(source)
}

pub async fn run(config: &MatrixConfig) -> Result<RunSummary> {
    let source = open_source(config).await?;
    run_with_source(config, source).await
}

/// Fetch, classify, render and write. Nothing is written unless every step succeeds.
pub async fn run_with_source(
    config: &MatrixConfig,
    source: Arc<dyn FabricSource>,
) -> Result<RunSummary> {
    let aliases = AliasMap::load(&config.alias_file)
        .with_context(|| format!("Failed to load aliases {}", config.alias_file.display()))?;

    let raw = source
        .describe_attachments()
        .await
        .context("Failed to describe transit gateway attachments")?;
    let catalog = AttachmentCatalog::build(&raw, &aliases, config.name_policy)?;
    log::info!("Found {} attachments", catalog.len());

    let index = Arc::new(if config.cache {
        RouteIndex::new(source)
    } else {
        RouteIndex::uncached(source)
    });
    let classifier = ReachabilityClassifier::new(
        index.clone(),
        ClassifierConfig {
            concurrency: config.concurrency,
            failure_policy: config.failure_policy,
        },
    );
    let grid = classifier
        .classify(&catalog)
        .await
        .context("Failed to classify attachment reachability")?;

    let generated_at = config
        .timestamp
        .then(|| chrono::Local::now().format("%d-%m-%Y %H:%M:%S").to_string());
    let document = match config.format {
        OutputFormat::Html => report::render_html(&catalog, &grid, generated_at.as_deref()),
        OutputFormat::Json => report::render_json(&catalog, &grid, generated_at.as_deref())?,
    };

    write_atomically(&config.output, document.as_bytes())?;
    let stylesheet = if config.format == OutputFormat::Html && config.stylesheet {
        write_default_stylesheet(&config.output)?
    } else {
        None
    };

    let stats = grid.stats();
    log::info!(
        "Matrix written to {}: {} active, {} blackhole, {} oneway, {} unknown",
        config.output.display(),
        stats.active,
        stats.blackhole,
        stats.oneway,
        stats.unknown
    );

    Ok(RunSummary {
        attachments: catalog.len(),
        route_queries: index.fetch_count(),
        stats,
        output: config.output.clone(),
        stylesheet,
    })
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Write through a temp file in the destination directory, then rename over `path`
pub fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = parent_dir(path);
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Cannot create output dir {}", dir.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Cannot create temp file in {}", dir.display()))?;
    tmp.write_all(contents)?;
    tmp.flush()?;
    tmp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("Cannot write {}", path.display()))?;
    Ok(())
}

/// Write style.css next to `document` unless one is already there
fn write_default_stylesheet(document: &Path) -> Result<Option<PathBuf>> {
    let path = parent_dir(document).join("style.css");
    if path.exists() {
        return Ok(None);
    }
    write_atomically(&path, report::DEFAULT_STYLESHEET.as_bytes())?;
    log::debug!("Wrote default stylesheet {}", path.display());
    Ok(Some(path))
}
