use crate::error::{FabricError, Result};
use crate::types::{
    DescribeAttachmentsOutput, RawAttachment, RawRoute, RouteState, SearchRoutesOutput,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::process::Command;

pub const ATTACHMENTS_FILE: &str = "attachments.json";
pub const ROUTE_TABLES_DIR: &str = "route-tables";

/// Read-only access to a transit gateway's attachments and route tables
#[async_trait]
pub trait FabricSource: Send + Sync {
    /// All attachments, queried once per run
    async fn describe_attachments(&self) -> Result<Vec<RawAttachment>>;

    /// Routes of one route table whose state is in `states`
    async fn search_routes(
        &self,
        route_table_id: &str,
        states: &[RouteState],
    ) -> Result<Vec<RawRoute>>;
}

fn state_matches(raw: &RawRoute, states: &[RouteState]) -> bool {
    RouteState::parse(&raw.state).is_some_and(|state| states.contains(&state))
}

/// Source backed by JSON documents in the shape the EC2 API returns them.
///
/// Directory layout:
///
/// ```text
/// <dir>/attachments.json            describe-transit-gateway-attachments output
/// <dir>/route-tables/<rtb-id>.json  search-transit-gateway-routes output
/// ```
#[derive(Debug, Default)]
pub struct SnapshotSource {
    attachments: Vec<RawAttachment>,
    route_tables: HashMap<String, Vec<RawRoute>>,
    route_queries: AtomicUsize,
}

impl SnapshotSource {
    pub fn from_parts(
        attachments: Vec<RawAttachment>,
        route_tables: HashMap<String, Vec<RawRoute>>,
    ) -> Self {
        Self {
            attachments,
            route_tables,
            route_queries: AtomicUsize::new(0),
        }
    }

    pub async fn load(dir: &Path) -> Result<Self> {
        let attachments_path = dir.join(ATTACHMENTS_FILE);
        let bytes = tokio::fs::read(&attachments_path).await.map_err(|err| {
            FabricError::query(
                "read attachments",
                format!("{}: {}", attachments_path.display(), err),
            )
        })?;
        let described: DescribeAttachmentsOutput = serde_json::from_slice(&bytes)?;

        let mut route_tables = HashMap::new();
        let tables_dir = dir.join(ROUTE_TABLES_DIR);
        if tables_dir.is_dir() {
            let mut entries = tokio::fs::read_dir(&tables_dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                    continue;
                }
                let Some(table_id) = path.file_stem().and_then(|stem| stem.to_str()) else {
                    continue;
                };
                let bytes = tokio::fs::read(&path).await?;
                let searched: SearchRoutesOutput = serde_json::from_slice(&bytes)?;
                route_tables.insert(table_id.to_string(), searched.routes);
            }
        }

        log::debug!(
            "Loaded snapshot {}: {} attachments, {} route tables",
            dir.display(),
            described.transit_gateway_attachments.len(),
            route_tables.len()
        );

        Ok(Self::from_parts(
            described.transit_gateway_attachments,
            route_tables,
        ))
    }

    /// Number of `search_routes` calls served so far
    pub fn route_queries(&self) -> usize {
        self.route_queries.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl FabricSource for SnapshotSource {
    async fn describe_attachments(&self) -> Result<Vec<RawAttachment>> {
        Ok(self.attachments.clone())
    }

    async fn search_routes(
        &self,
        route_table_id: &str,
        states: &[RouteState],
    ) -> Result<Vec<RawRoute>> {
        self.route_queries.fetch_add(1, Ordering::Relaxed);
        let routes = self
            .route_tables
            .get(route_table_id)
            .ok_or_else(|| FabricError::RouteTableNotFound(route_table_id.to_string()))?;

        Ok(routes
            .iter()
            .filter(|route| state_matches(route, states))
            .cloned()
            .collect())
    }
}

#[derive(Debug, Clone)]
pub struct AwsCliConfig {
    /// Path or name of the `aws` executable
    pub program: PathBuf,
    pub region: Option<String>,
    pub profile: Option<String>,

    /// Restrict attachments to a single transit gateway
    pub transit_gateway_id: Option<String>,

    /// Exported as `AWS_MAX_ATTEMPTS`
    pub max_attempts: u32,
}

impl Default for AwsCliConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("aws"),
            region: None,
            profile: None,
            transit_gateway_id: None,
            max_attempts: 10,
        }
    }
}

/// Source that shells out to the AWS CLI (`aws ec2 ...`)
#[derive(Debug, Clone, Default)]
pub struct AwsCliSource {
    config: AwsCliConfig,
}

impl AwsCliSource {
    pub fn new(config: AwsCliConfig) -> Self {
        Self { config }
    }

    async fn run_ec2(&self, operation: &str, args: &[String]) -> Result<Vec<u8>> {
        let mut cmd = Command::new(&self.config.program);
        cmd.arg("ec2")
            .arg(operation)
            .args(args)
            .arg("--output")
            .arg("json");
        if let Some(region) = &self.config.region {
            cmd.arg("--region").arg(region);
        }
        if let Some(profile) = &self.config.profile {
            cmd.arg("--profile").arg(profile);
        }
        cmd.env("AWS_MAX_ATTEMPTS", self.config.max_attempts.to_string());
        cmd.kill_on_drop(true);

        log::debug!("aws ec2 {} {}", operation, args.join(" "));
        let output = cmd.output().await.map_err(|err| {
            FabricError::query(
                operation,
                format!("cannot run {}: {}", self.config.program.display(), err),
            )
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FabricError::query(
                operation,
                format!("{} ({})", stderr.trim(), output.status),
            ));
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl FabricSource for AwsCliSource {
    async fn describe_attachments(&self) -> Result<Vec<RawAttachment>> {
        let mut args = Vec::new();
        if let Some(tgw) = &self.config.transit_gateway_id {
            args.push("--filters".to_string());
            args.push(format!("Name=transit-gateway-id,Values={tgw}"));
        }
        let stdout = self
            .run_ec2("describe-transit-gateway-attachments", &args)
            .await?;
        let described: DescribeAttachmentsOutput = serde_json::from_slice(&stdout)?;
        Ok(described.transit_gateway_attachments)
    }

    async fn search_routes(
        &self,
        route_table_id: &str,
        states: &[RouteState],
    ) -> Result<Vec<RawRoute>> {
        let values = states
            .iter()
            .map(|state| state.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let args = vec![
            "--transit-gateway-route-table-id".to_string(),
            route_table_id.to_string(),
            "--filters".to_string(),
            format!("Name=state,Values={values}"),
        ];
        let stdout = self.run_ec2("search-transit-gateway-routes", &args).await?;
        let searched: SearchRoutesOutput = serde_json::from_slice(&stdout)?;
        if searched.additional_routes_available {
            log::warn!(
                "Route table {} has more routes than one search returns; the matrix may be incomplete",
                route_table_id
            );
        }
        Ok(searched
            .routes
            .into_iter()
            .filter(|route| state_matches(route, states))
            .collect())
    }
}
