use crate::error::{MatrixError, Result};
use crate::grid::{Cell, PrefixVerdict, Reachability, ReachabilityGrid, Row, RowState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tgw_fabric::{Attachment, AttachmentCatalog, FabricError, Route, RouteIndex, RouteState};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub const MAX_CONCURRENCY: usize = 32;
pub const DEFAULT_CONCURRENCY: usize = 4;

/// What a failed route query does to the matrix
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Fail the whole run
    #[default]
    Abort,

    /// Mark the affected row or cell unknown and keep going
    Degrade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifierConfig {
    /// Rows classified at the same time
    pub concurrency: usize,
    pub failure_policy: FailurePolicy,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            failure_policy: FailurePolicy::Abort,
        }
    }
}

/// Verdict for one forward route toward a destination whose return check gave `has_return`
pub fn prefix_reachability(state: RouteState, has_return: bool) -> Reachability {
    match (has_return, state) {
        (false, _) => Reachability::Oneway,
        (true, RouteState::Active) => Reachability::Active,
        (true, RouteState::Blackhole) => Reachability::Blackhole,
    }
}

/// Fold per-prefix verdicts into one cell verdict.
///
/// Applied as successive overrides: active, then blackhole, then oneway.
/// Any oneway prefix wins, otherwise any blackhole, otherwise active.
pub fn aggregate<I>(verdicts: I) -> Option<Reachability>
where
    I: IntoIterator<Item = Reachability>,
{
    let (mut active, mut blackhole, mut oneway) = (false, false, false);
    for verdict in verdicts {
        match verdict {
            Reachability::Active => active = true,
            Reachability::Blackhole => blackhole = true,
            Reachability::Oneway => oneway = true,
        }
    }

    let mut cell = None;
    if active {
        cell = Some(Reachability::Active);
    }
    if blackhole {
        cell = Some(Reachability::Blackhole);
    }
    if oneway {
        cell = Some(Reachability::Oneway);
    }
    cell
}

/// Classifies every ordered pair of attachments
pub struct ReachabilityClassifier {
    index: Arc<RouteIndex>,
    config: ClassifierConfig,
}

impl ReachabilityClassifier {
    pub fn new(index: Arc<RouteIndex>, config: ClassifierConfig) -> Self {
        Self { index, config }
    }

    pub fn index(&self) -> &RouteIndex {
        &self.index
    }

    /// Build the full grid. Rows are classified concurrently, placed by catalog position.
    pub async fn classify(&self, catalog: &AttachmentCatalog) -> Result<ReachabilityGrid> {
        let attachments: Arc<[Attachment]> = catalog.attachments().into();
        let total = attachments.len();
        let concurrency = self.config.concurrency.clamp(1, MAX_CONCURRENCY);
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let policy = self.config.failure_policy;

        log::info!(
            "Classifying {} attachments ({} pairs, concurrency {})",
            total,
            total * total,
            concurrency
        );

        let mut join = JoinSet::new();
        for position in 0..total {
            let index = self.index.clone();
            let attachments = attachments.clone();
            let semaphore = semaphore.clone();
            join.spawn(async move {
                let result = async {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|err| MatrixError::Task(err.to_string()))?;
                    classify_row(&index, &attachments, position, policy).await
                }
                .await;
                (position, result)
            });
        }

        let mut rows: Vec<Option<Row>> = (0..total).map(|_| None).collect();
        let mut done = 0;
        while let Some(joined) = join.join_next().await {
            let (position, result) = joined.map_err(|err| MatrixError::Task(err.to_string()))?;
            rows[position] = Some(result?);
            done += 1;
            log::debug!(
                "Processed attachment {} of {} ({})",
                done,
                total,
                attachments[position].id
            );
        }

        let rows = rows
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| MatrixError::Task("row was not classified".to_string()))?;
        let ids = attachments.iter().map(|att| att.id.clone()).collect();
        Ok(ReachabilityGrid::new(ids, rows))
    }
}

/// No destination to check a return route against
fn dangling_verdict(route: &Route) -> PrefixVerdict {
    PrefixVerdict {
        prefix: route.destination.clone(),
        reachability: Reachability::Blackhole,
    }
}

fn degrade_or_abort(policy: FailurePolicy, err: FabricError) -> Result<String> {
    match policy {
        FailurePolicy::Abort => Err(err.into()),
        FailurePolicy::Degrade => Ok(err.to_string()),
    }
}

/// Classify one source attachment against every destination
pub(crate) async fn classify_row(
    index: &RouteIndex,
    attachments: &[Attachment],
    position: usize,
    policy: FailurePolicy,
) -> Result<Row> {
    let source = attachments
        .get(position)
        .ok_or_else(|| MatrixError::Task(format!("no attachment at position {position}")))?;
    let diagonal_or = |cell: Cell| {
        (0..attachments.len())
            .map(|dst| if dst == position { Cell::SelfRoute } else { cell.clone() })
            .collect::<Vec<_>>()
    };

    let Some(table) = source.route_table_id.as_deref() else {
        return Ok(Row {
            attachment_id: source.id.clone(),
            state: RowState::NoRouteTable,
            cells: diagonal_or(Cell::Empty),
            dangling: Vec::new(),
        });
    };

    let routes = match index.routes_for(table).await {
        Ok(routes) => routes,
        Err(err) => {
            let reason = degrade_or_abort(policy, err)?;
            log::warn!("Row {} unknown: {}", source.id, reason);
            return Ok(Row {
                attachment_id: source.id.clone(),
                state: RowState::Unknown {
                    route_table_id: table.to_string(),
                    reason: reason.clone(),
                },
                cells: diagonal_or(Cell::Unknown { reason }),
                dangling: Vec::new(),
            });
        }
    };

    let dangling = routes
        .iter()
        .filter(|route| route.is_dangling())
        .map(dangling_verdict)
        .collect();

    let mut cells = Vec::with_capacity(attachments.len());
    for (dst, destination) in attachments.iter().enumerate() {
        if dst == position {
            cells.push(Cell::SelfRoute);
            continue;
        }
        cells.push(classify_cell(index, source, destination, &routes, policy).await?);
    }

    Ok(Row {
        attachment_id: source.id.clone(),
        state: RowState::RouteTable {
            id: table.to_string(),
        },
        cells,
        dangling,
    })
}

async fn classify_cell(
    index: &RouteIndex,
    source: &Attachment,
    destination: &Attachment,
    routes: &[Route],
    policy: FailurePolicy,
) -> Result<Cell> {
    if !routes.iter().any(|route| route.targets(&destination.id)) {
        return Ok(Cell::Empty);
    }

    // Same answer for every candidate prefix of this pair
    let has_return = match index
        .has_return_route(destination.route_table_id.as_deref(), &source.id)
        .await
    {
        Ok(found) => found,
        Err(err) => {
            let reason = degrade_or_abort(policy, err)?;
            log::warn!("Cell {} -> {} unknown: {reason}", source.id, destination.id);
            return Ok(Cell::Unknown { reason });
        }
    };

    // Dangling routes count against every routed destination, in route table order
    let prefixes: Vec<PrefixVerdict> = routes
        .iter()
        .filter_map(|route| {
            if route.is_dangling() {
                Some(dangling_verdict(route))
            } else if route.targets(&destination.id) {
                Some(PrefixVerdict {
                    prefix: route.destination.clone(),
                    reachability: prefix_reachability(route.state, has_return),
                })
            } else {
                None
            }
        })
        .collect();

    Ok(
        match aggregate(prefixes.iter().map(|verdict| verdict.reachability)) {
            Some(reachability) => Cell::Routed {
                reachability,
                prefixes,
            },
            None => Cell::Empty,
        },
    )
}
