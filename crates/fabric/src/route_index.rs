use crate::error::Result;
use crate::source::FabricSource;
use crate::types::{Route, RouteState};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

type CachedRoutes = Arc<OnceCell<Arc<[Route]>>>;

/// Query layer over route tables: forward routes and return-route checks.
///
/// With caching enabled every route table is fetched at most once per index,
/// also when several tasks ask for it at the same time.
pub struct RouteIndex {
    source: Arc<dyn FabricSource>,
    cache: Option<Mutex<HashMap<String, CachedRoutes>>>,
    fetches: AtomicUsize,
}

impl RouteIndex {
    pub fn new(source: Arc<dyn FabricSource>) -> Self {
        Self {
            source,
            cache: Some(Mutex::new(HashMap::new())),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Index that queries the source on every call
    pub fn uncached(source: Arc<dyn FabricSource>) -> Self {
        Self {
            source,
            cache: None,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// Number of route queries sent to the source
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Active and blackhole routes of `route_table_id`, in source order
    pub async fn routes_for(&self, route_table_id: &str) -> Result<Arc<[Route]>> {
        let Some(cache) = &self.cache else {
            return self.fetch(route_table_id).await;
        };

        let cell = {
            let mut tables = cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            tables
                .entry(route_table_id.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        cell.get_or_try_init(|| self.fetch(route_table_id))
            .await
            .cloned()
    }

    /// True iff a route in `candidate_table` targets `source_attachment_id`.
    ///
    /// An absent table means no return route, not an error.
    pub async fn has_return_route(
        &self,
        candidate_table: Option<&str>,
        source_attachment_id: &str,
    ) -> Result<bool> {
        let Some(table) = candidate_table else {
            return Ok(false);
        };
        let routes = self.routes_for(table).await?;
        Ok(routes.iter().any(|route| route.targets(source_attachment_id)))
    }

    async fn fetch(&self, route_table_id: &str) -> Result<Arc<[Route]>> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let raw = self
            .source
            .search_routes(route_table_id, &RouteState::QUERIED)
            .await?;
        let routes: Vec<Route> = raw.iter().filter_map(Route::from_raw).collect();
        log::debug!("Route table {}: {} routes", route_table_id, routes.len());
        Ok(routes.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FabricError;
    use crate::source::SnapshotSource;
    use crate::types::{RawRoute, RawRouteAttachment};

    fn route(cidr: &str, state: &str, target: Option<&str>) -> RawRoute {
        RawRoute {
            destination_cidr_block: Some(cidr.to_string()),
            prefix_list_id: None,
            state: state.to_string(),
            r#type: None,
            transit_gateway_attachments: target
                .map(|id| {
                    vec![RawRouteAttachment {
                        transit_gateway_attachment_id: id.to_string(),
                        resource_id: None,
                        resource_type: None,
                    }]
                })
                .unwrap_or_default(),
        }
    }

    fn source() -> Arc<SnapshotSource> {
        let mut tables = HashMap::new();
        tables.insert(
            "rtb-a".to_string(),
            vec![
                route("10.2.0.0/16", "active", Some("att-b")),
                route("10.3.0.0/16", "deleted", Some("att-c")),
            ],
        );
        tables.insert(
            "rtb-b".to_string(),
            vec![
                route("10.1.0.0/16", "blackhole", Some("att-a")),
                route("0.0.0.0/0", "blackhole", None),
            ],
        );
        Arc::new(SnapshotSource::from_parts(Vec::new(), tables))
    }

    #[tokio::test]
    async fn filters_routes_to_queried_states() {
        let index = RouteIndex::new(source());
        let routes = index.routes_for("rtb-a").await.unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].target.as_deref(), Some("att-b"));
    }

    #[tokio::test]
    async fn return_route_checks() {
        let index = RouteIndex::new(source());
        assert!(index.has_return_route(Some("rtb-b"), "att-a").await.unwrap());
        assert!(!index.has_return_route(Some("rtb-a"), "att-a").await.unwrap());
        assert!(!index.has_return_route(None, "att-a").await.unwrap());
        // filtered-out route does not count as a return route
        assert!(!index.has_return_route(Some("rtb-a"), "att-c").await.unwrap());
    }

    #[tokio::test]
    async fn missing_table_propagates_error() {
        let index = RouteIndex::new(source());
        let err = index.has_return_route(Some("rtb-x"), "att-a").await.unwrap_err();
        assert!(matches!(err, FabricError::RouteTableNotFound(_)));
    }

    #[tokio::test]
    async fn caches_per_route_table() {
        let snapshot = source();
        let index = RouteIndex::new(snapshot.clone());
        for _ in 0..3 {
            index.routes_for("rtb-a").await.unwrap();
            index.has_return_route(Some("rtb-b"), "att-a").await.unwrap();
        }
        assert_eq!(index.fetch_count(), 2);
        assert_eq!(snapshot.route_queries(), 2);

        let uncached = RouteIndex::uncached(snapshot.clone());
        for _ in 0..3 {
            uncached.routes_for("rtb-a").await.unwrap();
        }
        assert_eq!(uncached.fetch_count(), 3);
        assert_eq!(snapshot.route_queries(), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_share_one_fetch() {
        let snapshot = source();
        let index = Arc::new(RouteIndex::new(snapshot.clone()));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let index = index.clone();
            handles.push(tokio::spawn(async move { index.routes_for("rtb-b").await }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().len(), 2);
        }
        assert_eq!(snapshot.route_queries(), 1);
    }
}
