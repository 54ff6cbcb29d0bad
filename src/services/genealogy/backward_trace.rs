use futures::{stream, StreamExt, TryStreamExt};
use metrics::counter;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::cycle_guard::VisitedSet;
use super::resolver::PartLookupResolver;
use crate::dto::{BackwardTraceResult, TracedComponent};
use crate::errors::ServiceError;
use crate::models::GenealogyEdge;
use crate::repositories::GenealogyStore;

/// Edge lookups in flight at once while expanding one level.
pub const DEFAULT_FETCH_CONCURRENCY: usize = 8;

/// Expands consumed-by edges from a unit into a flat, leveled component list.
pub struct BackwardTraceEngine {
    store: Arc<dyn GenealogyStore>,
    resolver: Arc<PartLookupResolver>,
    fetch_concurrency: usize,
}

impl BackwardTraceEngine {
    pub fn new(store: Arc<dyn GenealogyStore>, resolver: Arc<PartLookupResolver>) -> Self {
        Self {
            store,
            resolver,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
        }
    }

    /// Caps concurrent edge lookups per level, typically at the pool size.
    pub fn with_fetch_concurrency(mut self, limit: usize) -> Self {
        self.fetch_concurrency = limit.max(1);
        self
    }

    /// Breadth-first trace. `max_depth` caps the number of levels expanded;
    /// `None` walks until the visited set stops it.
    #[instrument(skip(self))]
    pub async fn trace(
        &self,
        identifier: &str,
        max_depth: Option<u32>,
    ) -> Result<BackwardTraceResult, ServiceError> {
        self.walk(identifier, max_depth).await.map_err(|e| {
            e.with_context(format!(
                "Failed to retrieve backward traceability for identifier \"{}\"",
                identifier
            ))
        })
    }

    async fn walk(
        &self,
        identifier: &str,
        max_depth: Option<u32>,
    ) -> Result<BackwardTraceResult, ServiceError> {
        let root = self.resolver.resolve(identifier).await?;

        let mut visited = VisitedSet::with_root(root.id);
        let mut components = Vec::new();
        let mut frontier: Vec<Uuid> = vec![root.id];
        let mut level: u32 = 0;

        while !frontier.is_empty() && max_depth.map_or(true, |max| level < max) {
            // Fetched concurrently, consumed in frontier order.
            let store = self.store.as_ref();
            let batches: Vec<Vec<GenealogyEdge>> = stream::iter(frontier.iter().copied())
                .map(move |id| store.find_genealogy_edges_by_parent_id(id))
                .buffered(self.fetch_concurrency)
                .try_collect()
                .await?;

            let mut next = Vec::new();
            for edge in batches.into_iter().flatten() {
                let Some(component) = edge.component_part else {
                    warn!(
                        edge_id = %edge.id,
                        component_part_id = %edge.component_part_id,
                        "Genealogy edge references a missing component; dropping branch"
                    );
                    counter!("genealogy.traversal.skipped_edges", 1);
                    continue;
                };

                if !visited.first_visit(component.id) {
                    counter!("genealogy.traversal.skipped_edges", 1);
                    continue;
                }

                next.push(component.id);
                components.push(TracedComponent {
                    serial_number: component.serial_number,
                    part_number: component.part.part_number,
                    part_name: component.part.part_name,
                    lot_number: component.lot_number,
                    supplier: component.supplier,
                    assembly_date: edge.assembly_date,
                    level,
                });
            }

            frontier = next;
            level += 1;
        }

        counter!("genealogy.trace.backward", 1);
        info!(
            serial_number = %root.serial_number,
            total_components = components.len(),
            "Backward trace complete"
        );

        Ok(BackwardTraceResult {
            serial_number: root.serial_number,
            part_number: root.part.part_number,
            part_name: root.part.part_name,
            total_components: components.len(),
            components,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Part, PartType, SerializedPart};
    use crate::models::{NewGenealogyEdge, SerialMatchMode};
    use crate::repositories::{InMemoryGenealogyStore, MockGenealogyStore};
    use assert_matches::assert_matches;
    use sea_orm::DbErr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn unit(serial: &str) -> SerializedPart {
        SerializedPart::new(serial, Part::new(format!("PN-{serial}"), "Node", PartType::Assembly))
    }

    fn engine(store: Arc<dyn GenealogyStore>) -> BackwardTraceEngine {
        let resolver = Arc::new(PartLookupResolver::new(store.clone()));
        BackwardTraceEngine::new(store, resolver)
    }

    /// root -> a -> c, root -> b
    async fn fixture() -> (Arc<InMemoryGenealogyStore>, [SerializedPart; 4]) {
        let store = Arc::new(InMemoryGenealogyStore::new());
        let parts = [unit("ROOT"), unit("A"), unit("B"), unit("C")];
        for p in &parts {
            store.insert_part(p.clone()).await;
        }
        store.insert_edge(parts[0].id, parts[1].id).await;
        store.insert_edge(parts[0].id, parts[2].id).await;
        store.insert_edge(parts[1].id, parts[3].id).await;
        (store, parts)
    }

    #[tokio::test]
    async fn levels_follow_breadth_first_order() {
        let (store, _) = fixture().await;
        let result = engine(store).trace("ROOT", None).await.unwrap();

        let got: Vec<_> = result
            .components
            .iter()
            .map(|c| (c.serial_number.as_str(), c.level))
            .collect();
        assert_eq!(got, vec![("A", 0), ("B", 0), ("C", 1)]);
        assert_eq!(result.total_components, 3);
        assert_eq!(result.part_number, "PN-ROOT");
    }

    #[tokio::test]
    async fn max_depth_limits_levels() {
        let (store, _) = fixture().await;
        let engine = engine(store);

        assert_eq!(engine.trace("ROOT", Some(1)).await.unwrap().total_components, 2);
        assert_eq!(engine.trace("ROOT", Some(0)).await.unwrap().total_components, 0);
    }

    #[tokio::test]
    async fn dangling_component_is_dropped() {
        let (store, parts) = fixture().await;
        store.insert_edge(parts[2].id, Uuid::new_v4()).await;

        let result = engine(store).trace("ROOT", None).await.unwrap();
        assert_eq!(result.total_components, 3);
    }

    #[tokio::test]
    async fn back_edge_to_root_is_ignored() {
        let (store, parts) = fixture().await;
        store.insert_edge(parts[3].id, parts[0].id).await;

        let result = engine(store).trace("ROOT", None).await.unwrap();
        assert_eq!(result.total_components, 3);
        assert!(result.components.iter().all(|c| c.serial_number != "ROOT"));
    }

    #[tokio::test]
    async fn driver_errors_gain_context() {
        let root = unit("ROOT");
        let mut store = MockGenealogyStore::new();
        store
            .expect_find_serialized_part_by_serial_number()
            .returning(move |_| Ok(Some(root.clone())));
        store
            .expect_find_genealogy_edges_by_parent_id()
            .returning(|_| Err(DbErr::Custom("connection reset".into()).into()));

        let err = engine(Arc::new(store)).trace("ROOT", None).await.unwrap_err();
        assert_matches!(
            err,
            ServiceError::StorageError { ref message, source: Some(_) }
                if message.contains("backward traceability") && message.contains("ROOT")
        );
    }

    /// Delegates to the in-memory store and records the peak number of
    /// concurrent edge lookups.
    struct PeakTrackingStore {
        inner: InMemoryGenealogyStore,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl GenealogyStore for PeakTrackingStore {
        async fn find_serialized_part_by_serial_number(
            &self,
            serial_number: &str,
        ) -> Result<Option<SerializedPart>, ServiceError> {
            self.inner.find_serialized_part_by_serial_number(serial_number).await
        }

        async fn find_serialized_parts_by_serial_pattern(
            &self,
            pattern: &str,
            mode: SerialMatchMode,
        ) -> Result<Vec<SerializedPart>, ServiceError> {
            self.inner.find_serialized_parts_by_serial_pattern(pattern, mode).await
        }

        async fn find_serialized_parts_by_lot_number(
            &self,
            lot_number: &str,
        ) -> Result<Vec<SerializedPart>, ServiceError> {
            self.inner.find_serialized_parts_by_lot_number(lot_number).await
        }

        async fn find_genealogy_edges_by_component_lot(
            &self,
            lot_number: &str,
        ) -> Result<Vec<GenealogyEdge>, ServiceError> {
            self.inner.find_genealogy_edges_by_component_lot(lot_number).await
        }

        async fn find_genealogy_edges_by_parent_id(
            &self,
            parent_id: Uuid,
        ) -> Result<Vec<GenealogyEdge>, ServiceError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(2)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.inner.find_genealogy_edges_by_parent_id(parent_id).await
        }

        async fn create_genealogy_edge(
            &self,
            new_edge: NewGenealogyEdge,
        ) -> Result<GenealogyEdge, ServiceError> {
            self.inner.create_genealogy_edge(new_edge).await
        }
    }

    /// ROOT with twelve children C00..C11, each owning one grandchild G00..G11.
    async fn wide_store() -> Arc<PeakTrackingStore> {
        let inner = InMemoryGenealogyStore::new();
        let root = unit("ROOT");
        inner.insert_part(root.clone()).await;
        for i in 0..12 {
            let child = unit(&format!("C{i:02}"));
            let grandchild = unit(&format!("G{i:02}"));
            inner.insert_part(child.clone()).await;
            inner.insert_part(grandchild.clone()).await;
            inner.insert_edge(root.id, child.id).await;
            inner.insert_edge(child.id, grandchild.id).await;
        }
        Arc::new(PeakTrackingStore {
            inner,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn level_fetches_are_bounded_and_keep_frontier_order() {
        let store = wide_store().await;
        let bounded = engine(store.clone()).with_fetch_concurrency(3);
        let result = bounded.trace("ROOT", None).await.unwrap();

        assert_eq!(store.peak.load(Ordering::SeqCst), 3);
        let serials: Vec<_> = result
            .components
            .iter()
            .map(|c| c.serial_number.clone())
            .collect();
        let expected: Vec<_> = (0..12)
            .map(|i| format!("C{i:02}"))
            .chain((0..12).map(|i| format!("G{i:02}")))
            .collect();
        assert_eq!(serials, expected);

        let sequential = engine(store.clone())
            .with_fetch_concurrency(0)
            .trace("ROOT", None)
            .await
            .unwrap();
        assert_eq!(sequential, result);
    }
}
