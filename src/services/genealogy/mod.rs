//! Genealogy and traceability engine.
//!
//! [`GenealogyService`] wires one instance of each component over a shared
//! [`GenealogyStore`]: identifier resolution, forward and backward traces,
//! bounded graph building and acyclic edge writes.

pub mod backward_trace;
pub mod cycle_guard;
pub mod forward_trace;
pub mod graph_builder;
pub mod relationship_writer;
pub mod resolver;

use std::sync::Arc;
use tracing::{instrument, warn};

use crate::dto::{BackwardTraceResult, CreateGenealogyRequest, ForwardTraceResult, GenealogyGraph};
use crate::errors::ServiceError;
use crate::models::GenealogyEdge;
use crate::repositories::GenealogyStore;

pub use backward_trace::{BackwardTraceEngine, DEFAULT_FETCH_CONCURRENCY};
pub use cycle_guard::{CircularReferenceGuard, VisitedSet};
pub use forward_trace::ForwardTraceEngine;
pub use graph_builder::GenealogyGraphBuilder;
pub use relationship_writer::GenealogyRelationshipWriter;
pub use resolver::{ExactSerialMatch, LookupStrategy, PartLookupResolver, SerialPatternMatch};

pub const DEFAULT_GRAPH_DEPTH: u32 = 5;
pub const DEFAULT_MAX_GRAPH_DEPTH: u32 = 25;

pub struct GenealogyService {
    resolver: Arc<PartLookupResolver>,
    guard: Arc<CircularReferenceGuard>,
    backward: BackwardTraceEngine,
    forward: ForwardTraceEngine,
    graph: GenealogyGraphBuilder,
    writer: GenealogyRelationshipWriter,
    default_graph_depth: u32,
    max_graph_depth: u32,
}

impl GenealogyService {
    pub fn new(store: Arc<dyn GenealogyStore>) -> Self {
        let resolver = Arc::new(PartLookupResolver::new(store.clone()));
        Self::with_resolver(store, resolver)
    }

    /// Builds the service around a caller-supplied resolver, e.g. one with a
    /// custom strategy chain.
    pub fn with_resolver(store: Arc<dyn GenealogyStore>, resolver: Arc<PartLookupResolver>) -> Self {
        let guard = Arc::new(CircularReferenceGuard::new(store.clone()));
        Self {
            backward: BackwardTraceEngine::new(store.clone(), resolver.clone()),
            forward: ForwardTraceEngine::new(store.clone()),
            graph: GenealogyGraphBuilder::new(store.clone(), resolver.clone()),
            writer: GenealogyRelationshipWriter::new(store, resolver.clone(), guard.clone()),
            resolver,
            guard,
            default_graph_depth: DEFAULT_GRAPH_DEPTH,
            max_graph_depth: DEFAULT_MAX_GRAPH_DEPTH,
        }
    }

    /// Overrides the graph depth used when none is requested and the ceiling
    /// requested depths are clamped to.
    pub fn with_graph_depths(mut self, default_depth: u32, max_depth: u32) -> Self {
        self.max_graph_depth = max_depth;
        self.default_graph_depth = default_depth.min(max_depth);
        self
    }

    /// Bounds concurrent edge lookups during backward traces.
    pub fn with_fetch_concurrency(mut self, limit: usize) -> Self {
        self.backward = self.backward.with_fetch_concurrency(limit);
        self
    }

    pub fn effective_graph_depth(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_graph_depth)
            .min(self.max_graph_depth)
    }

    pub async fn get_forward_traceability(
        &self,
        lot_number: &str,
    ) -> Result<ForwardTraceResult, ServiceError> {
        self.forward.trace(lot_number).await
    }

    pub async fn get_backward_traceability(
        &self,
        identifier: &str,
        max_depth: Option<u32>,
    ) -> Result<BackwardTraceResult, ServiceError> {
        self.backward.trace(identifier, max_depth).await
    }

    pub async fn get_genealogy_graph(
        &self,
        identifier: &str,
        max_depth: Option<u32>,
    ) -> Result<GenealogyGraph, ServiceError> {
        let depth = self.effective_graph_depth(max_depth);
        self.graph.build(identifier, depth).await
    }

    pub async fn create_genealogy_relationship(
        &self,
        request: CreateGenealogyRequest,
    ) -> Result<GenealogyEdge, ServiceError> {
        self.writer
            .create(
                &request.parent_identifier,
                &request.component_identifier,
                request.assembly_date,
                request.assembly_operator,
            )
            .await
    }

    /// Whether the genealogy below `identifier` contains a loop. Lookup and
    /// storage failures are logged and reported as `false`.
    #[instrument(skip(self))]
    pub async fn detect_circular_references(&self, identifier: &str) -> bool {
        let root = match self.resolver.resolve(identifier).await {
            Ok(root) => root,
            Err(e) => {
                warn!(identifier, error = %e, "Circular reference check could not resolve part");
                return false;
            }
        };

        match self.guard.has_cycle(root.id).await {
            Ok(found) => found,
            Err(e) => {
                warn!(identifier, error = %e, "Circular reference check failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{InMemoryGenealogyStore, MockGenealogyStore};
    use sea_orm::DbErr;

    #[test]
    fn requested_graph_depth_is_clamped() {
        let service = GenealogyService::new(Arc::new(InMemoryGenealogyStore::new()))
            .with_graph_depths(3, 10);
        assert_eq!(service.effective_graph_depth(None), 3);
        assert_eq!(service.effective_graph_depth(Some(7)), 7);
        assert_eq!(service.effective_graph_depth(Some(500)), 10);
        assert_eq!(service.effective_graph_depth(Some(0)), 0);
    }

    #[tokio::test]
    async fn circular_check_swallows_errors() {
        let mut store = MockGenealogyStore::new();
        store
            .expect_find_serialized_part_by_serial_number()
            .returning(|_| Err(DbErr::Custom("down".into()).into()));

        let service = GenealogyService::new(Arc::new(store));
        assert!(!service.detect_circular_references("SN-1").await);
    }

    #[tokio::test]
    async fn circular_check_of_unknown_part_is_false() {
        let service = GenealogyService::new(Arc::new(InMemoryGenealogyStore::new()));
        assert!(!service.detect_circular_references("SN-404").await);
    }
}
