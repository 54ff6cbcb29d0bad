use metrics::counter;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::cycle_guard::VisitedSet;
use super::resolver::PartLookupResolver;
use crate::dto::{EdgeRelationship, GenealogyGraph, GraphEdge, GraphNode, NodeType};
use crate::errors::ServiceError;
use crate::models::SerializedPart;
use crate::repositories::GenealogyStore;

/// Builds a bounded node/edge view of the genealogy below one unit.
pub struct GenealogyGraphBuilder {
    store: Arc<dyn GenealogyStore>,
    resolver: Arc<PartLookupResolver>,
}

impl GenealogyGraphBuilder {
    pub fn new(store: Arc<dyn GenealogyStore>, resolver: Arc<PartLookupResolver>) -> Self {
        Self { store, resolver }
    }

    /// Depth-first expansion down to `max_depth` levels below the root.
    /// A node's level is fixed by the first path that reaches it.
    #[instrument(skip(self))]
    pub async fn build(
        &self,
        identifier: &str,
        max_depth: u32,
    ) -> Result<GenealogyGraph, ServiceError> {
        self.expand(identifier, max_depth).await.map_err(|e| {
            e.with_context(format!(
                "Failed to build genealogy graph for identifier \"{}\"",
                identifier
            ))
        })
    }

    async fn expand(&self, identifier: &str, max_depth: u32) -> Result<GenealogyGraph, ServiceError> {
        let root = self.resolver.resolve(identifier).await?;
        let root_id = root.id;

        let mut visited = VisitedSet::with_root(root_id);
        let mut nodes = vec![graph_node(root, 0, true)];
        let mut edges = Vec::new();
        let mut deepest = 0;
        let mut stack: Vec<(Uuid, u32)> = vec![(root_id, 0)];

        while let Some((parent_id, level)) = stack.pop() {
            if level >= max_depth {
                continue;
            }

            let mut children = Vec::new();
            for edge in self.store.find_genealogy_edges_by_parent_id(parent_id).await? {
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

                let child_level = level + 1;
                deepest = deepest.max(child_level);
                edges.push(GraphEdge {
                    id: edge.id,
                    source: parent_id,
                    target: component.id,
                    relationship: EdgeRelationship::Contains,
                    assembly_date: edge.assembly_date,
                    assembly_operator: edge.assembly_operator,
                });
                children.push((component.id, child_level));
                nodes.push(graph_node(component, child_level, false));
            }

            // First child on top of the stack.
            stack.extend(children.into_iter().rev());
        }

        counter!("genealogy.graph.built", 1);
        info!(
            %root_id,
            nodes = nodes.len(),
            edges = edges.len(),
            max_depth = deepest,
            "Genealogy graph built"
        );

        Ok(GenealogyGraph {
            nodes,
            edges,
            root_node_id: root_id,
            max_depth: deepest,
        })
    }
}

fn graph_node(part: SerializedPart, level: u32, is_root: bool) -> GraphNode {
    GraphNode {
        id: part.id,
        node_type: NodeType::classify(&part.part.part_type, is_root),
        serial_number: part.serial_number,
        part_number: part.part.part_number,
        part_name: part.part.part_name,
        part_type: part.part.part_type,
        lot_number: part.lot_number,
        status: part.status,
        level,
    }
}
