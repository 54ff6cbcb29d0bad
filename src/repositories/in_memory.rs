use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::{GenealogyEdge, NewGenealogyEdge, SerialMatchMode, SerializedPart};

use super::GenealogyStore;

#[derive(Debug, Clone)]
struct StoredEdge {
    id: Uuid,
    parent_part_id: Uuid,
    component_part_id: Uuid,
    assembly_date: Option<DateTime<Utc>>,
    assembly_operator: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    parts: Vec<SerializedPart>,
    index: HashMap<Uuid, usize>,
    edges: Vec<StoredEdge>,
}

impl Inner {
    fn get(&self, id: Uuid) -> Option<&SerializedPart> {
        self.index.get(&id).map(|&pos| &self.parts[pos])
    }

    fn resolve(&self, edge: &StoredEdge) -> GenealogyEdge {
        GenealogyEdge {
            id: edge.id,
            parent_part_id: edge.parent_part_id,
            component_part_id: edge.component_part_id,
            assembly_date: edge.assembly_date,
            assembly_operator: edge.assembly_operator.clone(),
            created_at: edge.created_at,
            parent_part: self.get(edge.parent_part_id).cloned(),
            component_part: self.get(edge.component_part_id).cloned(),
        }
    }
}

/// Process-local [`GenealogyStore`]. Rows come back in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryGenealogyStore {
    inner: RwLock<Inner>,
}

impl InMemoryGenealogyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a serialized part, replacing any earlier record with the same id.
    pub async fn insert_part(&self, part: SerializedPart) {
        let mut inner = self.inner.write().await;
        match inner.index.get(&part.id).copied() {
            Some(pos) => inner.parts[pos] = part,
            None => {
                let pos = inner.parts.len();
                inner.index.insert(part.id, pos);
                inner.parts.push(part);
            }
        }
    }

    /// Writes an edge with no validation at all. Used to load legacy or
    /// corrupt data, including cycles and dangling ids.
    pub async fn insert_edge(&self, parent_part_id: Uuid, component_part_id: Uuid) -> GenealogyEdge {
        let mut inner = self.inner.write().await;
        let edge = StoredEdge {
            id: Uuid::new_v4(),
            parent_part_id,
            component_part_id,
            assembly_date: None,
            assembly_operator: None,
            created_at: Utc::now(),
        };
        let resolved = inner.resolve(&edge);
        inner.edges.push(edge);
        resolved
    }

    pub async fn edge_count(&self) -> usize {
        self.inner.read().await.edges.len()
    }
}

#[async_trait]
impl GenealogyStore for InMemoryGenealogyStore {
    async fn find_serialized_part_by_serial_number(
        &self,
        serial_number: &str,
    ) -> Result<Option<SerializedPart>, ServiceError> {
        let inner = self.inner.read().await;
        Ok(inner
            .parts
            .iter()
            .find(|sp| sp.serial_number == serial_number)
            .cloned())
    }

    async fn find_serialized_parts_by_serial_pattern(
        &self,
        pattern: &str,
        mode: SerialMatchMode,
    ) -> Result<Vec<SerializedPart>, ServiceError> {
        let inner = self.inner.read().await;
        Ok(inner
            .parts
            .iter()
            .filter(|sp| mode.matches(&sp.serial_number, pattern))
            .cloned()
            .collect())
    }

    async fn find_serialized_parts_by_lot_number(
        &self,
        lot_number: &str,
    ) -> Result<Vec<SerializedPart>, ServiceError> {
        let inner = self.inner.read().await;
        Ok(inner
            .parts
            .iter()
            .filter(|sp| sp.lot_number.as_deref() == Some(lot_number))
            .cloned()
            .collect())
    }

    async fn find_genealogy_edges_by_component_lot(
        &self,
        lot_number: &str,
    ) -> Result<Vec<GenealogyEdge>, ServiceError> {
        let inner = self.inner.read().await;
        Ok(inner
            .edges
            .iter()
            .filter(|edge| {
                inner
                    .get(edge.component_part_id)
                    .and_then(|sp| sp.lot_number.as_deref())
                    == Some(lot_number)
            })
            .map(|edge| inner.resolve(edge))
            .collect())
    }

    async fn find_genealogy_edges_by_parent_id(
        &self,
        parent_id: Uuid,
    ) -> Result<Vec<GenealogyEdge>, ServiceError> {
        let inner = self.inner.read().await;
        Ok(inner
            .edges
            .iter()
            .filter(|edge| edge.parent_part_id == parent_id)
            .map(|edge| inner.resolve(edge))
            .collect())
    }

    async fn create_genealogy_edge(
        &self,
        new_edge: NewGenealogyEdge,
    ) -> Result<GenealogyEdge, ServiceError> {
        let mut inner = self.inner.write().await;

        if inner.get(new_edge.parent_part_id).is_none()
            || inner.get(new_edge.component_part_id).is_none()
        {
            return Err(ServiceError::storage(
                "Genealogy edge references an unknown serialized part",
            ));
        }

        let duplicate = inner.edges.iter().any(|edge| {
            edge.parent_part_id == new_edge.parent_part_id
                && edge.component_part_id == new_edge.component_part_id
        });
        if duplicate {
            return Err(ServiceError::storage(
                "Genealogy relationship already exists for this parent and component",
            ));
        }

        let edge = StoredEdge {
            id: Uuid::new_v4(),
            parent_part_id: new_edge.parent_part_id,
            component_part_id: new_edge.component_part_id,
            assembly_date: new_edge.assembly_date,
            assembly_operator: new_edge.assembly_operator,
            created_at: Utc::now(),
        };
        debug!(edge_id = %edge.id, "Stored genealogy edge");
        let resolved = inner.resolve(&edge);
        inner.edges.push(edge);
        Ok(resolved)
    }
}
