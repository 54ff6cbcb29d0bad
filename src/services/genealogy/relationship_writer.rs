use chrono::{DateTime, Utc};
use metrics::counter;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::cycle_guard::CircularReferenceGuard;
use super::resolver::PartLookupResolver;
use crate::errors::ServiceError;
use crate::models::{GenealogyEdge, NewGenealogyEdge};
use crate::repositories::GenealogyStore;

pub const PART_NOT_FOUND_MESSAGE: &str = "Parent or component part not found";
pub const CIRCULAR_REFERENCE_MESSAGE: &str =
    "Cannot create genealogy: would create circular reference";

/// Persists parent/component edges after checking they keep the graph acyclic.
pub struct GenealogyRelationshipWriter {
    store: Arc<dyn GenealogyStore>,
    resolver: Arc<PartLookupResolver>,
    guard: Arc<CircularReferenceGuard>,
}

impl GenealogyRelationshipWriter {
    pub fn new(
        store: Arc<dyn GenealogyStore>,
        resolver: Arc<PartLookupResolver>,
        guard: Arc<CircularReferenceGuard>,
    ) -> Self {
        Self {
            store,
            resolver,
            guard,
        }
    }

    #[instrument(skip(self))]
    pub async fn create(
        &self,
        parent_identifier: &str,
        component_identifier: &str,
        assembly_date: Option<DateTime<Utc>>,
        assembly_operator: Option<String>,
    ) -> Result<GenealogyEdge, ServiceError> {
        let parent = self.resolver.resolve(parent_identifier).await;
        let component = self.resolver.resolve(component_identifier).await;
        let (parent, component) = match (parent, component) {
            (Ok(parent), Ok(component)) => (parent, component),
            (Err(e), _) | (_, Err(e)) if e.is_not_found() => {
                warn!(parent_identifier, component_identifier, "{}", e);
                return Err(ServiceError::storage(PART_NOT_FOUND_MESSAGE));
            }
            (Err(e), _) | (_, Err(e)) => {
                return Err(e.with_context("Failed to resolve genealogy endpoints"))
            }
        };

        if self
            .guard
            .would_create_cycle(parent.id, component.id)
            .await
            .map_err(|e| e.with_context("Failed to check genealogy for circular references"))?
        {
            counter!("genealogy.edges.rejected_cycle", 1);
            warn!(
                parent = %parent.serial_number,
                component = %component.serial_number,
                "Rejected genealogy edge that would close a loop"
            );
            return Err(ServiceError::ValidationError(
                CIRCULAR_REFERENCE_MESSAGE.to_string(),
            ));
        }

        let edge = self
            .store
            .create_genealogy_edge(NewGenealogyEdge {
                parent_part_id: parent.id,
                component_part_id: component.id,
                assembly_date,
                assembly_operator,
            })
            .await
            .map_err(|e| e.with_context("Failed to create genealogy relationship"))?;

        counter!("genealogy.edges.created", 1);
        info!(
            edge_id = %edge.id,
            parent = %parent.serial_number,
            component = %component.serial_number,
            "Genealogy relationship created"
        );

        Ok(edge)
    }
}
