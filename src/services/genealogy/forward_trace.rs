use metrics::counter;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::dto::{ForwardTraceResult, UsedInProduct};
use crate::errors::ServiceError;
use crate::models::SerializedPart;
use crate::repositories::GenealogyStore;

/// Finds every unit a lot went into, either stamped with the lot directly or
/// built from a component carrying it.
pub struct ForwardTraceEngine {
    store: Arc<dyn GenealogyStore>,
}

impl ForwardTraceEngine {
    pub fn new(store: Arc<dyn GenealogyStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn trace(&self, lot_number: &str) -> Result<ForwardTraceResult, ServiceError> {
        self.collect(lot_number).await.map_err(|e| {
            e.with_context(format!(
                "Failed to retrieve forward traceability for lot number \"{}\"",
                lot_number
            ))
        })
    }

    async fn collect(&self, lot_number: &str) -> Result<ForwardTraceResult, ServiceError> {
        let (direct, edges) = futures::try_join!(
            self.store.find_serialized_parts_by_lot_number(lot_number),
            self.store.find_genealogy_edges_by_component_lot(lot_number),
        )?;

        let mut seen: HashSet<Uuid> = HashSet::new();
        let mut products = Vec::new();

        for part in direct {
            if seen.insert(part.id) {
                let date_used = part.manufacture_date.unwrap_or(part.created_at);
                products.push(used_in(part, date_used));
            }
        }

        for edge in edges {
            let Some(parent) = edge.parent_part else {
                warn!(
                    edge_id = %edge.id,
                    parent_part_id = %edge.parent_part_id,
                    "Genealogy edge references a missing parent; dropping"
                );
                counter!("genealogy.traversal.skipped_edges", 1);
                continue;
            };
            if seen.insert(parent.id) {
                let date_used = edge.assembly_date.unwrap_or(edge.created_at);
                products.push(used_in(parent, date_used));
            }
        }

        counter!("genealogy.trace.forward", 1);
        info!(lot_number, total_products = products.len(), "Forward trace complete");

        Ok(ForwardTraceResult {
            lot_number: lot_number.to_string(),
            total_products: products.len(),
            used_in_products: products,
        })
    }
}

fn used_in(part: SerializedPart, date_used: chrono::DateTime<chrono::Utc>) -> UsedInProduct {
    UsedInProduct {
        serial_number: part.serial_number,
        part_number: part.part.part_number,
        part_name: part.part.part_name,
        work_order_number: part.work_order_number,
        date_used,
        current_status: part.status,
    }
}
