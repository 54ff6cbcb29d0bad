use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::{GenealogyEdge, NewGenealogyEdge, SerialMatchMode, SerializedPart};

pub mod genealogy_repository;
pub mod in_memory;

pub use genealogy_repository::SeaOrmGenealogyStore;
pub use in_memory::InMemoryGenealogyStore;

/// Storage collaborator of the genealogy engine.
///
/// Implementations return rows in a stable order so repeated reads over an
/// unchanged store produce identical traces.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenealogyStore: Send + Sync {
    /// Exact serial number lookup.
    async fn find_serialized_part_by_serial_number(
        &self,
        serial_number: &str,
    ) -> Result<Option<SerializedPart>, ServiceError>;

    async fn find_serialized_parts_by_serial_pattern(
        &self,
        pattern: &str,
        mode: SerialMatchMode,
    ) -> Result<Vec<SerializedPart>, ServiceError>;

    async fn find_serialized_parts_by_lot_number(
        &self,
        lot_number: &str,
    ) -> Result<Vec<SerializedPart>, ServiceError>;

    /// Edges whose component carries `lot_number`, with both ends resolved.
    async fn find_genealogy_edges_by_component_lot(
        &self,
        lot_number: &str,
    ) -> Result<Vec<GenealogyEdge>, ServiceError>;

    /// Edges hanging off `parent_id`, with the component resolved.
    async fn find_genealogy_edges_by_parent_id(
        &self,
        parent_id: Uuid,
    ) -> Result<Vec<GenealogyEdge>, ServiceError>;

    async fn create_genealogy_edge(
        &self,
        new_edge: NewGenealogyEdge,
    ) -> Result<GenealogyEdge, ServiceError>;
}
