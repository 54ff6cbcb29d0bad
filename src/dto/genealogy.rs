//! Wire shapes for traceability results. Field names are camelCase on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::{GenealogyEdge, PartType, SerializedPartStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForwardTraceResult {
    #[schema(example = "LOT-001")]
    pub lot_number: String,
    pub used_in_products: Vec<UsedInProduct>,
    pub total_products: usize,
}

/// A unit the lot went into, either directly or as a consumed component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsedInProduct {
    pub serial_number: String,
    pub part_number: String,
    pub part_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_order_number: Option<String>,
    pub date_used: DateTime<Utc>,
    #[schema(value_type = String, example = "ACTIVE")]
    pub current_status: SerializedPartStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackwardTraceResult {
    pub serial_number: String,
    pub part_number: String,
    pub part_name: String,
    pub components: Vec<TracedComponent>,
    pub total_components: usize,
}

/// A consumed component; `level` 0 is a direct component of the traced unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TracedComponent {
    pub serial_number: String,
    pub part_number: String,
    pub part_name: String,
    pub lot_number: Option<String>,
    pub supplier: Option<String>,
    pub assembly_date: Option<DateTime<Utc>>,
    pub level: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenealogyGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub root_node_id: Uuid,
    /// Deepest level actually reached
    pub max_depth: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Finished,
    RawMaterial,
    Purchased,
    Wip,
}

impl NodeType {
    pub fn classify(part_type: &PartType, is_root: bool) -> Self {
        if is_root {
            return NodeType::Finished;
        }
        match part_type {
            PartType::RawMaterial => NodeType::RawMaterial,
            PartType::Purchased => NodeType::Purchased,
            _ => NodeType::Wip,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: Uuid,
    pub serial_number: String,
    pub part_number: String,
    pub part_name: String,
    #[schema(value_type = String, example = "ASSEMBLY")]
    pub part_type: PartType,
    pub lot_number: Option<String>,
    #[schema(value_type = String, example = "ACTIVE")]
    pub status: SerializedPartStatus,
    pub level: u32,
    pub node_type: NodeType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EdgeRelationship {
    Contains,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub id: Uuid,
    /// Parent node id
    pub source: Uuid,
    /// Component node id
    pub target: Uuid,
    pub relationship: EdgeRelationship,
    pub assembly_date: Option<DateTime<Utc>>,
    pub assembly_operator: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateGenealogyRequest {
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "PARENT-001")]
    pub parent_identifier: String,
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "COMPONENT-001")]
    pub component_identifier: String,
    pub assembly_date: Option<DateTime<Utc>>,
    #[validate(length(max = 100))]
    pub assembly_operator: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenealogyEdgeResponse {
    pub id: Uuid,
    pub parent_part_id: Uuid,
    pub component_part_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_serial_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_serial_number: Option<String>,
    pub assembly_date: Option<DateTime<Utc>>,
    pub assembly_operator: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<GenealogyEdge> for GenealogyEdgeResponse {
    fn from(edge: GenealogyEdge) -> Self {
        Self {
            id: edge.id,
            parent_part_id: edge.parent_part_id,
            component_part_id: edge.component_part_id,
            parent_serial_number: edge.parent_part.map(|p| p.serial_number),
            component_serial_number: edge.component_part.map(|p| p.serial_number),
            assembly_date: edge.assembly_date,
            assembly_operator: edge.assembly_operator,
            created_at: edge.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CircularCheckResponse {
    pub identifier: String,
    pub has_circular_reference: bool,
}

/// Optional traversal bound
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DepthQuery {
    /// Maximum number of levels to expand
    pub max_depth: Option<u32>,
}
