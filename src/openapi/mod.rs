use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "MachShop Genealogy API",
        version = "0.1.0",
        description = r#"
# Genealogy and Traceability

Reconstructs how lots and sub-assemblies flow into finished units.

- **Forward trace**: every unit a lot went into
- **Backward trace**: every component consumed to build a unit, by level
- **Genealogy graph**: bounded node/edge view for visualization
- **Relationships**: record parent/component assembly edges; loops are rejected

Identifiers are matched exactly first, then by prefix, substring and suffix.

Errors use a common body:

```json
{
  "error": "Not Found",
  "message": "Not found: Serialized part not found for identifier \"SN-404\"",
  "request_id": "6c1e...",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
"#
    ),
    tags(
        (name = "traceability", description = "Lot and serial genealogy"),
    ),
    paths(
        crate::handlers::traceability::get_forward_traceability,
        crate::handlers::traceability::get_backward_traceability,
        crate::handlers::traceability::get_genealogy_graph,
        crate::handlers::traceability::check_circular_references,
        crate::handlers::traceability::create_genealogy_relationship,
    ),
    components(
        schemas(
            crate::errors::ErrorResponse,
            crate::dto::ForwardTraceResult,
            crate::dto::UsedInProduct,
            crate::dto::BackwardTraceResult,
            crate::dto::TracedComponent,
            crate::dto::GenealogyGraph,
            crate::dto::GraphNode,
            crate::dto::GraphEdge,
            crate::dto::NodeType,
            crate::dto::EdgeRelationship,
            crate::dto::CreateGenealogyRequest,
            crate::dto::GenealogyEdgeResponse,
            crate::dto::CircularCheckResponse,
        )
    )
)]
pub struct ApiDocV1;

/// Serves the generated document at `/api-docs/openapi.json`
pub fn openapi_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDocV1::openapi()) }),
    )
}
