use crate::{
    dto::{
        BackwardTraceResult, CircularCheckResponse, CreateGenealogyRequest, DepthQuery,
        ForwardTraceResult, GenealogyEdgeResponse, GenealogyGraph,
    },
    errors::ApiError,
    handlers::AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tracing::info;
use validator::Validate;

/// Creates the router for traceability endpoints
pub fn traceability_routes() -> Router<AppState> {
    Router::new()
        .route("/forward/:lot_number", get(get_forward_traceability))
        .route("/backward/:identifier", get(get_backward_traceability))
        .route("/graph/:identifier", get(get_genealogy_graph))
        .route("/circular-check/:identifier", get(check_circular_references))
        .route("/genealogy", post(create_genealogy_relationship))
}

/// Every unit a lot went into
#[utoipa::path(
    get,
    path = "/api/v1/traceability/forward/{lot_number}",
    params(("lot_number" = String, Path, description = "Lot number to trace")),
    responses(
        (status = 200, description = "Forward trace returned", body = ForwardTraceResult,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "traceability"
)]
pub async fn get_forward_traceability(
    State(state): State<AppState>,
    Path(lot_number): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .genealogy
        .get_forward_traceability(&lot_number)
        .await?;

    Ok(Json(result))
}

/// Components consumed to build a unit
#[utoipa::path(
    get,
    path = "/api/v1/traceability/backward/{identifier}",
    params(
        ("identifier" = String, Path, description = "Serial number or fragment of one"),
        DepthQuery
    ),
    responses(
        (status = 200, description = "Backward trace returned", body = BackwardTraceResult,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 404, description = "Part not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "traceability"
)]
pub async fn get_backward_traceability(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
    Query(query): Query<DepthQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .genealogy
        .get_backward_traceability(&identifier, query.max_depth)
        .await?;

    Ok(Json(result))
}

/// Node/edge graph below a unit, for visualization
#[utoipa::path(
    get,
    path = "/api/v1/traceability/graph/{identifier}",
    params(
        ("identifier" = String, Path, description = "Serial number or fragment of one"),
        DepthQuery
    ),
    responses(
        (status = 200, description = "Genealogy graph returned", body = GenealogyGraph,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 404, description = "Part not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "traceability"
)]
pub async fn get_genealogy_graph(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
    Query(query): Query<DepthQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let graph = state
        .genealogy
        .get_genealogy_graph(&identifier, query.max_depth)
        .await?;

    Ok(Json(graph))
}

#[utoipa::path(
    get,
    path = "/api/v1/traceability/circular-check/{identifier}",
    params(("identifier" = String, Path, description = "Serial number or fragment of one")),
    responses(
        (status = 200, description = "Check completed", body = CircularCheckResponse)
    ),
    tag = "traceability"
)]
pub async fn check_circular_references(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> impl IntoResponse {
    let has_circular_reference = state.genealogy.detect_circular_references(&identifier).await;

    Json(CircularCheckResponse {
        identifier,
        has_circular_reference,
    })
}

/// Record that a component was assembled into a parent
#[utoipa::path(
    post,
    path = "/api/v1/traceability/genealogy",
    request_body = CreateGenealogyRequest,
    responses(
        (status = 201, description = "Genealogy relationship created", body = GenealogyEdgeResponse,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request or circular reference", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "traceability"
)]
pub async fn create_genealogy_relationship(
    State(state): State<AppState>,
    Json(payload): Json<CreateGenealogyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::ValidationError(format!("Validation failed: {}", e)))?;

    let edge = state
        .genealogy
        .create_genealogy_relationship(payload)
        .await?;

    info!(edge_id = %edge.id, "Genealogy relationship recorded");
    Ok((StatusCode::CREATED, Json(GenealogyEdgeResponse::from(edge))))
}
