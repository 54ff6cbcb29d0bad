//! Request ids for the HTTP surface.
//!
//! `SetRequestIdLayer` assigns a UUID when the caller sent no `x-request-id`,
//! `PropagateRequestIdLayer` copies it onto the response and [`bind_request_id`]
//! makes it visible to handlers and error bodies.

use crate::tracing::{scope_request_id, RequestId, REQUEST_ID_HEADER};
use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::{self, Next},
    response::Response,
    Router,
};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

/// Wraps `router` so every request carries a request id end to end.
pub fn with_request_ids<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(middleware::from_fn(bind_request_id))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Stores the id as a [`RequestId`] extension and scopes it over the rest of
/// the call. A blank inbound id is replaced and the replacement is returned.
pub async fn bind_request_id(mut request: Request, next: Next) -> Response {
    let (request_id, replacement) = match RequestId::from_headers(request.headers()) {
        Some(id) => (id, None),
        None => {
            let fresh = RequestId::default();
            let value = HeaderValue::from_str(fresh.as_str()).ok();
            if let Some(value) = &value {
                request
                    .headers_mut()
                    .insert(REQUEST_ID_HEADER, value.clone());
            }
            (fresh, value)
        }
    };
    request.extensions_mut().insert(request_id.clone());

    let mut response = scope_request_id(request_id, next.run(request)).await;
    // The propagate layer leaves an existing response header alone.
    if let Some(value) = replacement {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
