use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{header, HeaderName, Method, StatusCode};
use axum::middleware::map_response;
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::resources::context::{Method as RequestMethod, RequestContext};
use crate::resources::{Gateway, Resource};

#[derive(Clone)]
pub struct AppState {
    gateway: Arc<Gateway>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn router(gateway: Arc<Gateway>, request_timeout: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
            header::CACHE_CONTROL,
        ]);

    Router::new()
        .route("/", any(dispatch))
        .with_state(AppState { gateway })
        .layer(TimeoutLayer::new(request_timeout))
        .layer(map_response(timeout_envelope))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// The timeout layer answers with an empty 408; give it the same error body
/// as every other failure. Handlers never produce 408 themselves.
async fn timeout_envelope(response: Response) -> Response {
    if response.status() != StatusCode::REQUEST_TIMEOUT {
        return response;
    }
    (
        StatusCode::REQUEST_TIMEOUT,
        Json(json!({ "error": "Request timed out" })),
    )
        .into_response()
}

async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
    body: Bytes,
) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::NO_CONTENT.into_response();
    }
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => return ApiError::bad_request(rejection.body_text()).into_response(),
    };

    let endpoint = query.get("endpoint").cloned().unwrap_or_default();
    let Some(resource) = Resource::parse(&endpoint) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("Resource '{endpoint}' not found") })),
        )
            .into_response();
    };

    let ctx = RequestContext::new(RequestMethod::parse(method.as_str()), query, body.to_vec());
    match state.gateway.handle(resource, &ctx).await {
        Ok(payload) => (StatusCode::OK, Json(payload)).into_response(),
        Err(err) => err.into_response(),
    }
}
