//! Experiment listing and deletion

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::info;

use crate::{
    error::ServerError,
    relay::{respond, RelayRoute},
    server::ServerState,
};

pub const EXPERIMENTS_PATH: &str = "/api/experiments";
const DEFAULT_PAGE: &str = "1";
const DEFAULT_LIMIT: &str = "10";

/// Pagination is forwarded as given; blank values fall back to the defaults
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    pub id: Option<String>,
}

fn or_default(value: Option<String>, default: &str) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_string())
}

/// `GET /api/experiments?page&limit`
pub async fn list_experiments(State(state): State<ServerState>, Query(query): Query<ListQuery>) -> Response {
    let route = RelayRoute::get(EXPERIMENTS_PATH)
        .query("page", or_default(query.page, DEFAULT_PAGE))
        .query("limit", or_default(query.limit, DEFAULT_LIMIT));
    respond(state.relay.forward(&route, None).await)
}

/// `DELETE /api/experiments?id=<id>`
pub async fn delete_experiment(State(state): State<ServerState>, Query(query): Query<DeleteQuery>) -> Response {
    match query.id.filter(|id| !id.is_empty()) {
        Some(id) => forward_delete(&state, id).await,
        None => ServerError::MissingExperimentId.into_response(),
    }
}

/// `DELETE /api/experiments/<id>`
pub async fn delete_experiment_by_path(State(state): State<ServerState>, Path(id): Path<String>) -> Response {
    forward_delete(&state, id).await
}

async fn forward_delete(state: &ServerState, id: String) -> Response {
    info!(experiment_id = %id, "deleting experiment");
    let route = RelayRoute::delete(EXPERIMENTS_PATH).segment(id);
    respond(state.relay.forward(&route, None).await)
}
