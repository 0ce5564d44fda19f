//! Container routes, including the printable packing list.

use super::{AppState, auth::CurrentUser};
use crate::{
    core::{
        containers::{self, ContainerSummary, NewContainer, StatusChange},
        print,
    },
    entities::{Container, ContainerStatus, Record},
    errors::Result,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::Html,
    routing::{get, patch},
};
use serde::Deserialize;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/containers", get(list).post(create))
        .route("/api/containers/:id/status", patch(set_status))
        .route("/api/containers/:id/summary", get(summary))
        .route("/api/containers/:id/packing-list", get(packing_list))
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: ContainerStatus,
}

async fn list(State(state): State<AppState>, current: CurrentUser) -> Result<Json<Vec<ContainerSummary>>> {
    Ok(Json(containers::list_containers(&state.records, &current.actor).await?))
}

async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(new): Json<NewContainer>,
) -> Result<(StatusCode, Json<Record<Container>>)> {
    let container = containers::create_container(&state.records, &current.actor, new).await?;
    Ok((StatusCode::CREATED, Json(container)))
}

async fn set_status(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> Result<Json<StatusChange>> {
    let change = containers::update_status(&state.records, &current.actor, &id, body.status).await?;
    Ok(Json(change))
}

async fn summary(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ContainerSummary>> {
    Ok(Json(containers::summary(&state.records, &current.actor, &id).await?))
}

async fn packing_list(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<Html<String>> {
    Ok(Html(print::packing_list(&state.records, &current.actor, &id).await?))
}
