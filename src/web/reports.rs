//! Dashboard and packaging report routes.

use super::{AppState, auth::CurrentUser};
use crate::{
    core::{
        dashboard::{self, Dashboard},
        packaging::{self, PackagingQuery, PackagingReport},
        today,
    },
    errors::Result,
};
use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/dashboard", get(show_dashboard))
        .route("/api/packaging", get(packaging_report))
}

async fn show_dashboard(State(state): State<AppState>, current: CurrentUser) -> Result<Json<Dashboard>> {
    Ok(Json(
        dashboard::load_dashboard(&state.records, &current.actor, today()).await?,
    ))
}

async fn packaging_report(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<PackagingQuery>,
) -> Result<Json<PackagingReport>> {
    Ok(Json(
        packaging::packaging_report(&state.records, &current.actor, &query).await?,
    ))
}
