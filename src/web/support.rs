//! Support ticket and announcement routes.

use super::{AppState, auth::CurrentUser};
use crate::{
    core::{
        announcements::{self, AnnouncementUpdate, NewAnnouncement},
        support::{self, NewTicket, TicketQuery, TicketUpdate, TicketView},
    },
    entities::{Announcement, Record, SupportRequest},
    errors::Result,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
};
use serde::Deserialize;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/support", get(list_tickets).post(open_ticket))
        .route("/api/support/:id", patch(respond))
        .route(
            "/api/announcements",
            get(list_announcements).post(post_announcement),
        )
        .route(
            "/api/announcements/:id",
            patch(update_announcement).delete(delete_announcement),
        )
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AnnouncementFilter {
    /// Include inactive announcements (admins only)
    all: bool,
}

async fn list_tickets(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<TicketQuery>,
) -> Result<Json<Vec<TicketView>>> {
    Ok(Json(support::list_tickets(&state.records, &current.actor, &query).await?))
}

async fn open_ticket(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(new): Json<NewTicket>,
) -> Result<(StatusCode, Json<Record<SupportRequest>>)> {
    let ticket = support::create_ticket(&state.records, &current.actor, new).await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

async fn respond(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    Json(update): Json<TicketUpdate>,
) -> Result<Json<Record<SupportRequest>>> {
    Ok(Json(support::respond(&state.records, &current.actor, &id, update).await?))
}

async fn list_announcements(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(filter): Query<AnnouncementFilter>,
) -> Result<Json<Vec<Record<Announcement>>>> {
    let list = if filter.all {
        announcements::list_all(&state.records, &current.actor).await?
    } else {
        announcements::list_active(&state.records).await?
    };
    Ok(Json(list))
}

async fn post_announcement(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(new): Json<NewAnnouncement>,
) -> Result<(StatusCode, Json<Record<Announcement>>)> {
    let posted = announcements::create_announcement(&state.records, &current.actor, new).await?;
    Ok((StatusCode::CREATED, Json(posted)))
}

async fn update_announcement(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    Json(update): Json<AnnouncementUpdate>,
) -> Result<Json<Record<Announcement>>> {
    Ok(Json(
        announcements::update_announcement(&state.records, &current.actor, &id, update).await?,
    ))
}

async fn delete_announcement(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    announcements::delete_announcement(&state.records, &current.actor, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
