//! Item routes: check-in, search, status moves, cartons, containers and photos.

use super::{AppState, auth::CurrentUser};
use crate::{
    core::items::{self, Dimensions, ItemQuery, ItemUpdate, ItemView, NewItem},
    entities::{Item, ItemStatus, Record},
    errors::{Error, Result},
    services::images::MAX_IMAGE_BYTES,
};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post, put},
};
use serde::Deserialize;
use tracing::warn;

// Room for the multipart framing around a maximum-size photo
const PHOTO_BODY_LIMIT: usize = MAX_IMAGE_BYTES + 64 * 1024;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/items", get(list).post(create))
        .route("/api/items/:id", get(show).patch(update).delete(remove))
        .route("/api/items/:id/status", patch(set_status))
        .route("/api/items/:id/carton", patch(set_carton))
        .route("/api/items/:id/container", patch(set_container))
        .route("/api/items/:id/dimensions", put(set_dimensions))
        .route(
            "/api/items/:id/photos",
            post(upload_photos).layer(DefaultBodyLimit::max(PHOTO_BODY_LIMIT)),
        )
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: ItemStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CartonBody {
    carton_number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ContainerBody {
    container_id: Option<String>,
}

type ItemResponse = Result<Json<Record<Item>>>;

async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<ItemQuery>,
) -> Result<Json<Vec<ItemView>>> {
    Ok(Json(items::list_items(&state.records, &current.actor, &query).await?))
}

async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(new): Json<NewItem>,
) -> Result<(StatusCode, Json<Record<Item>>)> {
    let item = items::create_item(&state.records, &state.pricing, &current.actor, new).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn show(State(state): State<AppState>, current: CurrentUser, Path(id): Path<String>) -> ItemResponse {
    Ok(Json(items::get_item(&state.records, &current.actor, &id).await?))
}

async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    Json(update): Json<ItemUpdate>,
) -> ItemResponse {
    let item = items::update_details(&state.records, &state.pricing, &current.actor, &id, update).await?;
    Ok(Json(item))
}

async fn remove(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    items::delete_item(&state.records, &current.actor, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_status(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> ItemResponse {
    Ok(Json(
        items::update_status(&state.records, &current.actor, &id, body.status).await?,
    ))
}

async fn set_carton(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<CartonBody>,
) -> ItemResponse {
    Ok(Json(
        items::assign_carton(&state.records, &current.actor, &id, body.carton_number).await?,
    ))
}

async fn set_container(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<ContainerBody>,
) -> ItemResponse {
    Ok(Json(
        items::assign_container(&state.records, &current.actor, &id, body.container_id).await?,
    ))
}

async fn set_dimensions(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    Json(dimensions): Json<Dimensions>,
) -> ItemResponse {
    let item =
        items::update_dimensions(&state.records, &state.pricing, &current.actor, &id, dimensions)
            .await?;
    Ok(Json(item))
}

/// Every file part of the form is uploaded in order; other parts are ignored.
async fn upload_photos(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    mut form: Multipart,
) -> ItemResponse {
    let mut latest = None;
    while let Some(field) = form
        .next_field()
        .await
        .map_err(|e| Error::validation(e.body_text()))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await.map_err(|e| {
            warn!(item = %id, error = %e, "Photo upload body rejected");
            Error::validation(e.body_text())
        })?;
        latest = Some(
            items::add_photo(
                &state.records,
                state.photos.as_ref(),
                &current.actor,
                &id,
                &file_name,
                &content_type,
                bytes.to_vec(),
            )
            .await?,
        );
    }
    latest
        .map(Json)
        .ok_or_else(|| Error::validation("Attach at least one photo file"))
}
