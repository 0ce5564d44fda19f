//! User management and the signed-in user's own profile.

use super::{AppState, auth::CurrentUser};
use crate::{
    core::{
        Actor,
        accounts::{self, IssuedCredentials, NewAccount, ProfileUpdate},
    },
    entities::{Profile, Role},
    errors::Result,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use serde::Deserialize;
use tracing::info;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/me", get(me).patch(update_me))
        .route("/api/me/password", post(change_my_password))
        .route("/api/users", get(list).post(create))
        .route("/api/users/:id", get(show).patch(update))
        .route("/api/users/:id/active", patch(set_active))
        .route("/api/users/:id/password", post(reset_password))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UserFilter {
    role: Option<Role>,
}

#[derive(Debug, Deserialize)]
struct ActiveFlag {
    active: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordChange {
    current_password: String,
    new_password: String,
}

async fn me(State(state): State<AppState>, current: CurrentUser) -> Result<Json<Profile>> {
    let profile = accounts::get_profile(&state.records, &current.actor, &current.actor.user_id).await?;
    Ok(Json(profile))
}

async fn update_me(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<Profile>> {
    let id = current.actor.user_id.clone();
    let profile = accounts::update_profile(&state.records, &current.actor, &id, update).await?;
    state.sessions.refresh(&Actor::from_profile(&profile)).await;
    Ok(Json(profile))
}

async fn change_my_password(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(change): Json<PasswordChange>,
) -> Result<StatusCode> {
    accounts::change_password(
        &state.records,
        &current.actor,
        &change.current_password,
        &change.new_password,
    )
    .await?;
    let ended = state
        .sessions
        .revoke_others(&current.actor.user_id, &current.token)
        .await;
    info!(user = %current.actor.user_id, sessions = ended, "Signed out other sessions after password change");
    Ok(StatusCode::NO_CONTENT)
}

async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(filter): Query<UserFilter>,
) -> Result<Json<Vec<Profile>>> {
    let users = accounts::list_users(&state.records, &current.actor, filter.role).await?;
    Ok(Json(users))
}

async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<NewAccount>,
) -> Result<(StatusCode, Json<IssuedCredentials>)> {
    let issued = accounts::create_account(
        &state.records,
        &state.mailer,
        &state.base_url,
        &current.actor,
        request,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(issued)))
}

async fn show(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Profile>> {
    Ok(Json(accounts::get_profile(&state.records, &current.actor, &id).await?))
}

async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<Profile>> {
    let role_change = update.role.is_some();
    let profile = accounts::update_profile(&state.records, &current.actor, &id, update).await?;
    if role_change && id != current.actor.user_id {
        let ended = state.sessions.revoke_user(&id).await;
        info!(user = %id, sessions = ended, "Signed out after role change");
    } else {
        state.sessions.refresh(&Actor::from_profile(&profile)).await;
    }
    Ok(Json(profile))
}

async fn set_active(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    Json(flag): Json<ActiveFlag>,
) -> Result<Json<Profile>> {
    let profile = accounts::set_active(&state.records, &current.actor, &id, flag.active).await?;
    if !flag.active {
        let ended = state.sessions.revoke_user(&id).await;
        info!(user = %id, sessions = ended, "Signed out deactivated user");
    }
    Ok(Json(profile))
}

async fn reset_password(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<IssuedCredentials>> {
    let issued = accounts::reset_password(
        &state.records,
        &state.mailer,
        &state.base_url,
        &current.actor,
        &id,
    )
    .await?;
    // an admin resetting their own password stays signed in on this session
    let ended = state.sessions.revoke_others(&id, &current.token).await;
    info!(user = %id, sessions = ended, "Signed out after password reset");
    Ok(Json(issued))
}
