//! Sessions and sign-in.
//!
//! A successful login issues an opaque bearer token. Tokens live in process
//! memory only, so a restart signs everybody out.

use super::AppState;
use crate::{
    core::{Actor, accounts},
    entities::Profile,
    errors::{Error, Result},
};
use axum::{
    Json,
    async_trait,
    extract::{FromRequestParts, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::{debug, info};

const MAX_TTL_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone)]
struct Session {
    actor: Actor,
    expires_at: DateTime<Utc>,
}

/// In-memory bearer-token sessions.
#[derive(Clone)]
pub struct SessionStore {
    ttl: Duration,
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionStore {
    /// Creates an empty store whose sessions last `ttl_hours`, capped at a year.
    #[must_use]
    pub fn new(ttl_hours: i64) -> Self {
        Self {
            ttl: Duration::hours(ttl_hours.clamp(0, MAX_TTL_HOURS)),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Starts a session and returns its token and expiry.
    pub async fn create(&self, actor: Actor) -> (String, DateTime<Utc>) {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let expires_at = Utc::now() + self.ttl;
        let mut sessions = self.sessions.write().await;
        // Drop anything already expired while we hold the lock
        let now = Utc::now();
        sessions.retain(|_, s| s.expires_at > now);
        sessions.insert(token.clone(), Session { actor, expires_at });
        (token, expires_at)
    }

    /// The actor behind a live token.
    pub async fn resolve(&self, token: &str) -> Option<Actor> {
        let sessions = self.sessions.read().await;
        sessions
            .get(token)
            .filter(|s| s.expires_at > Utc::now())
            .map(|s| s.actor.clone())
    }

    /// Ends one session.
    pub async fn revoke(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }

    /// Ends every session of a user, e.g. after deactivation or a role change.
    pub async fn revoke_user(&self, user_id: &str) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.actor.user_id != user_id);
        before - sessions.len()
    }

    /// Ends every session of a user except the one holding `keep_token`.
    pub async fn revoke_others(&self, user_id: &str, keep_token: &str) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|token, s| s.actor.user_id != user_id || token == keep_token);
        before - sessions.len()
    }

    /// Replaces the cached name and role in all of a user's sessions.
    pub async fn refresh(&self, actor: &Actor) -> usize {
        let mut sessions = self.sessions.write().await;
        let mut refreshed = 0;
        for session in sessions.values_mut() {
            if session.actor.user_id == actor.user_id {
                session.actor = actor.clone();
                refreshed += 1;
            }
        }
        refreshed
    }
}

/// The signed-in user, resolved from the `Authorization: Bearer` header.
pub struct CurrentUser {
    /// Who is calling
    pub actor: Actor,
    /// The token they used
    pub token: String,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = bearer_token(parts).ok_or_else(|| Error::unauthorized("Sign in to continue"))?;
        let actor = state
            .sessions
            .resolve(token)
            .await
            .ok_or_else(|| Error::unauthorized("Your session has expired. Please sign in again."))?;
        debug!(user = %actor.user_id, role = %actor.role, path = %parts.uri.path(), "Authenticated request");
        Ok(Self {
            actor,
            token: token.to_string(),
        })
    }
}

/// Login form.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

/// Issued session.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    token: String,
    expires_at: DateTime<Utc>,
    user: Profile,
}

/// `POST /api/login`
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let user = accounts::authenticate(&state.records, &request.email, &request.password).await?;
    let (token, expires_at) = state.sessions.create(Actor::from_record(&user)).await;
    info!(user = %user.id, role = %user.fields.role, "Signed in");
    Ok(Json(LoginResponse {
        token,
        expires_at,
        user: Profile::from(&user),
    }))
}

/// `POST /api/logout`
pub async fn logout(State(state): State<AppState>, current: CurrentUser) -> StatusCode {
    state.sessions.revoke(&current.token).await;
    info!(user = %current.actor.user_id, "Signed out");
    StatusCode::NO_CONTENT
}
