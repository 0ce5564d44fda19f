//! Announcement business logic - broadcasts shown on every dashboard.

use super::{Actor, required};
use crate::{
    entities::{Announcement, AnnouncementType, Record},
    errors::{Error, Result},
    store::Records,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::info;

/// Input for posting an announcement.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewAnnouncement {
    /// Headline
    pub title: String,
    /// Body text
    pub message: String,
    /// Visual category
    #[serde(rename = "type")]
    pub kind: AnnouncementType,
}

/// Editable announcement fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnnouncementUpdate {
    /// Headline
    pub title: Option<String>,
    /// Body text
    pub message: Option<String>,
    /// Visual category
    #[serde(rename = "type")]
    pub kind: Option<AnnouncementType>,
    /// Whether dashboards show it
    pub active: Option<bool>,
}

fn newest_first(records: &mut [Record<Announcement>]) {
    records.sort_by(|a, b| {
        let key = |r: &Record<Announcement>| r.fields.created_at.or(r.created_time);
        key(b).cmp(&key(a))
    });
}

/// Posts a new, active announcement.
///
/// # Errors
/// Returns `Error::Forbidden` for non-admins and `Error::Validation` for a
/// blank title or message.
pub async fn create_announcement(
    records: &Records,
    actor: &Actor,
    new: NewAnnouncement,
) -> Result<Record<Announcement>> {
    actor.require_admin()?;
    let record = records
        .insert(&Announcement {
            title: required(&new.title, "Title")?,
            message: required(&new.message, "Message")?,
            kind: new.kind,
            active: true,
            created_at: Some(Utc::now()),
        })
        .await?;
    info!(id = %record.id, title = %record.fields.title, "Announcement posted");
    Ok(record)
}

/// Active announcements, newest first. Visible to everyone.
///
/// # Errors
/// Returns an error if the store call fails.
pub async fn list_active(records: &Records) -> Result<Vec<Record<Announcement>>> {
    let mut active = records.find_checked::<Announcement>("active").await?;
    newest_first(&mut active);
    Ok(active)
}

/// Every announcement including inactive ones, newest first.
///
/// # Errors
/// Returns `Error::Forbidden` for non-admins.
pub async fn list_all(records: &Records, actor: &Actor) -> Result<Vec<Record<Announcement>>> {
    actor.require_admin()?;
    let mut all = records.all::<Announcement>().await?;
    newest_first(&mut all);
    Ok(all)
}

/// Edits or (de)activates an announcement.
///
/// # Errors
/// Returns `Error::Forbidden` for non-admins, `Error::Validation` for blank
/// text or `Error::NotFound`.
pub async fn update_announcement(
    records: &Records,
    actor: &Actor,
    id: &str,
    update: AnnouncementUpdate,
) -> Result<Record<Announcement>> {
    actor.require_admin()?;
    let mut changes = Map::new();
    if let Some(title) = update.title {
        changes.insert("title".to_string(), json!(required(&title, "Title")?));
    }
    if let Some(message) = update.message {
        changes.insert("message".to_string(), json!(required(&message, "Message")?));
    }
    if let Some(kind) = update.kind {
        changes.insert("type".to_string(), json!(kind));
    }
    if let Some(active) = update.active {
        changes.insert("active".to_string(), json!(active));
    }
    if changes.is_empty() {
        return Err(Error::validation("Nothing to update"));
    }
    let record = records
        .patch::<Announcement>(id, Value::Object(changes))
        .await?;
    info!(%id, active = record.fields.active, "Announcement updated");
    Ok(record)
}

/// Deletes an announcement.
///
/// # Errors
/// Returns `Error::Forbidden` for non-admins or `Error::NotFound`.
pub async fn delete_announcement(records: &Records, actor: &Actor, id: &str) -> Result<()> {
    actor.require_admin()?;
    records.remove::<Announcement>(id).await?;
    info!(%id, "Announcement deleted");
    Ok(())
}
