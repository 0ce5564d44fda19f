//! Announcement entity - A broadcast message shown on every dashboard.

use super::Entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Visual category of an announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AnnouncementType {
    /// General information
    #[default]
    Info,
    /// Schedule or service update
    Update,
    /// Delay or disruption notice
    Warning,
    /// Discount or offer
    Promotion,
}

/// Fields of an `Announcements` record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Announcement {
    /// Headline
    pub title: String,
    /// Body text
    pub message: String,
    /// Visual category
    #[serde(rename = "type")]
    pub kind: AnnouncementType,
    /// Inactive announcements are hidden from dashboards
    pub active: bool,
    /// When the announcement was posted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for Announcement {
    const TABLE: &'static str = "Announcements";
    const NAME: &'static str = "Announcement";
}
