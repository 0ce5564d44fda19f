//! Support request entity - A customer ticket.

use super::Entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a ticket is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SupportCategory {
    /// Tracking and delivery questions
    Shipping,
    /// Invoices and payments
    Payment,
    /// Damaged or missing goods
    Damage,
    /// Login and profile problems
    Account,
    /// Anything else
    #[default]
    Other,
}

/// Where a ticket is in its handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SupportStatus {
    /// Waiting for staff
    #[default]
    Open,
    /// Being handled
    #[serde(rename = "In Progress")]
    InProgress,
    /// Answered
    Resolved,
    /// Archived
    Closed,
}

impl SupportStatus {
    /// Whether the ticket still needs attention.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open | Self::InProgress)
    }
}

/// Fields of a `SupportRequests` record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SupportRequest {
    /// Requesting customer's `Users` record id
    pub customer_id: String,
    /// Short summary
    pub subject: String,
    /// Full message
    pub message: String,
    /// Topic
    pub category: SupportCategory,
    /// Handling state
    pub status: SupportStatus,
    /// Staff reply
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// When the ticket was opened
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for SupportRequest {
    const TABLE: &'static str = "SupportRequests";
    const NAME: &'static str = "Support request";
}
