//! Support ticket business logic.

use super::{Actor, optional, required};
use crate::{
    entities::{Record, Role, SupportCategory, SupportRequest, SupportStatus, User},
    errors::{Error, Result},
    store::Records,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use tracing::info;

/// Name shown when a ticket's customer record no longer exists.
pub const UNKNOWN_CUSTOMER: &str = "Unknown customer";

/// Input for opening a ticket.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewTicket {
    /// Short summary
    pub subject: String,
    /// Full message
    pub message: String,
    /// Topic
    pub category: SupportCategory,
}

/// Staff reply and/or status change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TicketUpdate {
    /// Reply text
    pub response: Option<String>,
    /// New status
    pub status: Option<SupportStatus>,
}

/// Filter for ticket lists.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TicketQuery {
    /// Only this status
    pub status: Option<SupportStatus>,
    /// Only this category
    pub category: Option<SupportCategory>,
}

/// A ticket with its customer resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketView {
    /// The ticket record
    #[serde(flatten)]
    pub record: Record<SupportRequest>,
    /// Customer name, or [`UNKNOWN_CUSTOMER`]
    pub customer_name: String,
    /// Customer email, empty if unknown
    pub customer_email: String,
}

/// Attaches customer names and emails from an already fetched user list.
#[must_use]
pub fn resolve_customers(tickets: Vec<Record<SupportRequest>>, users: &[Record<User>]) -> Vec<TicketView> {
    let by_id: HashMap<&str, &User> = users.iter().map(|u| (u.id.as_str(), &u.fields)).collect();
    tickets
        .into_iter()
        .map(|record| {
            let user = by_id.get(record.fields.customer_id.as_str());
            TicketView {
                customer_name: user.map_or_else(|| UNKNOWN_CUSTOMER.to_string(), |u| u.name.clone()),
                customer_email: user.map(|u| u.email.clone()).unwrap_or_default(),
                record,
            }
        })
        .collect()
}

/// Opens a ticket for the signed-in customer.
///
/// # Errors
/// Returns `Error::Forbidden` for staff and `Error::Validation` for a blank
/// subject or message.
pub async fn create_ticket(records: &Records, actor: &Actor, new: NewTicket) -> Result<Record<SupportRequest>> {
    if actor.role != Role::Customer {
        return Err(Error::forbidden("Only customers can open support requests"));
    }
    let ticket = SupportRequest {
        customer_id: actor.user_id.clone(),
        subject: required(&new.subject, "Subject")?,
        message: required(&new.message, "Message")?,
        category: new.category,
        status: SupportStatus::Open,
        response: None,
        created_at: Some(Utc::now()),
    };
    let record = records.insert(&ticket).await?;
    info!(id = %record.id, customer = %actor.user_id, category = ?ticket.category, "Support request opened");
    Ok(record)
}

/// Lists tickets visible to the actor, newest first.
///
/// # Errors
/// Returns an error if a store call fails.
pub async fn list_tickets(records: &Records, actor: &Actor, query: &TicketQuery) -> Result<Vec<TicketView>> {
    let mut views = if actor.role == Role::Customer {
        let tickets = records
            .find_by::<SupportRequest>("customerId", &actor.user_id)
            .await?;
        let me = records.get::<User>(&actor.user_id).await?;
        resolve_customers(tickets, &[me])
    } else {
        let (tickets, users) =
            tokio::try_join!(records.all::<SupportRequest>(), records.all::<User>())?;
        resolve_customers(tickets, &users)
    };

    views.retain(|v| {
        query.status.is_none_or(|s| s == v.record.fields.status)
            && query.category.is_none_or(|c| c == v.record.fields.category)
    });
    views.sort_by(|a, b| {
        let key = |v: &TicketView| v.record.fields.created_at.or(v.record.created_time);
        key(b).cmp(&key(a))
    });
    Ok(views)
}

/// Replies to a ticket and/or changes its status. A reply to an open ticket
/// without an explicit status marks it In Progress.
///
/// # Errors
/// Returns `Error::Forbidden` for non-admins and `Error::Validation` when
/// nothing would change.
pub async fn respond(
    records: &Records,
    actor: &Actor,
    id: &str,
    update: TicketUpdate,
) -> Result<Record<SupportRequest>> {
    actor.require_admin()?;
    let response = optional(update.response);
    if response.is_none() && update.status.is_none() {
        return Err(Error::validation("Provide a response or a new status"));
    }
    let current = records.get::<SupportRequest>(id).await?;

    let mut changes = Map::new();
    let status = match update.status {
        Some(status) => Some(status),
        None if current.fields.status == SupportStatus::Open => Some(SupportStatus::InProgress),
        None => None,
    };
    if let Some(status) = status {
        changes.insert("status".to_string(), json!(status));
    }
    if let Some(response) = response {
        changes.insert("response".to_string(), json!(response));
    }

    let record = records
        .patch::<SupportRequest>(id, Value::Object(changes))
        .await?;
    info!(%id, status = ?record.fields.status, "Support request updated");
    Ok(record)
}
