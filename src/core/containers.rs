//! Container business logic - consolidation units and their shipping status.
//!
//! Moving a container to Shipped or Arrived carries its items along: every
//! item inside that is behind the matching item status is moved forward.

use super::{Actor, optional, required, round_to, today};
use crate::{
    entities::{Container, ContainerStatus, Item, ItemStatus, Record, Role},
    errors::{Error, Result},
    store::Records,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::{HashMap, HashSet};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Input for opening a container.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewContainer {
    /// Shipping line container number
    pub container_number: String,
    /// Planned departure
    pub departure_date: Option<NaiveDate>,
    /// Expected arrival
    pub arrival_date: Option<NaiveDate>,
    /// Free-form notes
    pub notes: Option<String>,
}

/// Totals for the items inside one container.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSummary {
    /// The container record
    pub container: Record<Container>,
    /// Number of item records
    pub item_count: usize,
    /// Sum of package quantities
    pub total_quantity: u64,
    /// Sum of volumes
    pub total_cbm: f64,
    /// Sum of weights
    pub total_weight_kg: f64,
    /// Sum of costs in USD
    pub total_usd: f64,
    /// Sum of costs in GHS
    pub total_ghs: f64,
    /// Number of distinct customers with items inside
    pub customer_count: usize,
}

impl ContainerSummary {
    /// Summarizes the given items, which should all belong to the container.
    #[must_use]
    pub fn build(container: Record<Container>, items: &[Record<Item>]) -> Self {
        let customers: HashSet<&str> = items
            .iter()
            .map(|i| i.fields.customer_id.as_str())
            .collect();
        Self {
            item_count: items.len(),
            total_quantity: items.iter().map(|i| u64::from(i.fields.quantity)).sum(),
            total_cbm: round_to(items.iter().map(|i| i.fields.cbm).sum(), 3),
            total_weight_kg: round_to(items.iter().map(|i| i.fields.weight_kg).sum(), 2),
            total_usd: round_to(items.iter().map(|i| i.fields.cost_usd).sum(), 2),
            total_ghs: round_to(items.iter().map(|i| i.fields.cost_ghs).sum(), 2),
            customer_count: customers.len(),
            container,
        }
    }
}

/// Outcome of a container status change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    /// The updated container
    pub container: Record<Container>,
    /// Number of items moved along with it
    pub items_updated: usize,
}

/// Item status implied by a container status, if any.
#[must_use]
pub const fn item_status_for(status: ContainerStatus) -> Option<ItemStatus> {
    match status {
        ContainerStatus::Shipped => Some(ItemStatus::InTransit),
        ContainerStatus::Arrived => Some(ItemStatus::Arrived),
        ContainerStatus::Loading | ContainerStatus::Cleared => None,
    }
}

/// Opens a new container.
///
/// # Errors
/// Returns `Error::Validation` for a blank or already used container number.
pub async fn create_container(
    records: &Records,
    actor: &Actor,
    new: NewContainer,
) -> Result<Record<Container>> {
    actor.require_staff()?;
    let container_number = required(&new.container_number, "Container number")?.to_uppercase();
    if matches!(
        (new.departure_date, new.arrival_date),
        (Some(departure), Some(arrival)) if arrival < departure
    ) {
        return Err(Error::validation("Arrival date cannot be before departure"));
    }

    let existing = records
        .find_by::<Container>("containerNumber", &container_number)
        .await?;
    if !existing.is_empty() {
        return Err(Error::validation(format!(
            "Container {container_number} already exists"
        )));
    }

    let record = records
        .insert(&Container {
            container_number,
            status: ContainerStatus::Loading,
            departure_date: new.departure_date,
            arrival_date: new.arrival_date,
            notes: optional(new.notes),
        })
        .await?;
    info!(id = %record.id, number = %record.fields.container_number, "Container opened");
    Ok(record)
}

/// Lists every container with its item totals, newest first.
///
/// # Errors
/// Returns `Error::Forbidden` for customers.
pub async fn list_containers(records: &Records, actor: &Actor) -> Result<Vec<ContainerSummary>> {
    actor.require_staff()?;
    let (containers, items) =
        tokio::try_join!(records.all::<Container>(), records.all::<Item>())?;

    let mut by_container: HashMap<String, Vec<Record<Item>>> = HashMap::new();
    for item in items {
        if let Some(container_id) = item.fields.container_id.clone() {
            by_container.entry(container_id).or_default().push(item);
        }
    }

    let mut summaries: Vec<ContainerSummary> = containers
        .into_iter()
        .map(|container| {
            let items = by_container.remove(&container.id).unwrap_or_default();
            ContainerSummary::build(container, &items)
        })
        .collect();
    summaries.sort_by(|a, b| b.container.created_time.cmp(&a.container.created_time));
    Ok(summaries)
}

/// Totals for one container.
///
/// # Errors
/// Returns `Error::NotFound` if the container does not exist.
pub async fn summary(records: &Records, actor: &Actor, id: &str) -> Result<ContainerSummary> {
    actor.require_staff()?;
    let (container, items) = tokio::try_join!(
        records.get::<Container>(id),
        records.find_by::<Item>("containerId", id)
    )?;
    Ok(ContainerSummary::build(container, &items))
}

/// Changes a container's status and moves its items along.
///
/// Team members may only mark a container Loading. Every later status moves
/// items into Ghana-side statuses, so it needs an admin.
///
/// Shipping stamps today's departure date and arrival stamps the arrival date
/// when they are not set yet. Item updates run concurrently; items already at
/// or past the implied status are left alone.
///
/// # Errors
/// Returns `Error::Forbidden` if the actor may not set this status,
/// `Error::NotFound` for an unknown container, or the first failed item
/// update.
pub async fn update_status(
    records: &Records,
    actor: &Actor,
    id: &str,
    status: ContainerStatus,
) -> Result<StatusChange> {
    actor.require_staff()?;
    if actor.role == Role::Team && status != ContainerStatus::Loading {
        warn!(%id, %status, by = %actor.user_id, "Team member tried a Ghana-side container status");
        return Err(Error::forbidden(format!(
            "Team members can only mark containers Loading, not {status}"
        )));
    }
    let current = records.get::<Container>(id).await?;

    let mut changes = Map::new();
    changes.insert("status".to_string(), json!(status));
    match status {
        ContainerStatus::Shipped if current.fields.departure_date.is_none() => {
            changes.insert("departureDate".to_string(), json!(today()));
        }
        ContainerStatus::Arrived if current.fields.arrival_date.is_none() => {
            changes.insert("arrivalDate".to_string(), json!(today()));
        }
        _ => {}
    }
    let container = records
        .patch::<Container>(id, Value::Object(changes))
        .await?;

    let items_updated = match item_status_for(status) {
        Some(item_status) => propagate(records, id, item_status).await?,
        None => 0,
    };
    info!(%id, %status, items_updated, "Container status updated");
    Ok(StatusChange {
        container,
        items_updated,
    })
}

async fn propagate(records: &Records, container_id: &str, status: ItemStatus) -> Result<usize> {
    let items = records
        .find_by::<Item>("containerId", container_id)
        .await?;

    let mut updates = JoinSet::new();
    for item in items.into_iter().filter(|i| i.fields.status < status) {
        let records = records.clone();
        updates.spawn(async move {
            records
                .patch::<Item>(&item.id, json!({ "status": status }))
                .await
        });
    }

    let mut updated = 0;
    while let Some(joined) = updates.join_next().await {
        match joined {
            Ok(Ok(_)) => updated += 1,
            Ok(Err(e)) => {
                error!(container = %container_id, error = %e, "Item status update failed");
                return Err(e);
            }
            Err(join_error) => {
                return Err(Error::Internal {
                    message: format!("Item update task failed: {join_error}"),
                });
            }
        }
    }
    Ok(updated)
}
