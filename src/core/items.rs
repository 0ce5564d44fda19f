//! Item business logic - intake, measurement, costing and tracking of parcels.
//!
//! Volume and cost are computed once, when an item is created or re-measured,
//! and stored on the record so every view reads the same numbers.

use super::{Actor, optional, required, round_to, today};
use crate::{
    config::Pricing,
    entities::{Container, Item, ItemStatus, Record, Role, User},
    errors::{Error, Result},
    services::PhotoHost,
    store::Records,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use tracing::{info, warn};

/// Container filter value selecting items not loaded anywhere yet.
pub const UNASSIGNED: &str = "unassigned";

/// Package measurements.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimensions {
    /// Length in centimeters
    pub length_cm: f64,
    /// Width in centimeters
    pub width_cm: f64,
    /// Height in centimeters
    pub height_cm: f64,
    /// Number of identical packages
    pub quantity: u32,
}

impl Dimensions {
    /// Rejects zero, negative and non-finite measurements.
    ///
    /// # Errors
    /// Returns `Error::Validation` naming the first bad measurement.
    pub fn validate(&self) -> Result<()> {
        for (label, value) in [
            ("Length", self.length_cm),
            ("Width", self.width_cm),
            ("Height", self.height_cm),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::validation(format!(
                    "{label} must be a positive number of centimeters"
                )));
            }
        }
        if self.quantity == 0 {
            return Err(Error::validation("Quantity must be at least 1"));
        }
        Ok(())
    }

    /// Total volume in cubic meters, rounded to 3 decimals.
    #[must_use]
    pub fn cbm(&self) -> f64 {
        let per_package = self.length_cm * self.width_cm * self.height_cm / 1_000_000.0;
        round_to(per_package * f64::from(self.quantity), 3)
    }
}

/// Volume and freight cost of an item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Costing {
    /// Cubic meters
    pub cbm: f64,
    /// Freight cost in USD
    pub cost_usd: f64,
    /// Freight cost in GHS
    pub cost_ghs: f64,
}

impl Costing {
    /// Prices a volume: the per-CBM rate with a minimum charge, converted to cedis.
    #[must_use]
    pub fn price(cbm: f64, pricing: &Pricing) -> Self {
        let cost_usd = round_to(
            (cbm * pricing.rate_per_cbm_usd).max(pricing.minimum_charge_usd),
            2,
        );
        Self {
            cbm,
            cost_usd,
            cost_ghs: round_to(cost_usd * pricing.usd_to_ghs, 2),
        }
    }
}

/// Generates a tracking number: `SL`, the date as `YYMMDD`, then six
/// upper-case hex characters.
#[must_use]
pub fn tracking_number(date: NaiveDate) -> String {
    let random = uuid::Uuid::new_v4().simple().to_string().to_uppercase();
    format!("SL{}{}", date.format("%y%m%d"), &random[..6])
}

/// Input for checking in a new item.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    /// Owning customer's record id
    pub customer_id: String,
    /// Contents
    pub description: String,
    /// Measurements
    #[serde(flatten)]
    pub dimensions: Dimensions,
    /// Gross weight in kilograms
    #[serde(default)]
    pub weight_kg: f64,
    /// Carton, if already packed
    #[serde(default)]
    pub carton_number: Option<String>,
    /// Check-in date, today when absent
    #[serde(default)]
    pub received_at: Option<NaiveDate>,
    /// Warehouse notes
    #[serde(default)]
    pub notes: Option<String>,
}

/// Editable item details. Any measurement change re-prices the item.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemUpdate {
    /// Contents
    pub description: Option<String>,
    /// Warehouse notes
    pub notes: Option<String>,
    /// Gross weight in kilograms
    pub weight_kg: Option<f64>,
    /// Length in centimeters
    pub length_cm: Option<f64>,
    /// Width in centimeters
    pub width_cm: Option<f64>,
    /// Height in centimeters
    pub height_cm: Option<f64>,
    /// Number of identical packages
    pub quantity: Option<u32>,
}

impl ItemUpdate {
    fn touches_dimensions(&self) -> bool {
        self.length_cm.is_some()
            || self.width_cm.is_some()
            || self.height_cm.is_some()
            || self.quantity.is_some()
    }
}

/// An item together with its owner's display name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    /// The item record
    #[serde(flatten)]
    pub record: Record<Item>,
    /// Owner's name, `None` if the customer record is gone
    pub customer_name: Option<String>,
}

/// Sort order of item lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemSort {
    /// Most recently received first
    #[default]
    Newest,
    /// Oldest first
    Oldest,
    /// Largest volume first
    Cbm,
    /// Most expensive first
    Cost,
}

/// Search and filter options for item lists.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemQuery {
    /// Case-insensitive text over tracking number, description, carton and customer name
    pub search: Option<String>,
    /// Only this status
    pub status: Option<ItemStatus>,
    /// Only this customer's items
    pub customer_id: Option<String>,
    /// Only items in this container, or [`UNASSIGNED`]
    pub container_id: Option<String>,
    /// Sort order
    pub sort: ItemSort,
}

impl ItemQuery {
    /// Whether an item passes every filter.
    #[must_use]
    pub fn matches(&self, view: &ItemView) -> bool {
        let item = &view.record.fields;
        if self.status.is_some_and(|s| s != item.status) {
            return false;
        }
        if self
            .customer_id
            .as_deref()
            .is_some_and(|id| id != item.customer_id)
        {
            return false;
        }
        match self.container_id.as_deref() {
            Some(UNASSIGNED) if item.container_id.is_some() => return false,
            Some(UNASSIGNED) | None => {}
            Some(id) if item.container_id.as_deref() != Some(id) => return false,
            Some(_) => {}
        }

        let Some(needle) = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        else {
            return true;
        };
        let needle = needle.to_lowercase();
        [
            Some(item.tracking_number.as_str()),
            Some(item.description.as_str()),
            item.carton_number.as_deref(),
            view.customer_name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|text| text.to_lowercase().contains(&needle))
    }

    /// Filters and sorts a list of items.
    #[must_use]
    pub fn apply(&self, items: Vec<ItemView>) -> Vec<ItemView> {
        let mut items: Vec<ItemView> = items.into_iter().filter(|v| self.matches(v)).collect();
        let age_key = |v: &ItemView| (v.record.fields.received_at, v.record.created_time);
        match self.sort {
            ItemSort::Newest => items.sort_by(|a, b| age_key(b).cmp(&age_key(a))),
            ItemSort::Oldest => items.sort_by_key(age_key),
            ItemSort::Cbm => {
                items.sort_by(|a, b| b.record.fields.cbm.total_cmp(&a.record.fields.cbm));
            }
            ItemSort::Cost => items.sort_by(|a, b| {
                b.record
                    .fields
                    .cost_usd
                    .total_cmp(&a.record.fields.cost_usd)
            }),
        }
        items
    }
}

/// Maps customer ids to names.
#[must_use]
pub fn customer_names(users: &[Record<User>]) -> HashMap<String, String> {
    users
        .iter()
        .map(|u| (u.id.clone(), u.fields.name.clone()))
        .collect()
}

/// Attaches customer names to item records.
#[must_use]
pub fn with_customer_names(
    items: Vec<Record<Item>>,
    names: &HashMap<String, String>,
) -> Vec<ItemView> {
    items
        .into_iter()
        .map(|record| {
            let customer_name = names.get(&record.fields.customer_id).cloned();
            ItemView {
                record,
                customer_name,
            }
        })
        .collect()
}

/// Checks in a new item at the warehouse.
///
/// # Errors
/// Returns `Error::Forbidden` for customers, `Error::Validation` for bad
/// measurements or an unknown customer.
pub async fn create_item(
    records: &Records,
    pricing: &Pricing,
    actor: &Actor,
    new: NewItem,
) -> Result<Record<Item>> {
    actor.require_staff()?;
    new.dimensions.validate()?;
    let description = required(&new.description, "Description")?;
    if !(new.weight_kg.is_finite() && new.weight_kg >= 0.0) {
        return Err(Error::validation("Weight cannot be negative"));
    }

    let customer = records
        .find::<User>(&new.customer_id)
        .await?
        .filter(|u| u.fields.role == Role::Customer)
        .ok_or_else(|| Error::validation(format!("Unknown customer '{}'", new.customer_id)))?;

    let received_at = new.received_at.unwrap_or_else(today);
    let costing = Costing::price(new.dimensions.cbm(), pricing);
    let carton_number = optional(new.carton_number);
    let item = Item {
        tracking_number: tracking_number(received_at),
        customer_id: customer.id.clone(),
        description,
        quantity: new.dimensions.quantity,
        length_cm: new.dimensions.length_cm,
        width_cm: new.dimensions.width_cm,
        height_cm: new.dimensions.height_cm,
        weight_kg: round_to(new.weight_kg, 2),
        cbm: costing.cbm,
        cost_usd: costing.cost_usd,
        cost_ghs: costing.cost_ghs,
        status: ItemStatus::Received,
        carton_number,
        container_id: None,
        photos: Vec::new(),
        received_at: Some(received_at),
        notes: optional(new.notes),
    };

    let record = records.insert(&item).await?;
    info!(
        id = %record.id,
        tracking = %item.tracking_number,
        customer = %customer.fields.name,
        cbm = item.cbm,
        "Item received"
    );
    Ok(record)
}

/// Lists items visible to the actor, filtered and sorted.
///
/// Customers only ever see their own items, whatever the query says.
///
/// # Errors
/// Returns an error if a store call fails.
pub async fn list_items(records: &Records, actor: &Actor, query: &ItemQuery) -> Result<Vec<ItemView>> {
    let views = if actor.role == Role::Customer {
        let items = records
            .find_by::<Item>("customerId", &actor.user_id)
            .await?;
        let names = HashMap::from([(actor.user_id.clone(), actor.name.clone())]);
        with_customer_names(items, &names)
    } else {
        let (items, users) = tokio::try_join!(records.all::<Item>(), records.all::<User>())?;
        with_customer_names(items, &customer_names(&users))
    };
    Ok(query.apply(views))
}

/// Loads one item the actor is allowed to see.
///
/// Another customer's item is reported as not found.
///
/// # Errors
/// Returns `Error::NotFound` if the item does not exist or is not visible.
pub async fn get_item(records: &Records, actor: &Actor, id: &str) -> Result<Record<Item>> {
    let record = records.get::<Item>(id).await?;
    if !actor.can_see_customer(&record.fields.customer_id) {
        return Err(Error::NotFound {
            entity: "Item",
            id: id.to_string(),
        });
    }
    Ok(record)
}

/// Sets an item's status. Team members are limited to China-side statuses.
///
/// # Errors
/// Returns `Error::Forbidden` if the actor may not set this status.
pub async fn update_status(
    records: &Records,
    actor: &Actor,
    id: &str,
    status: ItemStatus,
) -> Result<Record<Item>> {
    actor.require_staff()?;
    if actor.role == Role::Team && !status.is_china_side() {
        warn!(%id, %status, by = %actor.user_id, "Team member tried a Ghana-side status");
        return Err(Error::forbidden(format!(
            "Team members can only set Received, Packed or Loaded, not {status}"
        )));
    }
    let record = records
        .patch::<Item>(id, json!({ "status": status }))
        .await?;
    info!(%id, %status, "Item status updated");
    Ok(record)
}

/// Puts an item in a carton, or takes it out with `None`.
///
/// # Errors
/// Returns `Error::Forbidden` for customers or `Error::NotFound`.
pub async fn assign_carton(
    records: &Records,
    actor: &Actor,
    id: &str,
    carton_number: Option<String>,
) -> Result<Record<Item>> {
    actor.require_staff()?;
    let carton_number = optional(carton_number);
    let record = records
        .patch::<Item>(id, json!({ "cartonNumber": carton_number }))
        .await?;
    info!(%id, carton = ?carton_number, "Item carton assigned");
    Ok(record)
}

/// Loads an item into a container, or unloads it with `None`.
///
/// # Errors
/// Returns `Error::Validation` if the container does not exist.
pub async fn assign_container(
    records: &Records,
    actor: &Actor,
    id: &str,
    container_id: Option<String>,
) -> Result<Record<Item>> {
    actor.require_staff()?;
    let container_id = optional(container_id);
    if let Some(container_id) = &container_id {
        records
            .find::<Container>(container_id)
            .await?
            .ok_or_else(|| Error::validation(format!("Unknown container '{container_id}'")))?;
    }
    let record = records
        .patch::<Item>(id, json!({ "containerId": container_id }))
        .await?;
    info!(%id, container = ?container_id, "Item container assigned");
    Ok(record)
}

/// Uploads a photo and appends its URL to the item.
///
/// # Errors
/// Returns `Error::NotFound` before uploading if the item does not exist, or
/// the upload error.
pub async fn add_photo(
    records: &Records,
    photos: &dyn PhotoHost,
    actor: &Actor,
    id: &str,
    file_name: &str,
    content_type: &str,
    bytes: Vec<u8>,
) -> Result<Record<Item>> {
    actor.require_staff()?;
    let item = records.get::<Item>(id).await?;
    let uploaded = photos.upload(file_name, content_type, bytes).await?;

    let mut urls = item.fields.photos;
    urls.push(uploaded.url);
    let record = records
        .patch::<Item>(id, json!({ "photos": urls }))
        .await?;
    info!(%id, photos = record.fields.photos.len(), "Item photo added");
    Ok(record)
}

/// Re-measures an item and recomputes its volume and cost.
///
/// # Errors
/// Returns `Error::Validation` for bad measurements or `Error::NotFound`.
pub async fn update_dimensions(
    records: &Records,
    pricing: &Pricing,
    actor: &Actor,
    id: &str,
    dimensions: Dimensions,
) -> Result<Record<Item>> {
    update_details(
        records,
        pricing,
        actor,
        id,
        ItemUpdate {
            length_cm: Some(dimensions.length_cm),
            width_cm: Some(dimensions.width_cm),
            height_cm: Some(dimensions.height_cm),
            quantity: Some(dimensions.quantity),
            ..ItemUpdate::default()
        },
    )
    .await
}

/// Edits item details, re-pricing when any measurement changes.
///
/// # Errors
/// Returns `Error::Validation` for bad input or `Error::NotFound`.
pub async fn update_details(
    records: &Records,
    pricing: &Pricing,
    actor: &Actor,
    id: &str,
    update: ItemUpdate,
) -> Result<Record<Item>> {
    actor.require_staff()?;
    let mut changes = Map::new();

    if let Some(description) = &update.description {
        changes.insert(
            "description".to_string(),
            json!(required(description, "Description")?),
        );
    }
    if let Some(notes) = update.notes.clone() {
        changes.insert("notes".to_string(), json!(optional(Some(notes))));
    }
    if let Some(weight) = update.weight_kg {
        if !(weight.is_finite() && weight >= 0.0) {
            return Err(Error::validation("Weight cannot be negative"));
        }
        changes.insert("weightKg".to_string(), json!(round_to(weight, 2)));
    }

    if update.touches_dimensions() {
        let current = records.get::<Item>(id).await?.fields;
        let dimensions = Dimensions {
            length_cm: update.length_cm.unwrap_or(current.length_cm),
            width_cm: update.width_cm.unwrap_or(current.width_cm),
            height_cm: update.height_cm.unwrap_or(current.height_cm),
            quantity: update.quantity.unwrap_or(current.quantity),
        };
        dimensions.validate()?;
        let costing = Costing::price(dimensions.cbm(), pricing);
        changes.extend([
            ("lengthCm".to_string(), json!(dimensions.length_cm)),
            ("widthCm".to_string(), json!(dimensions.width_cm)),
            ("heightCm".to_string(), json!(dimensions.height_cm)),
            ("quantity".to_string(), json!(dimensions.quantity)),
            ("cbm".to_string(), json!(costing.cbm)),
            ("costUsd".to_string(), json!(costing.cost_usd)),
            ("costGhs".to_string(), json!(costing.cost_ghs)),
        ]);
    }

    let record = records.patch::<Item>(id, Value::Object(changes)).await?;
    info!(%id, cbm = record.fields.cbm, "Item details updated");
    Ok(record)
}

/// Deletes an item.
///
/// # Errors
/// Returns `Error::Forbidden` for non-admins or `Error::NotFound`.
pub async fn delete_item(records: &Records, actor: &Actor, id: &str) -> Result<()> {
    actor.require_admin()?;
    records.remove::<Item>(id).await?;
    info!(%id, "Item deleted");
    Ok(())
}
